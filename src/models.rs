// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PollError;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_OPTION_LEN: usize = 100;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub votes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A poll joined with its options, in the order they were submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<PollOption>,
}

impl PollWithOptions {
    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|option| i64::from(option.votes)).sum()
    }

    pub fn option_by_text(&self, text: &str) -> Option<&PollOption> {
        self.options.iter().find(|option| option.text == text)
    }
}

/// Title, description and option texts of a poll that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PollChanges {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
}

impl PollChanges {
    pub fn into_new_poll(self, created_by: Uuid) -> NewPoll {
        NewPoll {
            title: self.title,
            description: self.description,
            options: self.options,
            created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewVote {
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct OptionInput {
    pub text: String,
}

/// Body of the create and update endpoints.
#[derive(Debug, Deserialize)]
pub struct PollForm {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<OptionInput>,
}

impl PollForm {
    /// Trims every field, drops blank options and checks the size limits.
    pub fn validate(self) -> Result<PollChanges, PollError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(PollError::Invalid("Title is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(PollError::Invalid("Title is too long"));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|option| option.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        if options.len() < MIN_OPTIONS {
            return Err(PollError::Invalid("A poll needs at least two options"));
        }
        if options.len() > MAX_OPTIONS {
            return Err(PollError::Invalid("A poll can have at most ten options"));
        }
        if options.iter().any(|text| text.chars().count() > MAX_OPTION_LEN) {
            return Err(PollError::Invalid("Option text is too long"));
        }

        Ok(PollChanges {
            title,
            description,
            options,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub poll_id: Uuid,
    pub option_id: Uuid,
}
