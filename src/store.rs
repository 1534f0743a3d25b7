// src/store.rs
//! Data access port for polls, their options and votes.
//!
//! Compound writes (a poll with its options, a vote with its counter bump,
//! a poll update with its replacement options) are single store calls so an
//! implementation can commit them together. When one fails, [`StoreError`]
//! records which step broke.
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewPoll, NewVote, PollChanges, PollWithOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Read,
    Poll,
    Options,
    Vote,
    Counter,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Read => "read",
            Step::Poll => "poll write",
            Step::Options => "option write",
            Step::Vote => "vote insert",
            Step::Counter => "vote counter increment",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated")]
    Conflict,

    #[error("{step} failed: {message}")]
    Query { step: Step, message: String },
}

impl StoreError {
    pub fn query(step: Step, message: impl Into<String>) -> Self {
        StoreError::Query {
            step,
            message: message.into(),
        }
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            StoreError::Conflict => None,
            StoreError::Query { step, .. } => Some(*step),
        }
    }
}

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Insert an active poll and its options, every counter at zero.
    async fn create_poll(&self, poll: &NewPoll) -> Result<Uuid, StoreError>;

    /// Active polls with their options, newest first.
    async fn active_polls(&self) -> Result<Vec<PollWithOptions>, StoreError>;

    async fn active_poll(&self, id: Uuid) -> Result<Option<PollWithOptions>, StoreError>;

    /// Creator of an active poll.
    async fn active_poll_owner(&self, id: Uuid) -> Result<Option<Uuid>, StoreError>;

    async fn find_user_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Insert the vote and bump the chosen option's counter server-side.
    async fn record_vote(&self, vote: &NewVote) -> Result<Uuid, StoreError>;

    /// Rewrite title and description, then replace every option with a fresh
    /// zero-vote set.
    async fn update_poll(&self, id: Uuid, changes: &PollChanges) -> Result<(), StoreError>;

    /// Soft delete.
    async fn deactivate_poll(&self, id: Uuid) -> Result<(), StoreError>;
}
