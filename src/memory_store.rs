// src/memory_store.rs
//! In-process `PollStore` used by the test suites. Compound writes run step
//! by step against a staged copy of the tables that is only committed when
//! every step succeeds, and a single step can be told to fail.
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::{NewPoll, NewVote, Poll, PollChanges, PollOption, PollWithOptions, Vote};
use crate::store::{PollStore, Step, StoreError};

#[derive(Default, Clone)]
struct Tables {
    polls: Vec<Poll>,
    options: Vec<PollOption>,
    votes: Vec<Vote>,
    last_created: Option<DateTime<Utc>>,
}

impl Tables {
    fn with_options(&self, poll: &Poll) -> PollWithOptions {
        PollWithOptions {
            poll: poll.clone(),
            options: self
                .options
                .iter()
                .filter(|option| option.poll_id == poll.id)
                .cloned()
                .collect(),
        }
    }

    fn active(&self, id: Uuid) -> Option<&Poll> {
        self.polls.iter().find(|poll| poll.id == id && poll.is_active)
    }

    /// Creation timestamps strictly increase so ordering is deterministic.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(created);
        created
    }

    fn push_options(&mut self, poll_id: Uuid, texts: &[String]) {
        self.options.extend(texts.iter().map(|text| PollOption {
            id: Uuid::new_v4(),
            poll_id,
            text: text.clone(),
            votes: 0,
        }));
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failing: Mutex<Option<Step>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call that reaches `step` fail; `None` heals the store.
    pub fn fail_at(&self, step: Option<Step>) {
        *self.failing.lock().unwrap() = step;
    }

    pub fn vote_rows(&self, poll_id: Uuid) -> usize {
        let tables = self.tables.lock().unwrap();
        tables.votes.iter().filter(|vote| vote.poll_id == poll_id).count()
    }

    pub fn poll_rows(&self) -> usize {
        self.tables.lock().unwrap().polls.len()
    }

    fn check(&self, step: Step) -> Result<(), StoreError> {
        match *self.failing.lock().unwrap() {
            Some(failing) if failing == step => Err(StoreError::query(step, "injected failure")),
            _ => Ok(()),
        }
    }

    /// Run `work` on a copy of the tables; the copy replaces the live tables
    /// only if `work` succeeds.
    fn transaction<T>(&self, work: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut live = self.tables.lock().unwrap();
        let mut staged = live.clone();
        let value = work(&mut staged)?;
        *live = staged;
        Ok(value)
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Uuid, StoreError> {
        self.transaction(|tables| {
            self.check(Step::Poll)?;
            let id = Uuid::new_v4();
            let created_at = tables.next_created_at();
            tables.polls.push(Poll {
                id,
                title: poll.title.clone(),
                description: poll.description.clone(),
                created_by: poll.created_by,
                created_at,
                updated_at: None,
                is_active: true,
            });

            self.check(Step::Options)?;
            tables.push_options(id, &poll.options);
            Ok(id)
        })
    }

    async fn active_polls(&self) -> Result<Vec<PollWithOptions>, StoreError> {
        self.check(Step::Read)?;

        let tables = self.tables.lock().unwrap();
        let mut polls: Vec<PollWithOptions> = tables
            .polls
            .iter()
            .filter(|poll| poll.is_active)
            .map(|poll| tables.with_options(poll))
            .collect();
        polls.sort_by(|a, b| b.poll.created_at.cmp(&a.poll.created_at));
        Ok(polls)
    }

    async fn active_poll(&self, id: Uuid) -> Result<Option<PollWithOptions>, StoreError> {
        self.check(Step::Read)?;

        let tables = self.tables.lock().unwrap();
        Ok(tables.active(id).map(|poll| tables.with_options(poll)))
    }

    async fn active_poll_owner(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.check(Step::Read)?;

        let tables = self.tables.lock().unwrap();
        Ok(tables.active(id).map(|poll| poll.created_by))
    }

    async fn find_user_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.check(Step::Read)?;

        let tables = self.tables.lock().unwrap();
        Ok(tables
            .votes
            .iter()
            .find(|vote| vote.poll_id == poll_id && vote.user_id == Some(user_id))
            .map(|vote| vote.id))
    }

    async fn record_vote(&self, vote: &NewVote) -> Result<Uuid, StoreError> {
        self.transaction(|tables| {
            self.check(Step::Vote)?;
            let belongs = tables
                .options
                .iter()
                .any(|option| option.id == vote.option_id && option.poll_id == vote.poll_id);
            if !belongs {
                return Err(StoreError::query(Step::Vote, "option does not belong to poll"));
            }
            if let Some(user_id) = vote.user_id {
                let taken = tables
                    .votes
                    .iter()
                    .any(|row| row.poll_id == vote.poll_id && row.user_id == Some(user_id));
                if taken {
                    return Err(StoreError::Conflict);
                }
            }
            let id = Uuid::new_v4();
            tables.votes.push(Vote {
                id,
                poll_id: vote.poll_id,
                option_id: vote.option_id,
                user_id: vote.user_id,
                created_at: Utc::now(),
            });

            self.check(Step::Counter)?;
            let option = tables
                .options
                .iter_mut()
                .find(|option| option.id == vote.option_id)
                .ok_or_else(|| StoreError::query(Step::Counter, "option row missing"))?;
            option.votes += 1;
            Ok(id)
        })
    }

    async fn update_poll(&self, id: Uuid, changes: &PollChanges) -> Result<(), StoreError> {
        self.transaction(|tables| {
            self.check(Step::Poll)?;
            let poll = tables
                .polls
                .iter_mut()
                .find(|poll| poll.id == id && poll.is_active)
                .ok_or_else(|| StoreError::query(Step::Poll, "no active poll to update"))?;
            poll.title = changes.title.clone();
            poll.description = changes.description.clone();
            poll.updated_at = Some(Utc::now());

            self.check(Step::Options)?;
            let removed: Vec<Uuid> = tables
                .options
                .iter()
                .filter(|option| option.poll_id == id)
                .map(|option| option.id)
                .collect();
            tables.options.retain(|option| option.poll_id != id);
            tables.votes.retain(|vote| !removed.contains(&vote.option_id));
            tables.push_options(id, &changes.options);
            Ok(())
        })
    }

    async fn deactivate_poll(&self, id: Uuid) -> Result<(), StoreError> {
        self.check(Step::Poll)?;

        let mut tables = self.tables.lock().unwrap();
        if let Some(poll) = tables.polls.iter_mut().find(|poll| poll.id == id) {
            poll.is_active = false;
            poll.updated_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_poll(owner: Uuid) -> NewPoll {
        NewPoll {
            title: "Q".to_string(),
            description: None,
            options: vec!["a".to_string(), "b".to_string()],
            created_by: owner,
        }
    }

    fn changes() -> PollChanges {
        PollChanges {
            title: "New".to_string(),
            description: Some("edited".to_string()),
            options: vec!["x".to_string(), "y".to_string(), "z".to_string()],
        }
    }

    #[tokio::test]
    async fn update_of_deactivated_poll_is_refused() {
        let store = MemoryStore::new();
        let poll_id = store.create_poll(&new_poll(Uuid::new_v4())).await.unwrap();
        store.deactivate_poll(poll_id).await.unwrap();

        let err = store.update_poll(poll_id, &changes()).await.unwrap_err();

        assert_eq!(err.step(), Some(Step::Poll));
        let tables = store.tables.lock().unwrap();
        let poll = tables.polls.iter().find(|poll| poll.id == poll_id).unwrap();
        assert_eq!(poll.title, "Q");
        assert!(!poll.is_active);
        let texts: Vec<&str> = tables.options.iter().map(|option| option.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn failure_after_first_step_rolls_back() {
        let store = MemoryStore::new();
        let poll_id = store.create_poll(&new_poll(Uuid::new_v4())).await.unwrap();
        let option_id = store.active_poll(poll_id).await.unwrap().unwrap().options[0].id;
        store.fail_at(Some(Step::Options));

        // The title rewrite already ran on the staged copy when options failed.
        let err = store.update_poll(poll_id, &changes()).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::Options));
        let err = store.create_poll(&new_poll(Uuid::new_v4())).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::Options));

        store.fail_at(Some(Step::Counter));
        let vote = NewVote {
            poll_id,
            option_id,
            user_id: None,
        };
        let err = store.record_vote(&vote).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::Counter));

        store.fail_at(None);
        assert_eq!(store.poll_rows(), 1);
        assert_eq!(store.vote_rows(poll_id), 0);
        let poll = store.active_poll(poll_id).await.unwrap().unwrap();
        assert_eq!(poll.poll.title, "Q");
        assert_eq!(poll.poll.updated_at, None);
        assert_eq!(poll.options.len(), 2);
        assert_eq!(poll.total_votes(), 0);
    }
}
