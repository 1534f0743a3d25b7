// src/poll.rs
//! Poll and vote operations.
//!
//! Reads and the duplicate-vote lookup go through the `user` handle, which is
//! bound by row-level policies. Ownership checks and every write go through
//! the privileged `admin` handle.
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{OwnedAction, PollError};
use crate::models::{NewPoll, NewVote, PollChanges, PollWithOptions};
use crate::store::{PollStore, Step, StoreError};

/// Refuse a mutation unless `user_id` created the poll.
pub fn ensure_owner(owner: Option<Uuid>, user_id: Uuid, action: OwnedAction) -> Result<(), PollError> {
    match owner {
        None => Err(PollError::NotFound),
        Some(owner) if owner != user_id => Err(PollError::NotOwner(action)),
        Some(_) => Ok(()),
    }
}

#[derive(Clone)]
pub struct PollService {
    user: Arc<dyn PollStore>,
    admin: Arc<dyn PollStore>,
}

impl PollService {
    pub fn new(user: Arc<dyn PollStore>, admin: Arc<dyn PollStore>) -> Self {
        Self { user, admin }
    }

    pub async fn create_poll(&self, poll: NewPoll) -> Result<Uuid, PollError> {
        match self.admin.create_poll(&poll).await {
            Ok(poll_id) => {
                info!(%poll_id, created_by = %poll.created_by, options = poll.options.len(), "poll created");
                Ok(poll_id)
            }
            Err(err) => {
                error!(created_by = %poll.created_by, error = %err, "error creating poll");
                match err.step() {
                    Some(Step::Options) => Err(PollError::Backend("Failed to create poll options")),
                    _ => Err(PollError::Backend("Failed to create poll")),
                }
            }
        }
    }

    pub async fn get_polls(&self) -> Result<Vec<PollWithOptions>, PollError> {
        self.user.active_polls().await.map_err(|err| {
            error!(error = %err, "error fetching polls");
            PollError::Backend("Failed to fetch polls")
        })
    }

    /// Missing, inactive and unreadable polls all report `NotFound`.
    pub async fn get_poll_by_id(&self, poll_id: Uuid) -> Result<PollWithOptions, PollError> {
        match self.user.active_poll(poll_id).await {
            Ok(Some(poll)) => Ok(poll),
            Ok(None) => Err(PollError::NotFound),
            Err(err) => {
                error!(%poll_id, error = %err, "error fetching poll");
                Err(PollError::NotFound)
            }
        }
    }

    pub async fn submit_vote(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<(), PollError> {
        if let Some(user_id) = user_id {
            match self.user.find_user_vote(poll_id, user_id).await {
                Ok(Some(_)) => return Err(PollError::AlreadyVoted),
                Ok(None) => {}
                Err(err) => {
                    error!(%poll_id, %user_id, error = %err, "error checking for an existing vote");
                    return Err(PollError::Backend("Failed to submit vote"));
                }
            }
        }

        let vote = NewVote {
            poll_id,
            option_id,
            user_id,
        };
        match self.admin.record_vote(&vote).await {
            Ok(vote_id) => {
                info!(%vote_id, %poll_id, %option_id, anonymous = user_id.is_none(), "vote recorded");
                Ok(())
            }
            // Lost the race against a concurrent vote from the same user.
            Err(StoreError::Conflict) => {
                warn!(%poll_id, ?user_id, "duplicate vote rejected by the store");
                Err(PollError::AlreadyVoted)
            }
            Err(err) => {
                error!(%poll_id, %option_id, ?user_id, error = %err, "error voting");
                match err.step() {
                    Some(Step::Counter) => Err(PollError::Backend("Failed to update vote count")),
                    _ => Err(PollError::Backend("Failed to submit vote")),
                }
            }
        }
    }

    pub async fn update_poll(
        &self,
        poll_id: Uuid,
        changes: PollChanges,
        user_id: Uuid,
    ) -> Result<(), PollError> {
        self.authorize(poll_id, user_id, OwnedAction::Edit).await?;

        self.admin.update_poll(poll_id, &changes).await.map_err(|err| {
            error!(%poll_id, error = %err, "error updating poll");
            PollError::Backend("Failed to update poll")
        })?;

        info!(%poll_id, options = changes.options.len(), "poll updated");
        Ok(())
    }

    pub async fn delete_poll(&self, poll_id: Uuid, user_id: Uuid) -> Result<(), PollError> {
        self.authorize(poll_id, user_id, OwnedAction::Delete).await?;

        self.admin.deactivate_poll(poll_id).await.map_err(|err| {
            error!(%poll_id, error = %err, "error deleting poll");
            PollError::Backend("Failed to delete poll")
        })?;

        info!(%poll_id, "poll deactivated");
        Ok(())
    }

    async fn authorize(&self, poll_id: Uuid, user_id: Uuid, action: OwnedAction) -> Result<(), PollError> {
        let owner = self.admin.active_poll_owner(poll_id).await.unwrap_or_else(|err| {
            error!(%poll_id, error = %err, "error looking up poll owner");
            None
        });

        ensure_owner(owner, user_id, action).inspect_err(|err| {
            if matches!(err, PollError::NotOwner(_)) {
                warn!(%poll_id, %user_id, ?action, "rejected change by non-owner");
            }
        })
    }
}
