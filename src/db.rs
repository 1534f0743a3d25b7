// src/db.rs
use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{NewPoll, NewVote, Poll, PollChanges, PollOption, PollWithOptions};
use crate::store::{PollStore, Step, StoreError};

/// The two database handles: `user` connects as the role bound by row-level
/// policies, `admin` as the privileged role used for trusted mutations.
pub struct Pools {
    pub user: PgPool,
    pub admin: PgPool,
}

pub async fn create_pools(config: &Config) -> Result<Pools, sqlx::Error> {
    let user = connect(&config.database_url, config.max_connections).await?;
    let admin = match &config.admin_database_url {
        Some(url) => connect(url, config.max_connections).await?,
        None => user.clone(),
    };

    Ok(Pools { user, admin })
}

async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("database migrations applied");
    Ok(())
}

fn store_err(step: Step) -> impl Fn(sqlx::Error) -> StoreError {
    move |err| match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
        _ => StoreError::query(step, err.to_string()),
    }
}

const POLL_COLUMNS: &str = "id, title, description, created_by, created_at, updated_at, is_active";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn options_for(&self, poll_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<PollOption>>, StoreError> {
        let options = sqlx::query_as::<_, PollOption>(
            "SELECT id, poll_id, text, votes FROM poll_options WHERE poll_id = ANY($1) ORDER BY poll_id, position",
        )
        .bind(poll_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err(Step::Read))?;

        let mut grouped: HashMap<Uuid, Vec<PollOption>> = HashMap::new();
        for option in options {
            grouped.entry(option.poll_id).or_default().push(option);
        }
        Ok(grouped)
    }
}

async fn insert_options(
    tx: &mut Transaction<'_, Postgres>,
    poll_id: Uuid,
    options: &[String],
) -> Result<(), sqlx::Error> {
    for (position, text) in options.iter().enumerate() {
        sqlx::query("INSERT INTO poll_options (id, poll_id, text, votes, position) VALUES ($1, $2, $3, 0, $4)")
            .bind(Uuid::new_v4())
            .bind(poll_id)
            .bind(text)
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[async_trait]
impl PollStore for PgStore {
    async fn create_poll(&self, poll: &NewPoll) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err(Step::Poll))?;
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO polls (id, title, description, created_by, is_active) VALUES ($1, $2, $3, $4, TRUE)")
            .bind(id)
            .bind(&poll.title)
            .bind(&poll.description)
            .bind(poll.created_by)
            .execute(&mut *tx)
            .await
            .map_err(store_err(Step::Poll))?;

        insert_options(&mut tx, id, &poll.options)
            .await
            .map_err(store_err(Step::Options))?;

        tx.commit().await.map_err(store_err(Step::Options))?;
        Ok(id)
    }

    async fn active_polls(&self) -> Result<Vec<PollWithOptions>, StoreError> {
        let polls = sqlx::query_as::<_, Poll>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE is_active ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err(Step::Read))?;

        let ids: Vec<Uuid> = polls.iter().map(|poll| poll.id).collect();
        let mut options = self.options_for(&ids).await?;

        Ok(polls
            .into_iter()
            .map(|poll| PollWithOptions {
                options: options.remove(&poll.id).unwrap_or_default(),
                poll,
            })
            .collect())
    }

    async fn active_poll(&self, id: Uuid) -> Result<Option<PollWithOptions>, StoreError> {
        let poll = sqlx::query_as::<_, Poll>(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err(Step::Read))?;

        let Some(poll) = poll else {
            return Ok(None);
        };

        let mut options = self.options_for(&[poll.id]).await?;
        Ok(Some(PollWithOptions {
            options: options.remove(&poll.id).unwrap_or_default(),
            poll,
        }))
    }

    async fn active_poll_owner(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        sqlx::query_scalar::<_, Uuid>("SELECT created_by FROM polls WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err(Step::Read))
    }

    async fn find_user_vote(&self, poll_id: Uuid, user_id: Uuid) -> Result<Option<Uuid>, StoreError> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM votes WHERE poll_id = $1 AND user_id = $2")
            .bind(poll_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err(Step::Read))
    }

    async fn record_vote(&self, vote: &NewVote) -> Result<Uuid, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err(Step::Vote))?;
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO votes (id, poll_id, option_id, user_id) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(vote.poll_id)
            .bind(vote.option_id)
            .bind(vote.user_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err(Step::Vote))?;

        let new_count = sqlx::query_scalar::<_, Option<i32>>("SELECT increment_vote($1)")
            .bind(vote.option_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err(Step::Counter))?;

        if new_count.is_none() {
            return Err(StoreError::query(Step::Counter, "option row missing"));
        }

        tx.commit().await.map_err(store_err(Step::Counter))?;
        Ok(id)
    }

    async fn update_poll(&self, id: Uuid, changes: &PollChanges) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err(Step::Poll))?;

        let updated = sqlx::query(
            "UPDATE polls SET title = $2, description = $3, updated_at = now() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .execute(&mut *tx)
        .await
        .map_err(store_err(Step::Poll))?;

        // Deleted between the ownership check and this write.
        if updated.rows_affected() == 0 {
            return Err(StoreError::query(Step::Poll, "no active poll to update"));
        }

        sqlx::query("DELETE FROM poll_options WHERE poll_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err(Step::Options))?;

        insert_options(&mut tx, id, &changes.options)
            .await
            .map_err(store_err(Step::Options))?;

        tx.commit().await.map_err(store_err(Step::Options))?;
        Ok(())
    }

    async fn deactivate_poll(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE polls SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_err(Step::Poll))?;
        Ok(())
    }
}
