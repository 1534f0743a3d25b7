// src/handlers.rs
use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::auth::{AuthUser, MaybeUser};
use crate::error::PollError;
use crate::extract::{JsonBody, PollId};
use crate::models::{PollForm, VoteRequest};
use crate::poll::PollService;

type ApiResult = Result<Json<Value>, PollError>;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// List every active poll, newest first
pub async fn get_polls(State(service): State<PollService>) -> ApiResult {
    let polls = service.get_polls().await?;
    Ok(Json(json!({ "success": true, "polls": polls })))
}

pub async fn get_poll(State(service): State<PollService>, PollId(poll_id): PollId) -> ApiResult {
    let poll = service.get_poll_by_id(poll_id).await?;
    Ok(Json(json!({ "success": true, "poll": poll })))
}

/// Create a poll owned by the caller
pub async fn create_poll(
    State(service): State<PollService>,
    AuthUser(user_id): AuthUser,
    JsonBody(form): JsonBody<PollForm>,
) -> ApiResult {
    let changes = form.validate()?;
    let poll_id = service.create_poll(changes.into_new_poll(user_id)).await?;
    Ok(Json(json!({ "success": true, "pollId": poll_id })))
}

/// Cast a vote, anonymously when no user is attached
pub async fn vote(
    State(service): State<PollService>,
    MaybeUser(user_id): MaybeUser,
    JsonBody(request): JsonBody<VoteRequest>,
) -> ApiResult {
    service
        .submit_vote(request.poll_id, request.option_id, user_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn update_poll(
    State(service): State<PollService>,
    AuthUser(user_id): AuthUser,
    PollId(poll_id): PollId,
    JsonBody(form): JsonBody<PollForm>,
) -> ApiResult {
    let changes = form.validate()?;
    service.update_poll(poll_id, changes, user_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Soft delete; the poll disappears from every listing
pub async fn delete_poll(
    State(service): State<PollService>,
    AuthUser(user_id): AuthUser,
    PollId(poll_id): PollId,
) -> ApiResult {
    service.delete_poll(poll_id, user_id).await?;
    Ok(Json(json!({ "success": true })))
}
