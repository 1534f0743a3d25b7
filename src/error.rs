// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Which owner-only action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedAction {
    Edit,
    Delete,
}

/// Failure of a poll or vote operation. The `Display` text is the only
/// detail that reaches the caller; the underlying cause is logged where the
/// failure happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Poll not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("You can only {} your own polls", .0.verb())]
    NotOwner(OwnedAction),

    #[error("You have already voted on this poll")]
    AlreadyVoted,

    #[error("{0}")]
    Invalid(&'static str),

    #[error("{0}")]
    Backend(&'static str),
}

impl OwnedAction {
    fn verb(self) -> &'static str {
        match self {
            OwnedAction::Edit => "edit",
            OwnedAction::Delete => "delete",
        }
    }
}

impl PollError {
    pub fn status(&self) -> StatusCode {
        match self {
            PollError::NotFound => StatusCode::NOT_FOUND,
            PollError::Unauthorized => StatusCode::UNAUTHORIZED,
            PollError::NotOwner(_) => StatusCode::FORBIDDEN,
            PollError::AlreadyVoted | PollError::Invalid(_) => StatusCode::BAD_REQUEST,
            PollError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
