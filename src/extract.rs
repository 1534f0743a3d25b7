// src/extract.rs
//! `Path` and `Json` wrappers whose rejections use the same
//! `{"success":false,"error":..}` body as every other failure.
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::PollError;

/// Poll id from the URL. An id that does not parse cannot name a poll.
#[derive(Debug, Deserialize, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PollError))]
pub struct PollId(pub Uuid);

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(PollError))]
pub struct JsonBody<T>(pub T);

impl From<PathRejection> for PollError {
    fn from(rejection: PathRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected poll id");
        PollError::NotFound
    }
}

impl From<JsonRejection> for PollError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        PollError::Invalid("Invalid request body")
    }
}
