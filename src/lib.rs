// src/lib.rs
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
#[cfg(test)]
pub mod memory_store;
pub mod models;
pub mod poll;
pub mod routes;
pub mod store;

use std::sync::Arc;

use axum::Router;

use crate::config::Config;
use crate::db::{PgStore, Pools};
use crate::poll::PollService;

/// Wire both database handles into the operations layer and the router.
pub fn build_app(pools: Pools, config: &Config) -> Router {
    let service = PollService::new(
        Arc::new(PgStore::new(pools.user)),
        Arc::new(PgStore::new(pools.admin)),
    );
    routes::create_routes(service, config.cors_allowed_origin.as_deref())
}
