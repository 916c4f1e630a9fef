//! HTTP routes.

pub mod error;
pub mod manifest;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::server::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/plugins", get(manifest::list_plugins))
        .route("/tools", get(manifest::list_tools))
        .route("/health", get(manifest::health))
        .with_state(state)
}
