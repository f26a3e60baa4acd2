//! API routes module

pub mod inbound;
pub mod threads;

use std::sync::{Arc, RwLock};

use crate::api::state::AppState;
use axum::Router;

type SharedState = Arc<RwLock<AppState>>;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Inbound mail from the relay
        .nest("/inbound", inbound::router())
        // Stored thread state
        .nest("/threads", threads::router())
}
