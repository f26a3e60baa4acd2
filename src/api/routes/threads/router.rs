//! Router for the threads API

use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use super::public::ThreadResponse;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::threads::ThreadKey;

type SharedState = Arc<RwLock<AppState>>;

async fn get_thread(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let pipeline = {
        let shared_state = state
            .read()
            .map_err(|_| anyhow!("Shared state lock poisoned"))?;
        Arc::clone(&shared_state.pipeline)
    };

    let key = ThreadKey::parse(&key);
    match pipeline.store().load(&key).await? {
        Some(state) => Ok(Json(ThreadResponse {
            thread_key: key.to_string(),
            state,
        })),
        None => Err(ApiError::not_found(anyhow!("No thread {}", key))),
    }
}

/// Create the threads router
pub fn router() -> Router<SharedState> {
    Router::new().route("/{key}", get(get_thread))
}
