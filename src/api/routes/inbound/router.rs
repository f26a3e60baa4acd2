//! Router for inbound mail

use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use axum::{Json, Router, body::Bytes, extract::State, routing::post};

use super::public::InboundResponse;
use crate::api::public::ApiError;
use crate::api::state::AppState;
use crate::email::EmailMessage;

type SharedState = Arc<RwLock<AppState>>;

/// Accepts a raw MIME message and answers with the decision for it.
pub async fn handle_inbound(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<InboundResponse>, ApiError> {
    let pipeline = {
        let shared_state = state
            .read()
            .map_err(|_| anyhow!("Shared state lock poisoned"))?;
        Arc::clone(&shared_state.pipeline)
    };

    let email = EmailMessage::from_raw(&body).map_err(ApiError::bad_request)?;
    let processed = pipeline.run(&email).await?;

    Ok(Json(InboundResponse::from(&processed)))
}

/// Create the inbound router
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(handle_inbound))
}
