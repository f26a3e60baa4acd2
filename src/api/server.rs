use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::ai::Policy;
use crate::api::state::AppState;
use crate::core::{AppConfig, logging};
use crate::email::Pipeline;
use crate::threads::open_store;

async fn healthz() -> &'static str {
    "ok"
}

pub fn app(shared_state: Arc<RwLock<AppState>>) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        // API routes
        .nest("/api", routes::router())
        // The mail relay posts to the root
        .route("/", post(routes::inbound::handle_inbound))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::clone(&shared_state))
}

// Run the server
pub async fn serve(host: String, port: String, config: AppConfig) -> Result<()> {
    logging::init();

    let policy = Policy::load(config.policy_path.as_deref())?;
    let store = open_store(&config).await?;
    let pipeline = Pipeline::from_config(&config, &policy, store)?;

    let app_state = AppState::new(pipeline);
    let shared_state = Arc::new(RwLock::new(app_state));
    let app = app(Arc::clone(&shared_state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    tracing::debug!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
