use std::sync::Arc;

use anyhow::{Context, Result};

use crate::ai::Policy;
use crate::api::public::inbound::InboundResponse;
use crate::core::AppConfig;
use crate::email::{EmailMessage, Pipeline};
use crate::threads::{MemoryStore, SharedStore, open_store, resolve_key};

/// Classify a single raw message the same way the HTTP endpoint does.
/// A dry run works on a copy of the thread's stored record and routes
/// replies to the log instead of the configured webhook. Writes are
/// not serialized with a server running against the same store.
pub async fn run(mut config: AppConfig, path: &str, dry_run: bool) -> Result<()> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let email = EmailMessage::from_raw(&raw)?;
    let policy = Policy::load(config.policy_path.as_deref())?;

    let store = open_store(&config).await?;
    let store: SharedStore = if dry_run {
        config.reply_webhook_url = None;
        let key = resolve_key(&email);
        match store.load(&key).await? {
            Some(state) => Arc::new(MemoryStore::with_record(key, state)),
            None => Arc::new(MemoryStore::new()),
        }
    } else {
        store
    };

    let pipeline = Pipeline::from_config(&config, &policy, store)?;
    let processed = pipeline.run(&email).await?;
    let response = InboundResponse::from(&processed);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
