use anyhow::Result;

use crate::core::AppConfig;
use crate::threads::{ThreadKey, open_store};

pub async fn run(config: &AppConfig, key: Option<String>, message_id: Option<String>) -> Result<()> {
    let key = match (key, message_id) {
        (Some(key), _) => ThreadKey::parse(&key),
        (None, Some(message_id)) => ThreadKey::from_source(&message_id),
        (None, None) => anyhow::bail!("Either --key or --message-id is required"),
    };

    let store = open_store(config).await?;
    match store.load(&key).await? {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("Thread {} not found", key),
    }
    Ok(())
}
