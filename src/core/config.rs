use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Error, Result, anyhow};

use crate::email::{LogDispatcher, ReplyDispatcher, Sender, WebhookDispatcher};
use crate::openai::ChatEndpoint;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(anyhow!("Unknown store backend: {}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassifierKind {
    Llm,
    Keyword,
}

impl FromStr for ClassifierKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(ClassifierKind::Llm),
            "keyword" => Ok(ClassifierKind::Keyword),
            other => Err(anyhow!("Unknown classifier: {}", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub store_backend: StoreBackend,
    pub policy_path: Option<String>,
    pub classifier: ClassifierKind,
    pub openai_api_hostname: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub reply_webhook_url: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

// Unset and blank variables are treated the same
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let storage_path = var("SPICED_HAM_STORAGE_PATH").unwrap_or("./".to_string());
        let store_backend = var("SPICED_HAM_STORE")
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(StoreBackend::File);
        let policy_path = var("SPICED_HAM_POLICY_PATH");
        let openai_api_key = var("OPENAI_API_KEY");
        let classifier = match var("SPICED_HAM_CLASSIFIER") {
            Some(kind) => kind.parse()?,
            None if openai_api_key.is_some() => ClassifierKind::Llm,
            None => ClassifierKind::Keyword,
        };
        let openai_api_hostname = var("SPICED_HAM_LLM_HOST")
            .unwrap_or_else(|| "https://api.openai.com".to_string());
        let openai_model =
            var("SPICED_HAM_LLM_MODEL").unwrap_or_else(|| "gpt-4.1-mini".to_string());
        let reply_webhook_url = var("SPICED_HAM_REPLY_WEBHOOK_URL");
        let from_address =
            var("SPICED_HAM_FROM_ADDRESS").unwrap_or_else(|| "spiced-ham@localhost".to_string());
        let from_name = var("SPICED_HAM_FROM_NAME").unwrap_or_else(|| "Spiced Ham".to_string());

        Ok(Self {
            storage_path,
            store_backend,
            policy_path,
            classifier,
            openai_api_hostname,
            openai_api_key,
            openai_model,
            reply_webhook_url,
            from_address,
            from_name,
        })
    }

    /// Directory holding one JSON record per thread.
    pub fn threads_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_path).join("threads")
    }

    /// Directory holding the sqlite database.
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_path).join("db")
    }

    pub fn chat_endpoint(&self) -> Option<ChatEndpoint> {
        self.openai_api_key
            .as_deref()
            .map(|key| ChatEndpoint::new(&self.openai_api_hostname, key, &self.openai_model))
    }

    pub fn sender(&self) -> Sender {
        Sender::new(&self.from_address, &self.from_name)
    }

    pub fn reply_dispatcher(&self) -> Arc<dyn ReplyDispatcher> {
        match &self.reply_webhook_url {
            Some(url) => Arc::new(WebhookDispatcher::new(url)),
            None => Arc::new(LogDispatcher),
        }
    }
}
