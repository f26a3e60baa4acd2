//! Outbound automatic replies.
//!
//! Replies chain to the original message via `In-Reply-To` and
//! `References` so the sender's client threads them, and are never
//! sent to an address in our own sending domain.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EmailMessage;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("reply delivery request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("reply delivery rejected with status {0}")]
    Rejected(u16),
}

/// Identity replies are sent from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub address: String,
    pub name: String,
}

impl Sender {
    pub fn new(address: &str, name: &str) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or(&self.address)
    }

    /// Whether `address` (possibly `Name <user@host>`) belongs to the
    /// sending domain.
    pub fn owns(&self, address: &str) -> bool {
        let domain = format!("@{}", self.domain().to_lowercase());
        address
            .to_lowercase()
            .trim_end_matches('>')
            .trim()
            .ends_with(&domain)
    }

    fn mailbox(&self) -> String {
        format!("{} <{}>", self.name, self.address)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundReply {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub message_id: String,
    pub in_reply_to: String,
    pub references: String,
}

pub fn compose_reply(sender: &Sender, email: &EmailMessage, text: &str) -> OutboundReply {
    let subject = if email.subject.to_lowercase().starts_with("re:") {
        email.subject.clone()
    } else {
        format!("Re: {}", email.subject)
    };

    let mut body = text.to_string();
    if let Some(original) = &email.text {
        let summary = format!(
            "On {}, {} wrote",
            email.timestamp.format("%d %b %Y at %H:%M"),
            email.from
        );
        let quoted = original
            .trim_end()
            .lines()
            .map(|line| format!("> {}", line))
            .collect::<Vec<_>>()
            .join("\n");
        body = format!("{}\n\n{}:\n{}", body, summary, quoted);
    }

    let references = match email.references.as_deref().map(str::trim) {
        Some(refs) if !refs.is_empty() => format!("{} {}", refs, email.message_id),
        _ => email.message_id.clone(),
    };

    OutboundReply {
        from: sender.mailbox(),
        to: email.from.clone(),
        subject,
        text: body,
        message_id: format!("<{}@{}>", Uuid::new_v4(), sender.domain()),
        in_reply_to: email.message_id.clone(),
        references,
    }
}

#[async_trait]
pub trait ReplyDispatcher: Send + Sync {
    async fn send(&self, reply: &OutboundReply) -> Result<(), DispatchError>;
}

/// Posts replies as JSON to a delivery webhook.
pub struct WebhookDispatcher {
    url: String,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReplyDispatcher for WebhookDispatcher {
    async fn send(&self, reply: &OutboundReply) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .timeout(Duration::from_secs(30))
            .json(reply)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected(status.as_u16()));
        }
        tracing::info!("Reply {} sent to {}", reply.message_id, reply.to);
        Ok(())
    }
}

/// Only logs replies. Used when no delivery webhook is configured.
#[derive(Default)]
pub struct LogDispatcher;

#[async_trait]
impl ReplyDispatcher for LogDispatcher {
    async fn send(&self, reply: &OutboundReply) -> Result<(), DispatchError> {
        tracing::info!(
            "Not delivering reply to {} (no webhook configured): {:?}",
            reply.to,
            reply.subject
        );
        Ok(())
    }
}
