//! Inbound email as seen by the rest of the service.

pub mod pipeline;
pub mod reply;

use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use pipeline::{Pipeline, Processed};
pub use reply::{
    DispatchError, LogDispatcher, OutboundReply, ReplyDispatcher, Sender, WebhookDispatcher,
    compose_reply,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed MIME message: {0}")]
    Mime(#[from] mailparse::MailParseError),
    #[error("missing {0} header")]
    MissingHeader(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub message_id: String,
    /// Raw `References` header (falls back to `In-Reply-To`)
    pub references: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub text: Option<String>,
    pub html: Option<String>,
}

impl EmailMessage {
    /// Parse a raw RFC 5322 message. Only the headers used for
    /// threading and the first text and HTML parts are kept.
    pub fn from_raw(raw: &[u8]) -> Result<Self, ParseError> {
        let parsed = mailparse::parse_mail(raw)?;
        let headers = &parsed.headers;
        let header = |name: &str| {
            headers
                .get_first_value(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let from = header("From").ok_or(ParseError::MissingHeader("From"))?;
        let message_id = header("Message-ID")
            .unwrap_or_else(|| format!("<{}@spiced-ham>", Uuid::new_v4()));
        let references = header("References").or_else(|| header("In-Reply-To"));
        let timestamp = header("Date")
            .and_then(|date| mailparse::dateparse(&date).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);

        let mut text = None;
        let mut html = None;
        collect_bodies(&parsed, &mut text, &mut html)?;

        Ok(Self {
            from,
            to: header("To").unwrap_or_default(),
            subject: header("Subject").unwrap_or_default(),
            message_id,
            references,
            timestamp,
            text,
            html,
        })
    }

    pub fn is_reply(&self) -> bool {
        self.references
            .as_deref()
            .is_some_and(|refs| !refs.trim().is_empty())
    }

    /// Text used as classification context: the plain text body, or
    /// the HTML body converted to markdown.
    pub fn context_text(&self) -> String {
        if let Some(text) = &self.text {
            return text.trim().to_string();
        }
        if let Some(html) = &self.html {
            match htmd::convert(html) {
                Ok(markdown) => return markdown.trim().to_string(),
                Err(err) => tracing::warn!("Failed to convert HTML body to text: {}", err),
            }
        }
        String::new()
    }
}

fn collect_bodies(
    part: &ParsedMail,
    text: &mut Option<String>,
    html: &mut Option<String>,
) -> Result<(), ParseError> {
    if part.subparts.is_empty() {
        match part.ctype.mimetype.as_str() {
            "text/plain" if text.is_none() => *text = Some(part.get_body()?),
            "text/html" if html.is_none() => *html = Some(part.get_body()?),
            _ => {}
        }
        return Ok(());
    }
    for sub in &part.subparts {
        collect_bodies(sub, text, html)?;
    }
    Ok(())
}
