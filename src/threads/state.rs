use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ai::QuoteExtractor;
use crate::email::EmailMessage;

/// Thread level policy. `Replying` and `Dropping` are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Undecided,
    /// The human facing channel is open, later messages are let
    /// through without classification.
    #[serde(alias = "forwarding")]
    Replying,
    Dropping,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::Undecided)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Undecided => "undecided",
            Status::Replying => "replying",
            Status::Dropping => "dropping",
        }
    }
}

/// Outcome of classifying a message. Serialized with a `status` tag
/// matching the response the HTTP endpoint reports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Decision {
    #[serde(rename = "ok")]
    Allow { reason: String },
    Reply { text: String, reason: String },
    Drop { reason: String },
}

impl Decision {
    pub fn reason(&self) -> &str {
        match self {
            Decision::Allow { reason }
            | Decision::Reply { reason, .. }
            | Decision::Drop { reason } => reason,
        }
    }

    /// Short status label, `ok`, `reply` or `drop`.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow { .. } => "ok",
            Decision::Reply { .. } => "reply",
            Decision::Drop { .. } => "drop",
        }
    }
}

/// One message of a thread as seen by the classifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    /// Set for messages that arrived as inbound email. Recovered
    /// history has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub body: String,
    /// What was decided when this message arrived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl ThreadMessage {
    pub fn new(from: Option<String>, body: &str) -> Self {
        Self {
            message_id: None,
            from,
            subject: None,
            sent_at: None,
            body: body.trim().to_string(),
            decision: None,
        }
    }
}

/// Only the new text of the email is kept, quoted history is either
/// already stored or recovered separately.
impl From<&EmailMessage> for ThreadMessage {
    fn from(email: &EmailMessage) -> Self {
        Self {
            message_id: Some(email.message_id.clone()),
            from: Some(email.from.clone()),
            subject: Some(email.subject.clone()),
            sent_at: Some(email.timestamp),
            body: QuoteExtractor::unquoted(&email.context_text()),
            decision: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadState {
    pub status: Status,
    /// Chronological, oldest first.
    #[serde(default)]
    pub messages: Vec<ThreadMessage>,
}

// Records written by older deployments held only the status tag.
#[derive(Deserialize)]
#[serde(untagged)]
enum Record {
    Full(ThreadState),
    StatusOnly(Status),
}

impl ThreadState {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let record = serde_json::from_slice::<Record>(bytes)?;
        Ok(match record {
            Record::Full(state) => state,
            Record::StatusOnly(status) => ThreadState {
                status,
                messages: Vec::new(),
            },
        })
    }

    /// The decision implied by a terminal status, if any.
    pub fn settled_decision(&self) -> Option<Decision> {
        match self.status {
            Status::Undecided => None,
            Status::Replying => Some(Decision::Allow {
                reason: String::from("already forwarding"),
            }),
            Status::Dropping => Some(Decision::Drop {
                reason: String::from("already dropping"),
            }),
        }
    }

    /// The stored message with this Message-ID, if it was seen before.
    pub fn find(&self, message_id: &str) -> Option<&ThreadMessage> {
        self.messages
            .iter()
            .find(|message| message.message_id.as_deref() == Some(message_id))
    }

    /// Record a fresh decision against the newest message. `Reply` is
    /// per message output and never freezes the thread.
    pub fn apply(&mut self, decision: &Decision) {
        if let Some(newest) = self.messages.last_mut() {
            newest.decision = Some(decision.clone());
        }
        match decision {
            Decision::Allow { .. } => self.status = Status::Replying,
            Decision::Drop { .. } => self.status = Status::Dropping,
            Decision::Reply { .. } => {}
        }
    }
}
