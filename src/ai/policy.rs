//! The classification policy: instructions plus labelled examples.
//! Loaded once at startup and never mutated afterwards.

use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::threads::Decision;

const DEFAULT_PROMPT: &str = r"
You screen inbound email for a busy person. For each conversation decide one of:

- ok: a genuine message the owner should see. The conversation is forwarded from now on.
- reply: unsolicited or low value mail that deserves a short, polite automatic response
  (for example asking the sender to stop, or pointing them to the right contact).
- drop: spam, scams or mass mailings that should be silently discarded from now on.

Judge the conversation as a whole. Prefer ok when unsure.
";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub subject: String,
    pub body: String,
    pub decision: Decision,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub prompt: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.trim().to_string(),
            examples: vec![
                Example {
                    subject: String::from("Quick question about your talk"),
                    body: String::from(
                        "Hi, I watched your talk last week and wondered if the slides are online?",
                    ),
                    decision: Decision::Allow {
                        reason: String::from("A personal question from a real person."),
                    },
                },
                Example {
                    subject: String::from("Boost your SEO ranking 300%"),
                    body: String::from(
                        "Dear Sir/Madam, we are a leading agency offering guaranteed first page results.",
                    ),
                    decision: Decision::Reply {
                        text: String::from(
                            "Thanks, but we're not interested. Please remove this address from your list.",
                        ),
                        reason: String::from("Cold sales outreach."),
                    },
                },
                Example {
                    subject: String::from("Your account has been suspended"),
                    body: String::from("Verify your password within 24 hours at http://example.test/login"),
                    decision: Decision::Drop {
                        reason: String::from("Phishing."),
                    },
                },
            ],
        }
    }
}

impl Policy {
    /// Read the policy document at `path`, or the built in policy
    /// when no path is configured.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy document {}", path))?;
        let policy = serde_json::from_str(&data)
            .with_context(|| format!("Invalid policy document {}", path))?;
        tracing::info!("Loaded classification policy from {}", path);
        Ok(policy)
    }
}
