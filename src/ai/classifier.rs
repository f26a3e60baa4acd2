use std::sync::LazyLock;

use async_trait::async_trait;
use handlebars::Handlebars;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use super::policy::Policy;
use super::prompt::{Prompt, templates};
use crate::openai::{ChatEndpoint, Message, Role};
use crate::threads::{Decision, ThreadMessage};

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Request(#[from] anyhow::Error),
    #[error("classifier returned an unusable answer: {0}")]
    Malformed(String),
}

/// Decides what to do with a conversation. `history` is chronological
/// and never empty, the last entry is the message being decided on.
/// Implementations may be non-deterministic.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, history: &[ThreadMessage]) -> Result<Decision, ClassifyError>;
}

/// Subject line rules. Replies are let through, anything that calls
/// itself spam gets a polite request to stop.
#[derive(Debug, Default)]
pub struct KeywordClassifier;

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, history: &[ThreadMessage]) -> Result<Decision, ClassifyError> {
        if history.len() > 1 {
            return Ok(Decision::Allow {
                reason: String::from("This email is a reply, let all replies through."),
            });
        }

        let subject = history
            .last()
            .and_then(|m| m.subject.as_deref())
            .unwrap_or_default();
        if subject.to_lowercase().contains("spam") {
            Ok(Decision::Reply {
                text: String::from("Please stop sending spam."),
                reason: String::from("looks like your email is spam."),
            })
        } else {
            Ok(Decision::Allow {
                reason: String::from("This email is not spam."),
            })
        }
    }
}

#[derive(Serialize)]
struct ExampleView<'a> {
    subject: &'a str,
    body: &'a str,
    answer: String,
}

/// Asks a chat completion model, guided by the policy document.
pub struct LlmClassifier {
    endpoint: ChatEndpoint,
    system_prompt: String,
    templates: Handlebars<'static>,
}

impl LlmClassifier {
    pub fn new(endpoint: ChatEndpoint, policy: &Policy) -> Result<Self, ClassifyError> {
        let templates = templates();
        let examples = policy
            .examples
            .iter()
            .map(|example| {
                Ok(ExampleView {
                    subject: &example.subject,
                    body: &example.body,
                    answer: serde_json::to_string(&example.decision)?,
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()
            .map_err(anyhow::Error::from)?;
        let system_prompt = templates
            .render(
                &Prompt::ClassifyPolicy.to_string(),
                &json!({"policy": policy.prompt, "examples": examples}),
            )
            .map_err(anyhow::Error::from)?;

        Ok(Self {
            endpoint,
            system_prompt,
            templates,
        })
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, history: &[ThreadMessage]) -> Result<Decision, ClassifyError> {
        let thread = self
            .templates
            .render(
                &Prompt::ClassifyThread.to_string(),
                &json!({ "messages": history }),
            )
            .map_err(anyhow::Error::from)?;
        let messages = vec![
            Message::new(Role::System, &self.system_prompt),
            Message::new(Role::User, &thread),
        ];

        let content = self.endpoint.complete_json(&messages).await?;
        tracing::debug!("Classifier answered: {}", content);
        parse_decision(&content)
    }
}

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("Invalid code fence regex")
});

/// Models sometimes wrap JSON answers in a markdown code fence.
pub(crate) fn strip_code_fence(content: &str) -> &str {
    match CODE_FENCE.captures(content).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => content.trim(),
    }
}

pub fn parse_decision(content: &str) -> Result<Decision, ClassifyError> {
    let body = strip_code_fence(content);
    let decision: Decision = serde_json::from_str(body)
        .map_err(|err| ClassifyError::Malformed(format!("{}: {}", err, body)))?;
    if let Decision::Reply { text, .. } = &decision {
        if text.trim().is_empty() {
            return Err(ClassifyError::Malformed(String::from(
                "reply decision without reply text",
            )));
        }
    }
    Ok(decision)
}
