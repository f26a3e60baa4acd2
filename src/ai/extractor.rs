use std::sync::LazyLock;

use async_trait::async_trait;
use handlebars::Handlebars;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::classifier::strip_code_fence;
use super::prompt::{Prompt, templates};
use crate::openai::{ChatEndpoint, Message, Role};
use crate::threads::ThreadMessage;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("extractor request failed: {0}")]
    Request(#[from] anyhow::Error),
    #[error("extractor returned an unusable answer: {0}")]
    Malformed(String),
}

/// Recovers the earlier messages quoted in a reply body. Returns them
/// in the order they appear in the body, which is newest first. The
/// unquoted new message is not included. Best effort, an empty list
/// means nothing could be segmented.
#[async_trait]
pub trait MessageExtractor: Send + Sync {
    async fn extract(&self, body: &str) -> Result<Vec<ThreadMessage>, ExtractError>;
}

static ATTRIBUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^On .+?,\s*(?P<from>[^,]+?)\s+wrote:\s*$").expect("Invalid attribution regex")
});

/// Splits `>` quoted blocks. Each quote level is one earlier message
/// and an `On <date>, <sender> wrote:` line names the sender of the
/// level below it.
#[derive(Debug, Default)]
pub struct QuoteExtractor;

fn quote_depth(line: &str) -> (usize, &str) {
    let mut depth = 0;
    let mut rest = line.trim_start();
    while let Some(stripped) = rest.strip_prefix('>') {
        depth += 1;
        rest = stripped.trim_start();
    }
    (depth, rest)
}

#[derive(Default)]
struct Segment {
    from: Option<String>,
    lines: Vec<String>,
}

impl QuoteExtractor {
    pub fn segment(body: &str) -> Vec<ThreadMessage> {
        let mut segments: Vec<Segment> = Vec::new();
        for line in body.lines() {
            let (depth, content) = quote_depth(line);

            if let Some(captures) = ATTRIBUTION.captures(content) {
                // Introduces the message one level deeper
                let index = depth;
                if segments.len() <= index {
                    segments.resize_with(index + 1, Segment::default);
                }
                segments[index].from = Some(captures["from"].trim().to_string());
                continue;
            }

            if depth == 0 {
                continue;
            }
            let index = depth - 1;
            if segments.len() <= index {
                segments.resize_with(index + 1, Segment::default);
            }
            segments[index].lines.push(content.to_string());
        }

        segments
            .into_iter()
            .map(|segment| ThreadMessage::new(segment.from, &segment.lines.join("\n")))
            .filter(|message| !message.body.is_empty())
            .collect()
    }

    /// The text a reply adds: everything outside quote blocks and
    /// their attribution lines. A body that is all quote is kept whole.
    pub fn unquoted(body: &str) -> String {
        let text = body
            .lines()
            .filter(|line| {
                let (depth, content) = quote_depth(line);
                depth == 0 && !ATTRIBUTION.is_match(content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        match text.trim() {
            "" => body.trim().to_string(),
            text => text.to_string(),
        }
    }
}

#[async_trait]
impl MessageExtractor for QuoteExtractor {
    async fn extract(&self, body: &str) -> Result<Vec<ThreadMessage>, ExtractError> {
        Ok(Self::segment(body))
    }
}

#[derive(Deserialize)]
struct ExtractedMessage {
    from: Option<String>,
    body: String,
}

#[derive(Deserialize)]
struct Extracted {
    messages: Vec<ExtractedMessage>,
}

/// Asks a chat completion model to segment the quoted thread.
pub struct LlmExtractor {
    endpoint: ChatEndpoint,
    templates: Handlebars<'static>,
}

impl LlmExtractor {
    pub fn new(endpoint: ChatEndpoint) -> Self {
        Self {
            endpoint,
            templates: templates(),
        }
    }
}

#[async_trait]
impl MessageExtractor for LlmExtractor {
    async fn extract(&self, body: &str) -> Result<Vec<ThreadMessage>, ExtractError> {
        let prompt = self
            .templates
            .render(&Prompt::ExtractThread.to_string(), &json!({ "body": body }))
            .map_err(anyhow::Error::from)?;
        let content = self
            .endpoint
            .complete_json(&[Message::new(Role::User, &prompt)])
            .await?;
        parse_extracted(&content)
    }
}

pub fn parse_extracted(content: &str) -> Result<Vec<ThreadMessage>, ExtractError> {
    let body = strip_code_fence(content);
    let extracted: Extracted = serde_json::from_str(body)
        .map_err(|err| ExtractError::Malformed(format!("{}: {}", err, body)))?;
    Ok(extracted
        .messages
        .into_iter()
        .map(|m| ThreadMessage::new(m.from.filter(|f| !f.trim().is_empty()), &m.body))
        .filter(|m| !m.body.is_empty())
        .collect())
}
