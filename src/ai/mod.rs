//! The external judgement the thread state machine relies on: a
//! classifier that decides on a conversation and an extractor that
//! recovers earlier messages from a quoted reply.

pub mod classifier;
pub mod extractor;
pub mod policy;
pub mod prompt;

use std::sync::Arc;

use anyhow::Result;

pub use classifier::{Classifier, ClassifyError, KeywordClassifier, LlmClassifier, parse_decision};
pub use extractor::{ExtractError, LlmExtractor, MessageExtractor, QuoteExtractor};
pub use policy::{Example, Policy};

use crate::core::{AppConfig, ClassifierKind};

pub fn build_classifier(config: &AppConfig, policy: &Policy) -> Result<Arc<dyn Classifier>> {
    let classifier: Arc<dyn Classifier> = match (&config.classifier, config.chat_endpoint()) {
        (ClassifierKind::Llm, Some(endpoint)) => Arc::new(LlmClassifier::new(endpoint, policy)?),
        (ClassifierKind::Llm, None) => {
            tracing::warn!("No OPENAI_API_KEY configured, using keyword rules");
            Arc::new(KeywordClassifier)
        }
        (ClassifierKind::Keyword, _) => Arc::new(KeywordClassifier),
    };
    Ok(classifier)
}

pub fn build_extractor(config: &AppConfig) -> Arc<dyn MessageExtractor> {
    match (&config.classifier, config.chat_endpoint()) {
        (ClassifierKind::Llm, Some(endpoint)) => Arc::new(LlmExtractor::new(endpoint)),
        _ => Arc::new(QuoteExtractor),
    }
}
