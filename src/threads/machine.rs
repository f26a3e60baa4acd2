//! The thread state machine.
//!
//! A thread moves from "no record" through classification into one of
//! two terminal statuses (`replying`, `dropping`) or stays undecided
//! when the classifier asked for an automatic reply. Terminal threads
//! are answered from their status alone. State is only saved once a
//! decision exists, so a failed classification leaves the stored
//! record untouched and the same email can simply be retried. A
//! Message-ID already in the history is answered with the decision
//! stored for it, so redelivery never changes the thread.

use std::sync::Arc;

use super::key::{ThreadKey, resolve_key};
use super::locks::KeyLocks;
use super::state::{Decision, ThreadMessage, ThreadState};
use super::store::{StoreError, ThreadStateStore};
use crate::ai::{Classifier, ClassifyError, MessageExtractor};
use crate::email::EmailMessage;

#[derive(Debug, thiserror::Error)]
pub enum ThreadError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("classification failed: {0}")]
    Classification(#[from] ClassifyError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub key: ThreadKey,
    pub decision: Decision,
    /// The email was already handled, nothing was classified or saved.
    pub redelivered: bool,
}

pub struct ThreadStateMachine {
    store: Arc<dyn ThreadStateStore>,
    classifier: Arc<dyn Classifier>,
    extractor: Arc<dyn MessageExtractor>,
    locks: KeyLocks,
}

impl ThreadStateMachine {
    pub fn new(
        store: Arc<dyn ThreadStateStore>,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn MessageExtractor>,
    ) -> Self {
        Self {
            store,
            classifier,
            extractor,
            locks: KeyLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ThreadStateStore> {
        &self.store
    }

    /// Decide what to do with an inbound email and persist the
    /// thread's new state.
    pub async fn handle(&self, email: &EmailMessage) -> Result<Outcome, ThreadError> {
        let key = resolve_key(email);

        // Held until the new state is saved
        let _guard = self.locks.lock(&key).await;

        let prior = self.store.load(&key).await?;
        if let Some(decision) = prior.as_ref().and_then(ThreadState::settled_decision) {
            tracing::debug!(
                "Thread {} is settled, answering {} without classification",
                key,
                decision.label()
            );
            return Ok(Outcome {
                key,
                decision,
                redelivered: false,
            });
        }

        let mut state = prior.unwrap_or_default();
        if let Some(seen) = state.find(&email.message_id) {
            let decision = match &seen.decision {
                Some(decision) => decision.clone(),
                None => self.classifier.classify(&state.messages).await?,
            };
            tracing::debug!(
                "Already handled {} in thread {}, answering {}",
                email.message_id,
                key,
                decision.label()
            );
            return Ok(Outcome {
                key,
                decision,
                redelivered: true,
            });
        }

        if email.is_reply() && state.messages.is_empty() {
            state.messages = self.recover_history(email).await;
        }
        state.messages.push(ThreadMessage::from(email));

        let decision = self.classifier.classify(&state.messages).await?;
        let prior_status = state.status;
        state.apply(&decision);
        self.store.save(&key, &state).await?;

        tracing::info!(
            "Thread {} ({} messages, was {}) decided {}: {}",
            key,
            state.messages.len(),
            prior_status.as_str(),
            decision.label(),
            decision.reason()
        );
        Ok(Outcome {
            key,
            decision,
            redelivered: false,
        })
    }

    /// Rebuild the prior conversation from the quoted body of a reply
    /// that has no stored history. Falls back to no history when the
    /// thread can't be segmented.
    async fn recover_history(&self, email: &EmailMessage) -> Vec<ThreadMessage> {
        match self.extractor.extract(&email.context_text()).await {
            Ok(mut messages) => {
                // Quoted messages appear newest first
                messages.reverse();
                messages
            }
            Err(err) => {
                tracing::warn!(
                    "Could not recover thread history for {}, classifying the message alone: {}",
                    email.message_id,
                    err
                );
                Vec::new()
            }
        }
    }
}
