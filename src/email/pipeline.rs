use std::sync::Arc;

use anyhow::Result;

use super::EmailMessage;
use super::reply::{ReplyDispatcher, Sender, compose_reply};
use crate::ai::{self, Policy};
use crate::core::AppConfig;
use crate::threads::{Decision, Outcome, ThreadError, ThreadStateMachine, ThreadStateStore};

/// Result of running one inbound email through the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Processed {
    pub outcome: Outcome,
    /// Set for `Reply` decisions: whether the reply went out.
    pub dispatched: Option<bool>,
}

/// Inbound email → thread state machine → reply dispatch.
pub struct Pipeline {
    machine: ThreadStateMachine,
    dispatcher: Arc<dyn ReplyDispatcher>,
    sender: Sender,
}

impl Pipeline {
    pub fn new(
        machine: ThreadStateMachine,
        dispatcher: Arc<dyn ReplyDispatcher>,
        sender: Sender,
    ) -> Self {
        Self {
            machine,
            dispatcher,
            sender,
        }
    }

    /// Wire up the collaborators selected by the configuration around
    /// the given store.
    pub fn from_config(
        config: &AppConfig,
        policy: &Policy,
        store: Arc<dyn ThreadStateStore>,
    ) -> Result<Self> {
        let classifier = ai::build_classifier(config, policy)?;
        let extractor = ai::build_extractor(config);
        let dispatcher = config.reply_dispatcher();
        let machine = ThreadStateMachine::new(store, classifier, extractor);
        Ok(Self::new(machine, dispatcher, config.sender()))
    }

    pub fn store(&self) -> &Arc<dyn ThreadStateStore> {
        self.machine.store()
    }

    pub async fn run(&self, email: &EmailMessage) -> Result<Processed, ThreadError> {
        tracing::info!(
            "Processing {:?} from {} ({})",
            email.subject,
            email.from,
            email.message_id
        );
        let outcome = self.machine.handle(email).await?;
        let dispatched = match &outcome.decision {
            // The reply went out with the first delivery
            Decision::Reply { .. } if outcome.redelivered => Some(false),
            Decision::Reply { text, .. } => Some(self.send_reply(email, text).await),
            Decision::Allow { .. } | Decision::Drop { .. } => None,
        };
        Ok(Processed {
            outcome,
            dispatched,
        })
    }

    /// Delivery failures are logged but don't fail the request, the
    /// thread state is already saved at this point.
    async fn send_reply(&self, email: &EmailMessage, text: &str) -> bool {
        if self.sender.owns(&email.from) {
            tracing::warn!("Not sending reply to own domain: {}", email.from);
            return false;
        }
        let reply = compose_reply(&self.sender, email, text);
        match self.dispatcher.send(&reply).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("Failed to send reply to {}: {}", email.from, err);
                false
            }
        }
    }
}
