//! Test utilities for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use axum::{Router, body::Body, response::Response};
use tempfile::TempDir;

use spiced_ham::ai::{Classifier, ClassifyError, KeywordClassifier, QuoteExtractor};
use spiced_ham::api::{AppState, app};
use spiced_ham::core::{AppConfig, ClassifierKind, StoreBackend};
use spiced_ham::email::{DispatchError, OutboundReply, Pipeline, ReplyDispatcher};
use spiced_ham::threads::{Decision, FileStore, ThreadMessage, ThreadStateMachine};

/// Keyword rules that count how often they are consulted.
#[derive(Default)]
pub struct CountingClassifier {
    pub calls: AtomicUsize,
}

impl CountingClassifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for CountingClassifier {
    async fn classify(&self, history: &[ThreadMessage]) -> Result<Decision, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        KeywordClassifier.classify(history).await
    }
}

/// Records replies instead of sending them.
#[derive(Default)]
pub struct Outbox {
    pub sent: Mutex<Vec<OutboundReply>>,
}

#[async_trait]
impl ReplyDispatcher for Outbox {
    async fn send(&self, reply: &OutboundReply) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push(reply.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<FileStore>,
    pub classifier: Arc<CountingClassifier>,
    pub outbox: Arc<Outbox>,
    // Removed on drop
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        storage_path: dir.path().display().to_string(),
        store_backend: StoreBackend::File,
        policy_path: None,
        classifier: ClassifierKind::Keyword,
        openai_api_hostname: String::from("http://localhost:0"),
        openai_api_key: None,
        openai_model: String::from("gpt-4.1-mini"),
        reply_webhook_url: None,
        from_address: String::from("ham@spiced.test"),
        from_name: String::from("Spiced Ham"),
    }
}

/// Creates a test application router backed by a file store in a
/// temporary directory, keyword rules and a recording outbox.
pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = test_config(&dir);

    let store = Arc::new(FileStore::new(config.threads_path()));
    let classifier = Arc::new(CountingClassifier::default());
    let outbox = Arc::new(Outbox::default());

    let machine = ThreadStateMachine::new(
        store.clone(),
        classifier.clone(),
        Arc::new(QuoteExtractor),
    );
    let pipeline = Pipeline::new(machine, outbox.clone(), config.sender());
    let router = app(Arc::new(RwLock::new(AppState::new(pipeline))));

    TestApp {
        router,
        store,
        classifier,
        outbox,
        dir,
    }
}

/// A minimal raw message from alice. `references` makes it a reply.
pub fn raw_email(message_id: &str, references: Option<&str>, subject: &str, body: &str) -> String {
    let mut raw = String::new();
    raw.push_str("From: Alice <alice@example.com>\r\n");
    raw.push_str("To: ham@spiced.test\r\n");
    raw.push_str(&format!("Subject: {}\r\n", subject));
    raw.push_str(&format!("Message-ID: {}\r\n", message_id));
    if let Some(references) = references {
        raw.push_str(&format!("In-Reply-To: {}\r\n", references));
        raw.push_str(&format!("References: {}\r\n", references));
    }
    raw.push_str("Date: Fri, 16 Oct 2026 09:15:00 +0000\r\n");
    raw.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    raw.push_str("\r\n");
    raw.push_str(body);
    raw.push_str("\r\n");
    raw
}

pub async fn body_to_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn post_raw(uri: &str, raw: String) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .uri(uri)
        .method("POST")
        .header("content-type", "message/rfc822")
        .body(Body::from(raw))
        .unwrap()
}
