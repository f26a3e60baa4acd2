//! Integration tests for the inbound mail and threads API endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use spiced_ham::api::public::inbound::InboundResponse;
    use spiced_ham::threads::{Status, ThreadKey, ThreadState, ThreadStateStore};

    use crate::test_utils::{body_to_string, post_raw, raw_email, test_app};

    async fn post_inbound(app: &axum::Router, uri: &str, raw: String) -> InboundResponse {
        let response = app.clone().oneshot(post_raw(uri, raw)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        serde_json::from_str(&body_to_string(response).await).unwrap()
    }

    /// New thread allowed, follow ups answered without classification
    #[tokio::test]
    async fn it_forwards_a_thread_once_allowed() {
        let app = test_app();

        let first = post_inbound(
            &app.router,
            "/",
            raw_email("<hello-1@example.com>", None, "Hello", "hi there"),
        )
        .await;
        assert_eq!(first.status, "ok");
        assert!(first.forward);
        assert_eq!(first.dispatched, None);
        assert_eq!(app.classifier.calls(), 1);

        let follow_up = post_inbound(
            &app.router,
            "/api/inbound",
            raw_email(
                "<hello-2@example.com>",
                Some("<hello-1@example.com>"),
                "Re: Hello",
                "one more thing",
            ),
        )
        .await;
        assert_eq!(follow_up.status, "ok");
        assert_eq!(follow_up.reason, "already forwarding");
        assert_eq!(follow_up.thread_key, first.thread_key);
        assert_eq!(app.classifier.calls(), 1);
    }

    /// Spam gets a reply and the thread stays open for classification
    #[tokio::test]
    async fn it_replies_to_spam_without_settling_the_thread() {
        let app = test_app();

        let response = post_inbound(
            &app.router,
            "/",
            raw_email("<spam-1@example.com>", None, "SPAM SPAM", "buy now"),
        )
        .await;
        assert_eq!(response.status, "reply");
        assert!(!response.forward);
        assert_eq!(response.dispatched, Some(true));

        let sent = app.outbox.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "Alice <alice@example.com>");
        assert_eq!(sent[0].subject, "Re: SPAM SPAM");
        assert_eq!(sent[0].in_reply_to, "<spam-1@example.com>");

        let state = app
            .store
            .load(&ThreadKey::parse(&response.thread_key))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, Status::Undecided);
        assert_eq!(state.messages.len(), 1);
    }

    /// A resubmitted email gets the same answer and changes nothing
    #[tokio::test]
    async fn it_answers_redelivered_mail_from_the_stored_decision() {
        let app = test_app();
        let raw = raw_email("<spam-1@example.com>", None, "SPAM SPAM", "buy now");

        let first = post_inbound(&app.router, "/", raw.clone()).await;
        assert_eq!(first.status, "reply");
        assert_eq!(first.dispatched, Some(true));

        let second = post_inbound(&app.router, "/", raw).await;
        assert_eq!(second.status, "reply");
        assert!(!second.forward);
        assert_eq!(second.thread_key, first.thread_key);
        assert_eq!(second.dispatched, Some(false));

        assert_eq!(app.classifier.calls(), 1);
        assert_eq!(app.outbox.sent.lock().unwrap().len(), 1);
        let state = app
            .store
            .load(&ThreadKey::parse(&first.thread_key))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.status, Status::Undecided);
        assert_eq!(state.messages.len(), 1);
    }

    /// Replies in a dropped thread are dropped without classification
    #[tokio::test]
    async fn it_drops_replies_in_dropped_threads() {
        let app = test_app();
        let key = ThreadKey::from_source("<scam-1@example.com>");
        app.store
            .save(
                &key,
                &ThreadState {
                    status: Status::Dropping,
                    messages: Vec::new(),
                },
            )
            .await
            .unwrap();

        let response = post_inbound(
            &app.router,
            "/",
            raw_email(
                "<scam-2@example.com>",
                Some("<scam-1@example.com> <scam-0@example.com>"),
                "Re: Prize",
                "claim it now",
            ),
        )
        .await;
        assert_eq!(response.status, "drop");
        assert_eq!(response.reason, "already dropping");
        assert!(!response.forward);
        assert_eq!(response.thread_key, key.to_string());
        assert_eq!(app.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn it_returns_400_for_mail_without_a_sender() {
        let app = test_app();
        let raw = "To: ham@spiced.test\r\nSubject: Hello\r\n\r\nhi there\r\n".to_string();

        let response = app.router.clone().oneshot(post_raw("/", raw)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.classifier.calls(), 0);
    }

    #[tokio::test]
    async fn it_returns_stored_threads() {
        let app = test_app();
        let inbound = post_inbound(
            &app.router,
            "/",
            raw_email("<hello-1@example.com>", None, "Hello", "hi there"),
        )
        .await;

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/threads/{}", inbound.thread_key))
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value =
            serde_json::from_str(&body_to_string(response).await).unwrap();
        assert_eq!(body["thread_key"], inbound.thread_key.as_str());
        assert_eq!(body["status"], "replying");
        assert_eq!(body["messages"][0]["body"], "hi there");
        assert_eq!(body["messages"][0]["subject"], "Hello");
    }

    #[tokio::test]
    async fn it_returns_404_for_unknown_threads() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/threads/0123456789abcdef")
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn it_reports_health() {
        let app = test_app();

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .method("GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_to_string(response).await, "ok");
    }
}
