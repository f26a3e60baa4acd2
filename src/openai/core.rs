use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Message {
    role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Message {
            role,
            content: content.to_string(),
        }
    }
}

/// An OpenAI compatible chat completion endpoint.
#[derive(Clone, Debug)]
pub struct ChatEndpoint {
    pub api_hostname: String,
    pub api_key: String,
    pub model: String,
}

impl ChatEndpoint {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Run a completion constrained to a JSON object and return the
    /// raw content of the first choice.
    pub async fn complete_json(&self, messages: &[Message]) -> Result<String, Error> {
        let resp = completion(
            messages,
            true,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await?;
        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or(anyhow!("No message received. Resp:\n\n {}", resp))
    }
}

pub async fn completion(
    messages: &[Message],
    json_mode: bool,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Value, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });
    if json_mode {
        payload["response_format"] = json!({"type": "json_object"});
    }
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches("/"));
    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .header("Content-Type", "application/json")
        .timeout(Duration::from_secs(60 * 2))
        .json(&payload)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), r#""system""#);
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            r#""assistant""#
        );
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
    }

    #[test]
    fn test_message_new() {
        let msg = Message::new(Role::User, "Hello world");
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"user","content":"Hello world"}"#
        );
    }

    #[tokio::test]
    async fn test_complete_json() {
        let mut server = mockito::Server::new_async().await;
        let response_body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1694268190,
            "model": "gpt-4.1-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "{\"status\":\"ok\",\"reason\":\"fine\"}"
                },
                "finish_reason": "stop"
            }]
        }"#;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-api-key")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "gpt-4.1-mini",
                "response_format": {"type": "json_object"},
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body)
            .create_async()
            .await;

        let endpoint = ChatEndpoint::new(&server.url(), "test-api-key", "gpt-4.1-mini");
        let content = endpoint
            .complete_json(&[Message::new(Role::User, "Classify this")])
            .await
            .unwrap();
        assert_eq!(content, r#"{"status":"ok","reason":"fine"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_json_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .create_async()
            .await;

        let endpoint = ChatEndpoint::new(&server.url(), "test-api-key", "gpt-4.1-mini");
        let result = endpoint
            .complete_json(&[Message::new(Role::User, "Classify this")])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_complete_json_missing_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let endpoint = ChatEndpoint::new(&server.url(), "test-api-key", "gpt-4.1-mini");
        let err = endpoint
            .complete_json(&[Message::new(Role::User, "Classify this")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No message received"));
    }
}
