//! OpenAI chat completions client
//!
//! Issues the single outbound streaming call the relay makes. Generation
//! parameters are fixed; the only caller-supplied input is the message
//! sequence, which is forwarded verbatim and in order.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Model the relay always requests
const MODEL: &str = "gpt-4o-mini";
/// Completion token budget per request
const MAX_TOKENS: u32 = 512;
/// Sampling temperature
const TEMPERATURE: f64 = 0.2;

/// Chat message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Upstream request body with the relay's fixed generation parameters
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'static str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: String,
    /// Headers sent on every upstream request, built once at startup
    headers: HeaderMap,
}

impl OpenAIClient {
    /// Create a new client from configuration.
    ///
    /// Fails if the configured key cannot be carried in an Authorization
    /// header; this happens at startup, so a bad key never panics a request.
    pub fn new(client: reqwest::Client, config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.openai_api_key))
                .context("OPENAI_API_KEY is not a valid header value")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            client,
            base_url: config.openai_api_url.clone(),
            headers,
        })
    }

    /// Start a streaming chat completion.
    ///
    /// Returns once response headers are in; the caller owns the body stream
    /// and is responsible for checking the status. A non-2xx response still
    /// comes back `Ok` here so its error body can be read and reframed.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: MODEL,
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            stream: true,
        };

        self.client
            .post(&url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_non_header_safe_key_rejected_at_construction() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            openai_api_url: "http://localhost".to_string(),
            openai_api_key: "bad\nkey".to_string(),
            static_dir: "public".to_string(),
        };

        assert!(OpenAIClient::new(reqwest::Client::new(), &config).is_err());
    }

    #[test]
    fn test_completion_request_body_shape() {
        let messages = vec![ChatMessage {
            role: Role::User,
            content: "hello".to_string(),
        }];
        let body = CompletionRequest {
            model: MODEL,
            messages: &messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            stream: true,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], "gpt-4o-mini");
        assert_eq!(value["max_tokens"], 512);
        assert_eq!(value["temperature"], 0.2);
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hello");
    }
}
