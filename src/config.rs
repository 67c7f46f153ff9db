//! Configuration management for the relay
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use reqwest::header::HeaderValue;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// OpenAI API base URL
    pub openai_api_url: String,
    /// OpenAI API key (required; the relay cannot function without it)
    pub openai_api_key: String,

    /// Directory served for non-API paths
    pub static_dir: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails if `OPENAI_API_KEY` is absent; this is a startup precondition,
    /// never a per-request check.
    pub fn from_env() -> Result<Self> {
        let openai_api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?;
        // The key travels in an Authorization header on every request;
        // reject a non-header-safe value here rather than per request
        HeaderValue::from_str(&openai_api_key)
            .context("OPENAI_API_KEY is not a valid header value")?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid PORT")?,

            openai_api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key,

            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "public".to_string()),
        })
    }
}
