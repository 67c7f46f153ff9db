//! AiLK relay server library
//!
//! A single-endpoint relay: it accepts a chat request, forwards it to the
//! OpenAI completions API with streaming enabled, and pumps the incremental
//! output back to the client as server-sent events.

pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod streaming;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::error::{AppError, AppResult};
pub use crate::proxy::OpenAIClient;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Client for the upstream completion API
    pub openai: OpenAIClient,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // HTTP client with connection pooling; no request timeout, since a
        // completion stream can legitimately stay open for a long time
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()?;

        let openai = OpenAIClient::new(http_client, &config)?;

        Ok(Self { config, openai })
    }
}
