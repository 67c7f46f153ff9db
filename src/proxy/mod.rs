//! Upstream completion API client

pub mod openai;

pub use openai::{ChatMessage, OpenAIClient, Role};
