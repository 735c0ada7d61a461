//! Completion service integration.
//!
//! Defines the trait the code generator depends on and the OpenAI-style
//! HTTP client implementing it. The completion service is an external
//! collaborator with its own latency and non-determinism; everything here
//! treats its response as an externally-versioned schema and validates the
//! shape explicitly instead of assuming it.

use crate::errors::PipelineError;
use async_trait::async_trait;

pub mod openai;

pub use openai::OpenAiClient;

/// A chat-completion collaborator: one system instruction, one user prompt,
/// one generated text back.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError>;
}
