//! Environment-driven configuration for the pipeline's collaborators.
//!
//! Both collaborator credentials are required and validated eagerly: a
//! missing key fails the request with a descriptive configuration error
//! before any completion or provisioning call is attempted.

use crate::errors::PipelineError;
use std::time::Duration;

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const SANDBOX_API_KEY_VAR: &str = "SANDBOX_API_KEY";
pub const OPENAI_BASE_URL_VAR: &str = "OPENAI_BASE_URL";
pub const SANDBOX_BASE_URL_VAR: &str = "SANDBOX_BASE_URL";
pub const OPENAI_MODEL_VAR: &str = "OPENAI_MODEL";

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_SANDBOX_BASE_URL: &str = "https://api.sandbox.internal/v1";

fn default_generation_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_sandbox_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Resolved settings for one pipeline instance.
#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub sandbox_api_key: String,
    /// Override for an alternate completion backend.
    pub openai_base_url: Option<String>,
    /// Override for an alternate sandbox backend.
    pub sandbox_base_url: String,
    pub model: String,
    /// Deadline for one completion call.
    pub generation_timeout: Duration,
    /// Deadline applied to each sandbox stage (provision, seed, execute).
    pub sandbox_timeout: Duration,
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// Fails with a configuration error naming the missing variable so the
    /// caller sees exactly which credential is absent.
    pub fn from_env() -> Result<Self, PipelineError> {
        let openai_api_key = require_env(OPENAI_API_KEY_VAR)?;
        let sandbox_api_key = require_env(SANDBOX_API_KEY_VAR)?;

        Ok(Self {
            openai_api_key,
            sandbox_api_key,
            openai_base_url: optional_env(OPENAI_BASE_URL_VAR),
            sandbox_base_url: optional_env(SANDBOX_BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_SANDBOX_BASE_URL.to_string()),
            model: optional_env(OPENAI_MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            generation_timeout: default_generation_timeout(),
            sandbox_timeout: default_sandbox_timeout(),
        })
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_sandbox_timeout(mut self, timeout: Duration) -> Self {
        self.sandbox_timeout = timeout;
        self
    }
}

fn require_env(name: &str) -> Result<String, PipelineError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PipelineError::Config(format!("{} is not set", name))),
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
