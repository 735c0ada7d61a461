//! End-to-end orchestration of the generate-execute pipeline.
//!
//! [`QueryPipeline`] is the only component that knows the full
//! request/response contract. It sequences generation, dataset loading, the
//! sandbox session, and normalization linearly with no retries: a failure at
//! any stage ends the request with a fail-fast error response, and the only
//! resilience mechanism is the session's guaranteed teardown. Collaborators
//! are injected at construction so tests can substitute fakes.

use crate::config::Settings;
use crate::core_types::QueryResponse;
use crate::errors::PipelineError;
use crate::generator::CodeGenerator;
use crate::llm::{CompletionClient, OpenAiClient};
use crate::normalize::normalize;
use crate::sandbox::{HttpSandboxProvider, SandboxProvider, SandboxSession};
use crate::Dataset;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A pipeline failure, carrying whatever code was generated before the
/// failing stage so the caller still sees it.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    pub error: PipelineError,
    pub code: String,
}

impl PipelineFailure {
    fn new(error: PipelineError, code: String) -> Self {
        Self { error, code }
    }

    /// The error-shaped response body: `"Error: {message}"` plus the
    /// partial code, with no exit code.
    pub fn into_response(self) -> QueryResponse {
        QueryResponse {
            result: format!("Error: {}", self.error),
            code: self.code,
            exit_code: None,
        }
    }
}

/// Seam between the HTTP surface and the pipeline.
#[async_trait]
pub trait QueryHandler: Send + Sync {
    async fn run_query(&self, prompt: &str) -> Result<QueryResponse, PipelineFailure>;

    /// Reachability of the execution collaborator, for health checks.
    async fn ping(&self) -> bool;
}

pub struct QueryPipeline {
    generator: CodeGenerator,
    provider: Arc<dyn SandboxProvider>,
    dataset_path: PathBuf,
    generation_timeout: Duration,
}

impl QueryPipeline {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        provider: Arc<dyn SandboxProvider>,
        dataset_path: PathBuf,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            generator: CodeGenerator::new(completion),
            provider,
            dataset_path,
            generation_timeout,
        }
    }

    /// Build a pipeline wired to the real collaborators described by
    /// `settings`.
    pub fn from_settings(settings: &Settings, dataset_path: PathBuf) -> Self {
        let mut completion =
            OpenAiClient::new(settings.openai_api_key.clone(), settings.model.clone());
        if let Some(base) = &settings.openai_base_url {
            completion = completion.with_api_base(base.clone());
        }

        let provider = HttpSandboxProvider::new(
            settings.sandbox_api_key.clone(),
            settings.sandbox_base_url.clone(),
        )
        .with_stage_timeout(settings.sandbox_timeout);

        Self::new(
            Arc::new(completion),
            Arc::new(provider),
            dataset_path,
            settings.generation_timeout,
        )
    }
}

#[async_trait]
impl QueryHandler for QueryPipeline {
    async fn run_query(&self, prompt: &str) -> Result<QueryResponse, PipelineFailure> {
        log::info!("Running query pipeline for prompt ({} bytes)", prompt.len());

        let code = tokio::time::timeout(self.generation_timeout, self.generator.generate(prompt))
            .await
            .map_err(|_| {
                PipelineFailure::new(
                    PipelineError::Timeout("code generation".to_string()),
                    String::new(),
                )
            })?
            .map_err(|e| PipelineFailure::new(e, String::new()))?;

        let dataset = Dataset::load(&self.dataset_path)
            .await
            .map_err(|e| PipelineFailure::new(e, code.clone()))?;

        let execution = SandboxSession::run(self.provider.as_ref(), &dataset, &code)
            .await
            .map_err(|e| PipelineFailure::new(e, code.clone()))?;

        log::info!("Program finished with exit code {}", execution.exit_code);

        let result = normalize(&execution);
        Ok(QueryResponse {
            result,
            code,
            exit_code: Some(execution.exit_code),
        })
    }

    async fn ping(&self) -> bool {
        self.provider.ping().await
    }
}
