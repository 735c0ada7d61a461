//! Sandbox provisioning and session lifecycle.
//!
//! The sandbox service is an external collaborator that hands out isolated,
//! ephemeral execution environments. This module defines the trait seams the
//! pipeline depends on, an HTTP client speaking the service's REST surface,
//! and [`SandboxSession`], which owns the provision → seed → execute →
//! destroy sequence with the invariant that every provisioned environment is
//! destroyed before the request completes, on every exit path.

use crate::core_types::{Dataset, ExecutionResult};
use crate::errors::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Provisions isolated execution environments.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Request a new environment configured for the given runtime.
    async fn create(&self, language: &str) -> Result<Box<dyn SandboxHandle>, PipelineError>;

    /// Reachability probe against the service base endpoint.
    async fn ping(&self) -> bool;
}

/// One live isolated environment. Capabilities match the collaborator
/// surface: receive a named file, run a program, be destroyed.
#[async_trait]
pub trait SandboxHandle: Send + Sync {
    async fn upload_file(&self, bytes: &[u8], name: &str) -> Result<(), PipelineError>;

    /// Submit source text for execution. Fails only for infrastructure
    /// problems; a non-zero program exit comes back as a normal
    /// [`ExecutionResult`].
    async fn run_code(&self, code: &str) -> Result<ExecutionResult, PipelineError>;

    async fn delete(&self) -> Result<(), PipelineError>;
}

/// HTTP client for the sandbox provisioning service.
#[derive(Debug, Clone)]
pub struct HttpSandboxProvider {
    client: Client,
    api_key: String,
    base_url: String,
    stage_timeout: Duration,
}

impl HttpSandboxProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            stage_timeout: Duration::from_secs(120),
        }
    }

    /// Deadline applied to each individual call against the service.
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl SandboxProvider for HttpSandboxProvider {
    async fn create(&self, language: &str) -> Result<Box<dyn SandboxHandle>, PipelineError> {
        let url = format!("{}/sandboxes", self.base_url);
        let call = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "language": language }))
            .send();

        let response = tokio::time::timeout(self.stage_timeout, call)
            .await
            .map_err(|_| PipelineError::Timeout("sandbox provisioning".to_string()))?
            .map_err(|e| PipelineError::Provision(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Provision(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PipelineError::Provision(format!(
                "Create request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| PipelineError::Provision(format!("Invalid JSON response: {}", e)))?;
        let id = parsed["id"]
            .as_str()
            .ok_or_else(|| PipelineError::Provision("Response has no sandbox id".to_string()))?
            .to_string();

        log::info!("Provisioned sandbox {}", id);

        Ok(Box::new(HttpSandboxHandle {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            id,
            stage_timeout: self.stage_timeout,
        }))
    }

    async fn ping(&self) -> bool {
        match self.client.get(&self.base_url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::warn!("Sandbox service ping failed: {}", e);
                false
            }
        }
    }
}

/// Handle to one provisioned environment on the sandbox service.
struct HttpSandboxHandle {
    client: Client,
    api_key: String,
    base_url: String,
    id: String,
    stage_timeout: Duration,
}

impl HttpSandboxHandle {
    fn auth_header(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl SandboxHandle for HttpSandboxHandle {
    async fn upload_file(&self, bytes: &[u8], name: &str) -> Result<(), PipelineError> {
        let url = format!("{}/sandboxes/{}/files/{}", self.base_url, self.id, name);
        let call = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
            .send();

        let response = tokio::time::timeout(self.stage_timeout, call)
            .await
            .map_err(|_| PipelineError::Timeout("dataset upload".to_string()))?
            .map_err(|e| PipelineError::Seed(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Seed(format!(
                "Upload failed with status {}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn run_code(&self, code: &str) -> Result<ExecutionResult, PipelineError> {
        let url = format!("{}/sandboxes/{}/run", self.base_url, self.id);
        let call = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&json!({ "code": code }))
            .send();

        let response = tokio::time::timeout(self.stage_timeout, call)
            .await
            .map_err(|_| PipelineError::Timeout("sandbox execution".to_string()))?
            .map_err(|e| PipelineError::Execution(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Execution(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(PipelineError::Execution(format!(
                "Run request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| PipelineError::Execution(format!("Invalid JSON response: {}", e)))?;

        let exit_code = parsed["exitCode"].as_i64().ok_or_else(|| {
            PipelineError::Execution("Response has no exit code".to_string())
        })?;
        let output = parsed["result"].as_str().unwrap_or_default().to_string();

        Ok(ExecutionResult { exit_code, output })
    }

    async fn delete(&self) -> Result<(), PipelineError> {
        let url = format!("{}/sandboxes/{}", self.base_url, self.id);
        let call = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .send();

        let response = tokio::time::timeout(self.stage_timeout, call)
            .await
            .map_err(|_| PipelineError::Timeout("sandbox teardown".to_string()))?
            .map_err(|e| PipelineError::Execution(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Execution(format!(
                "Delete request failed with status {}",
                response.status()
            )));
        }

        log::info!("Destroyed sandbox {}", self.id);
        Ok(())
    }
}

/// One-shot session: provision an environment, seed the dataset, run the
/// program, and destroy the environment on every exit path.
pub struct SandboxSession;

impl SandboxSession {
    /// Runtime requested from the provisioning service; matches the
    /// dataset's processing language.
    pub const LANGUAGE: &'static str = "python";

    /// Run `code` against `dataset` in a fresh environment.
    ///
    /// Exactly one environment is provisioned and exactly one destroy is
    /// attempted, even when seeding or execution fails partway. A destroy
    /// failure is logged but never overrides a result already computed.
    pub async fn run(
        provider: &dyn SandboxProvider,
        dataset: &Dataset,
        code: &str,
    ) -> Result<ExecutionResult, PipelineError> {
        let handle = provider.create(Self::LANGUAGE).await?;

        let result = Self::seed_and_execute(handle.as_ref(), dataset, code).await;

        if let Err(e) = handle.delete().await {
            log::warn!("Sandbox teardown failed: {}", e);
        }

        result
    }

    async fn seed_and_execute(
        handle: &dyn SandboxHandle,
        dataset: &Dataset,
        code: &str,
    ) -> Result<ExecutionResult, PipelineError> {
        handle.upload_file(&dataset.bytes, &dataset.name).await?;
        handle.run_code(code).await
    }
}
