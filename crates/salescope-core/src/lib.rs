//! Core library for the Salescope sales-analysis service.
//!
//! Implements the generate-execute pipeline: a natural-language request is
//! translated into Python analysis code by a completion collaborator, the
//! code runs against a fixed dataset inside an isolated, ephemeral sandbox,
//! and the captured outcome is normalized into a single response shape.
//!
//! # Architecture overview
//!
//! - **Code generation**: provider-agnostic completion client plus a
//!   fence-stripping generator with a fixed system instruction
//! - **Sandbox sessions**: per-request provisioning with guaranteed
//!   teardown on every exit path
//! - **Normalization**: a pure mapping from raw exit status and captured
//!   output to canonical display text
//! - **Orchestration**: linear, fail-fast sequencing with injected
//!   collaborators and per-stage deadlines

pub mod config;
pub mod core_types;
pub mod dataset;
pub mod errors;
pub mod generator;
pub mod llm;
pub mod normalize;
pub mod pipeline;
pub mod sandbox;

pub use config::Settings;
pub use core_types::{Dataset, ExecutionResult, QueryRequest, QueryResponse};
pub use errors::PipelineError;
pub use generator::CodeGenerator;
pub use llm::{CompletionClient, OpenAiClient};
pub use normalize::normalize;
pub use pipeline::{PipelineFailure, QueryHandler, QueryPipeline};
pub use sandbox::{HttpSandboxProvider, SandboxHandle, SandboxProvider, SandboxSession};
