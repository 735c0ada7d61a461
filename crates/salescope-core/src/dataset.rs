//! Loading of the fixed analysis dataset.
//!
//! The dataset is a static, trusted file bundled with the service. It is
//! read from local storage once per request and uploaded into the sandbox
//! under the well-known name the generated code is instructed to read.

use crate::core_types::Dataset;
use crate::errors::PipelineError;
use std::path::Path;

/// Name the dataset carries inside the sandbox. The system instruction
/// tells the generator to read this exact file.
pub const DATASET_NAME: &str = "sales.csv";

impl Dataset {
    pub async fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PipelineError::Dataset(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(Dataset {
            name: DATASET_NAME.to_string(),
            bytes,
        })
    }
}
