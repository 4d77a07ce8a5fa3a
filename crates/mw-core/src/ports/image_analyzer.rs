use async_trait::async_trait;
use thiserror::Error;

use crate::entry::AiAnalysis;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Any failure of the captioning service; no partial results.
    #[error("analysis failed: {0}")]
    Failed(String),
}

/// External captioning service.
#[async_trait]
pub trait ImageAnalyzerPort: Send + Sync {
    async fn analyze(&self, image: &[u8]) -> Result<AiAnalysis, AnalysisError>;
}
