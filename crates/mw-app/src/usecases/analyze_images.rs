use std::sync::Arc;

use futures::future::join_all;
use mw_core::entry::AiAnalysis;
use mw_core::ports::{AnalysisError, ImageAnalyzerPort};
use mw_core::ImageUpload;
use tracing::{info, warn};

/// Use case for captioning a single image.
pub struct AnalyzeImage {
    analyzer: Arc<dyn ImageAnalyzerPort>,
}

impl AnalyzeImage {
    pub fn from_ports(analyzer: Arc<dyn ImageAnalyzerPort>) -> Self {
        Self { analyzer }
    }

    #[tracing::instrument(name = "usecase.analyze_image.execute", skip(self, upload), fields(file = %upload.file_name))]
    pub async fn execute(&self, upload: &ImageUpload) -> Result<AiAnalysis, AnalysisError> {
        upload
            .validate()
            .map_err(|e| AnalysisError::Failed(e.to_string()))?;
        self.analyzer.analyze(&upload.bytes).await
    }
}

/// Outcome for one image of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysisResult {
    pub file_name: String,
    pub outcome: Result<AiAnalysis, AnalysisError>,
}

/// Use case for captioning several images at once.
///
/// Images are analyzed concurrently; each gets its own result and one
/// failure does not affect the others.
pub struct AnalyzeImages {
    single: AnalyzeImage,
}

impl AnalyzeImages {
    pub fn from_ports(analyzer: Arc<dyn ImageAnalyzerPort>) -> Self {
        Self {
            single: AnalyzeImage::from_ports(analyzer),
        }
    }

    #[tracing::instrument(name = "usecase.analyze_images.execute", skip(self, uploads), fields(count = uploads.len()))]
    pub async fn execute(&self, uploads: &[ImageUpload]) -> Vec<ImageAnalysisResult> {
        let results = join_all(uploads.iter().map(|upload| async move {
            ImageAnalysisResult {
                file_name: upload.file_name.clone(),
                outcome: self.single.execute(upload).await,
            }
        }))
        .await;

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        if failed > 0 {
            warn!(failed, total = results.len(), "Some images could not be analyzed");
        } else {
            info!(total = results.len(), "Analyzed all images");
        }
        results
    }
}
