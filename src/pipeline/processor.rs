//! Per-file classification and disposition

use super::{Category, Disposition, FileDisposer, FileEvent};
use crate::approval::{ApprovalClient, FileInfo, HttpApprovalClient};
use crate::classifier::{ContentClassifier, KeywordClassifier};
use crate::config::AgentConfig;
use crate::error::Result;
use crate::extract::{DocumentExtractor, OcrExtractor, TextExtractor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result of running one file through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub path: PathBuf,
    pub category: Category,
    pub disposition: Disposition,
    /// Set when the disposition could not be carried out
    pub error: Option<String>,
}

impl ProcessReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Orchestrates extraction, classification, approval, and disposal.
///
/// Shared by every volume watcher; all state is immutable after construction.
pub struct FilePipeline {
    documents: Arc<dyn TextExtractor>,
    images: Arc<dyn TextExtractor>,
    classifier: Arc<dyn ContentClassifier>,
    approval: Arc<dyn ApprovalClient>,
    disposer: FileDisposer,
}

impl FilePipeline {
    pub fn new(
        documents: Arc<dyn TextExtractor>,
        images: Arc<dyn TextExtractor>,
        classifier: Arc<dyn ContentClassifier>,
        approval: Arc<dyn ApprovalClient>,
        disposer: FileDisposer,
    ) -> Self {
        Self {
            documents,
            images,
            classifier,
            approval,
            disposer,
        }
    }

    /// Build the production pipeline from configuration.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(DocumentExtractor::from_config(&config.extract)),
            Arc::new(OcrExtractor::new(&config.ocr)),
            Arc::new(KeywordClassifier::from_config(&config.classifier)?),
            Arc::new(HttpApprovalClient::new(&config.approval)?),
            FileDisposer::new(&config.zones),
        ))
    }

    /// Process a single file event to exactly one terminal disposition.
    pub async fn process(&self, event: &FileEvent) -> ProcessReport {
        let path = event.path.as_path();
        let category = Category::from_path(path);

        if self.disposer.is_zone_path(path) {
            tracing::debug!(path = %path.display(), "Ignoring file inside a destination zone");
            return report(path, category, Disposition::NoAction, None);
        }

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::warn!(
                path = %path.display(),
                volume = %event.volume,
                "File vanished before processing"
            );
            return report(
                path,
                category,
                Disposition::NoAction,
                Some("file not found".to_string()),
            );
        }

        let disposition = self.decide(path, category).await;

        match self.disposer.apply(path, disposition).await {
            Ok(()) => {
                log_outcome(path, category, disposition);
                report(path, category, disposition, None)
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    disposition = %disposition,
                    error = %e,
                    "Failed to dispose file"
                );
                report(path, category, disposition, Some(e.to_string()))
            }
        }
    }

    async fn decide(&self, path: &Path, category: Category) -> Disposition {
        match category {
            Category::Document => self.screen(path, self.documents.as_ref()).await,
            Category::Image => self.screen(path, self.images.as_ref()).await,
            Category::Archive => {
                if self.approve(path).await {
                    Disposition::CopyToSafe
                } else {
                    Disposition::Delete
                }
            }
            Category::Other => Disposition::CopyToSafe,
        }
    }

    /// Extract and classify; only sensitive content goes to approval.
    async fn screen(&self, path: &Path, extractor: &dyn TextExtractor) -> Disposition {
        let text = match extractor.extract(path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    extractor = extractor.name(),
                    error = %e,
                    "Text extraction failed, treating as not sensitive"
                );
                None
            }
        };

        let sensitive = text
            .as_deref()
            .map(|t| self.classifier.is_sensitive(t))
            .unwrap_or(false);
        if !sensitive {
            return Disposition::CopyToSafe;
        }

        if self.approve(path).await {
            Disposition::CopyToAlert
        } else {
            Disposition::Delete
        }
    }

    async fn approve(&self, path: &Path) -> bool {
        let info = FileInfo::capture(path);
        let decision = self.approval.request_approval(&info).await;
        tracing::debug!(path = %path.display(), decision = ?decision, "Approval decision");
        decision.is_approved()
    }
}

fn report(
    path: &Path,
    category: Category,
    disposition: Disposition,
    error: Option<String>,
) -> ProcessReport {
    ProcessReport {
        path: path.to_path_buf(),
        category,
        disposition,
        error,
    }
}

fn log_outcome(path: &Path, category: Category, disposition: Disposition) {
    let path = path.display();
    match (disposition, category) {
        (Disposition::Delete, Category::Archive) => {
            tracing::info!("Removed archive {} without approval", path)
        }
        (Disposition::Delete, Category::Image) => {
            tracing::info!("Removed sensitive image {}", path)
        }
        (Disposition::Delete, _) => tracing::info!("Removed sensitive file {}", path),
        (Disposition::CopyToAlert, _) => {
            tracing::info!("Released sensitive file {} to alert zone", path)
        }
        (Disposition::CopyToSafe, _) => tracing::info!("File {} processed", path),
        (Disposition::NoAction, _) => {}
    }
}
