//! Text extraction from files found on removable media
//!
//! Two extractors feed the pipeline:
//! - [`DocumentExtractor`]: plain text and Office Open XML containers
//! - [`OcrExtractor`]: images, through an external OCR executable
//!
//! `Ok(None)` means the format carries no extractable text; `Err` means the
//! extraction itself failed. The pipeline treats both as "not sensitive".

mod document;
mod ocr;

pub use document::DocumentExtractor;
pub use ocr::OcrExtractor;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Pluggable text extraction interface.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the text content of `path`.
    async fn extract(&self, path: &Path) -> Result<Option<String>>;

    /// Human-readable name (used in logs).
    fn name(&self) -> &str;
}
