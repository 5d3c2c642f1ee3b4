//! OCR text extraction through an external executable

use super::TextExtractor;
use crate::config::OcrConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Runs `<command> <image> stdout` and returns what the OCR engine printed.
///
/// The default command is `tesseract`, whose CLI takes that shape.
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    command: String,
    enabled: bool,
    timeout: Duration,
}

impl OcrExtractor {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            enabled: config.enabled,
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl TextExtractor for OcrExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }

        // Dropping the future on timeout kills the child
        let run = Command::new(&self.command)
            .arg(path)
            .arg("stdout")
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                Error::Extraction(format!(
                    "OCR command '{}' timed out after {}s",
                    self.command,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                Error::Extraction(format!("Failed to run OCR command '{}': {}", self.command, e))
            })?;

        if !output.status.success() {
            return Err(Error::Extraction(format!(
                "OCR command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    fn name(&self) -> &str {
        "ocr"
    }
}
