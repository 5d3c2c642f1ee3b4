//! Document text extraction

use super::TextExtractor;
use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::pipeline::lowercase_extension;
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

/// Extracts text from `.txt` files and `.docx`/`.pptx` containers.
///
/// Legacy binary formats (`.doc`, `.ppt`) yield no text. At most
/// `max_bytes` are read per document; a container's parts share that budget.
#[derive(Debug, Clone)]
pub struct DocumentExtractor {
    max_bytes: u64,
}

impl DocumentExtractor {
    pub fn new() -> Self {
        Self::from_config(&ExtractConfig::default())
    }

    pub fn from_config(config: &ExtractConfig) -> Self {
        Self {
            max_bytes: config.max_text_bytes,
        }
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        let path = path.to_path_buf();
        let limit = self.max_bytes;
        tokio::task::spawn_blocking(move || extract_blocking(&path, limit))
            .await
            .map_err(|e| Error::Internal(format!("Extraction task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        "document"
    }
}

fn extract_blocking(path: &Path, limit: u64) -> Result<Option<String>> {
    match lowercase_extension(path).as_deref() {
        Some("txt") => {
            let mut bytes = Vec::new();
            std::fs::File::open(path)?
                .take(limit)
                .read_to_end(&mut bytes)?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        Some("docx") | Some("pptx") => read_xml_parts(path, limit).map(Some),
        _ => Ok(None),
    }
}

/// Concatenate the XML parts of an Office Open XML container, stopping once
/// `limit` decompressed bytes have been read.
fn read_xml_parts(path: &Path, limit: u64) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut remaining = limit;
    let mut parts = Vec::new();
    for i in 0..archive.len() {
        if remaining == 0 {
            tracing::debug!(path = %path.display(), limit, "Document text truncated");
            break;
        }
        let entry = archive.by_index(i)?;
        if !entry.name().ends_with(".xml") {
            continue;
        }
        let mut buf = Vec::new();
        let read = entry.take(remaining).read_to_end(&mut buf)?;
        remaining = remaining.saturating_sub(read as u64);
        parts.push(String::from_utf8_lossy(&buf).into_owned());
    }

    Ok(parts.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_container(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn test_plain_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.TXT");
        std::fs::write(&path, "Turkish Armed Forces briefing").unwrap();

        let text = DocumentExtractor::new().extract(&path).await.unwrap();
        assert_eq!(text.as_deref(), Some("Turkish Armed Forces briefing"));
    }

    #[tokio::test]
    async fn test_plain_text_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.txt");
        std::fs::write(&path, b"secret \xff\xfe plan").unwrap();

        let text = DocumentExtractor::new().extract(&path).await.unwrap().unwrap();
        assert!(text.starts_with("secret "));
        assert!(text.ends_with(" plan"));
    }

    #[tokio::test]
    async fn test_docx_xml_parts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.docx");
        write_container(
            &path,
            &[
                ("word/document.xml", "<w:t>confidential figures</w:t>"),
                ("word/media/image1.png", "PNG not xml"),
                ("docProps/core.xml", "<dc:title>Q3</dc:title>"),
            ],
        );

        let text = DocumentExtractor::new().extract(&path).await.unwrap().unwrap();
        assert!(text.contains("confidential figures"));
        assert!(text.contains("<dc:title>Q3</dc:title>"));
        assert!(!text.contains("PNG"));
    }

    #[tokio::test]
    async fn test_plain_text_is_capped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.txt");
        std::fs::write(&path, "a".repeat(4096)).unwrap();

        let extractor = DocumentExtractor::from_config(&ExtractConfig { max_text_bytes: 100 });
        let text = extractor.extract(&path).await.unwrap().unwrap();
        assert_eq!(text.len(), 100);
    }

    #[tokio::test]
    async fn test_container_parts_share_the_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bomb.docx");
        let big = "x".repeat(10_000);
        write_container(
            &path,
            &[
                ("word/document.xml", big.as_str()),
                ("word/footer1.xml", "secret footer"),
                ("word/header1.xml", "more"),
            ],
        );

        let extractor = DocumentExtractor::from_config(&ExtractConfig { max_text_bytes: 1000 });
        let text = extractor.extract(&path).await.unwrap().unwrap();
        assert_eq!(text.len(), 1000);
        assert!(!text.contains("secret footer"));
    }

    #[tokio::test]
    async fn test_corrupt_container_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pptx");
        std::fs::write(&path, "not a zip archive").unwrap();

        let result = DocumentExtractor::new().extract(&path).await;
        assert!(matches!(result, Err(Error::Zip(_))));
    }

    #[tokio::test]
    async fn test_legacy_formats_have_no_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.doc");
        std::fs::write(&path, "secret").unwrap();

        let text = DocumentExtractor::new().extract(&path).await.unwrap();
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = DocumentExtractor::new()
            .extract(&dir.path().join("gone.txt"))
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
