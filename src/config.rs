//! DriveWarden configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main DriveWarden configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Destination zones for released files
    #[serde(default)]
    pub zones: ZonesConfig,

    /// Remote approval service
    #[serde(default)]
    pub approval: ApprovalConfig,

    /// Device polling and watcher settings
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Sensitive content keywords
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// OCR settings for image files
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Document text extraction limits
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Log file settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.approval.endpoint.trim().is_empty() {
            return Err(Error::Config("approval.endpoint must not be empty".to_string()));
        }
        if self.approval.timeout_secs == 0 {
            return Err(Error::Config("approval.timeout_secs must be positive".to_string()));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(Error::Config(
                "monitor.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.monitor.event_queue_capacity == 0 {
            return Err(Error::Config(
                "monitor.event_queue_capacity must be positive".to_string(),
            ));
        }
        if self.ocr.timeout_secs == 0 {
            return Err(Error::Config("ocr.timeout_secs must be positive".to_string()));
        }
        if self.extract.max_text_bytes == 0 {
            return Err(Error::Config(
                "extract.max_text_bytes must be positive".to_string(),
            ));
        }
        if self.zones.safe_dir == self.zones.alert_dir {
            return Err(Error::Config(
                "zones.safe_dir and zones.alert_dir must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// What happens to the file on the removable medium once it has been copied out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourcePolicy {
    /// Leave the original in place (audit-only copy)
    #[default]
    Retain,

    /// Delete the original after a successful copy
    RemoveAfterCopy,
}

/// Destination zone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Files cleared for release
    pub safe_dir: PathBuf,

    /// Sensitive files released with approval
    pub alert_dir: PathBuf,

    /// Source handling after a copy
    pub source_policy: SourcePolicy,
}

impl Default for ZonesConfig {
    fn default() -> Self {
        let base = dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("drivewarden");

        Self {
            safe_dir: base.join("safe"),
            alert_dir: base.join("alert"),
            source_policy: SourcePolicy::default(),
        }
    }
}

/// Approval service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Endpoint receiving approval requests
    pub endpoint: String,

    /// Round-trip timeout in seconds; expiry counts as a denial
    pub timeout_secs: u64,
}

impl ApprovalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/approve".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between removable-volume enumerations
    pub poll_interval_secs: u64,

    /// Pending file events buffered per volume
    pub event_queue_capacity: usize,

    /// Quiet period before a freshly written file is processed (0 disables)
    pub settle_millis: u64,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            event_queue_capacity: 256,
            settle_millis: 250,
        }
    }
}

/// Keyword classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Case-insensitive keywords marking content as sensitive
    pub keywords: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "turkish armed forces".to_string(),
                "secret".to_string(),
                "confidential".to_string(),
            ],
        }
    }
}

/// OCR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR on images at all
    pub enabled: bool,

    /// OCR executable, invoked as `<command> <image> stdout`
    pub command: String,

    /// Seconds before a running OCR process is killed
    pub timeout_secs: u64,
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "tesseract".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Document extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Upper bound on bytes read from one document, across all container parts
    pub max_text_bytes: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_text_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Log file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory holding the log file
    pub dir: PathBuf,

    /// Log file name
    pub file: String,

    /// Default filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file: "usb.log".to_string(),
            level: "info".to_string(),
        }
    }
}
