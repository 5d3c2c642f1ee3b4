//! DriveWarden error types

use thiserror::Error;

/// DriveWarden error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Volume enumeration error
    #[error("Device error: {0}")]
    Device(String),

    /// Filesystem watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Text extraction error
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Approval service error
    #[error("Approval error: {0}")]
    Approval(String),

    /// Copy or delete failure
    #[error("Disposal error: {0}")]
    Disposal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Zip container error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Filesystem notification error
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for DriveWarden operations
pub type Result<T> = std::result::Result<T, Error>;
