//! Remote approval of flagged files
//!
//! Sensitive documents/images and every archive need a release decision
//! from a remote authority. The client never propagates failures: anything
//! short of an explicit `approved: true` is a denial.

mod client;

pub use client::HttpApprovalClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata snapshot sent with an approval request.
///
/// Built at request time; never reused between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Operating user
    pub user: String,
    /// Host IP address
    pub ip: String,
    /// Host name
    pub hostname: String,
    /// Absolute path of the file on the removable volume
    pub path: String,
    /// UTC timestamp (RFC 3339)
    pub time: String,
}

impl FileInfo {
    /// Capture the current user and host identity for `path`.
    pub fn capture(path: &Path) -> Self {
        let hostname = whoami::fallible::hostname().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Failed to resolve hostname");
            "unknown".to_string()
        });
        let ip = local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|_| "127.0.0.1".to_string());

        Self {
            user: whoami::username(),
            ip,
            hostname,
            path: path.display().to_string(),
            time: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Outcome of an approval request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// The authority released the file
    Approved,
    /// The authority refused the file
    Denied,
    /// No usable answer (timeout, transport or protocol failure)
    DeniedByDefault { reason: String },
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Approval authority interface.
#[async_trait]
pub trait ApprovalClient: Send + Sync {
    /// Ask for a release decision. Must not hang past its configured timeout.
    async fn request_approval(&self, info: &FileInfo) -> ApprovalDecision;
}
