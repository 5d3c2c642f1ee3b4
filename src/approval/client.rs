//! HTTP approval client

use super::{ApprovalClient, ApprovalDecision, FileInfo};
use crate::config::ApprovalConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Posts `FileInfo` as JSON to the approval endpoint and reads `approved`.
pub struct HttpApprovalClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpApprovalClient {
    pub fn new(config: &ApprovalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Approval(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    async fn send(&self, info: &FileInfo) -> Result<ApprovalDecision> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(info)
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        match body.get("approved").and_then(serde_json::Value::as_bool) {
            Some(true) => Ok(ApprovalDecision::Approved),
            Some(false) => Ok(ApprovalDecision::Denied),
            None => Err(Error::Approval(
                "Response has no boolean 'approved' field".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ApprovalClient for HttpApprovalClient {
    async fn request_approval(&self, info: &FileInfo) -> ApprovalDecision {
        match self.send(info).await {
            Ok(decision) => decision,
            Err(e) => {
                tracing::warn!(
                    path = %info.path,
                    endpoint = %self.endpoint,
                    error = %e,
                    "Approval request failed, denying by default"
                );
                ApprovalDecision::DeniedByDefault {
                    reason: e.to_string(),
                }
            }
        }
    }
}
