//! HTTP endpoint collaborator.
//!
//! The remote service is opaque: one POST with a JSON body, one JSON reply.
//! The trait seam lets driver tests script outcomes without a network.

use crate::error::UploadError;
use crate::model::{UploadRequest, UploadResponse};
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Where encoded artifacts are submitted. Implementations map transport
/// failures, non-2xx statuses, and malformed bodies to `UploadError::Network`.
#[async_trait]
pub trait UploadEndpoint: Send + Sync {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError>;
}

/// Production endpoint backed by `reqwest`.
pub struct HttpEndpoint {
    http: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    pub fn new(url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("pyq-uploader/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl UploadEndpoint for HttpEndpoint {
    async fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, UploadError> {
        debug!(file_name = %request.file_name, url = %self.url, "submitting upload");
        let resp = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| UploadError::Network(format!("transport error: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UploadError::Network(format!("server returned {status}")));
        }

        resp.json::<UploadResponse>()
            .await
            .map_err(|e| UploadError::Network(format!("malformed response: {e}")))
    }
}
