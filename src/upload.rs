//! Upload gateway - store bytes, get back a public URL.
//!
//! Consumed by authoring flows only; the reconciliation engine never calls
//! this, it consumes `media_url` values that are assumed already resolved.
//! The HTTP implementation targets an unsigned-preset upload endpoint and
//! mirrors what the dashboard did: reject oversized or non-image payloads
//! before the network call, bound the whole call with a fixed timeout, and
//! read the public URL out of the JSON response.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::error::UploadError;

/// Metadata accompanying an upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub file_name: String,
    /// MIME type; only `image/*` is accepted
    pub content_type: String,
}

/// Accepts a binary blob plus metadata, returns a public URL
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, meta: &UploadMetadata) -> Result<String, UploadError>;
}

/// Upload gateway backed by an HTTP multipart endpoint
pub struct HttpUploadGateway {
    client: reqwest::Client,
    config: UploadConfig,
}

impl HttpUploadGateway {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl UploadGateway for HttpUploadGateway {
    async fn upload(&self, bytes: Vec<u8>, meta: &UploadMetadata) -> Result<String, UploadError> {
        if bytes.len() > self.config.max_bytes {
            return Err(UploadError::Rejected(format!(
                "payload is {} bytes, limit is {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }
        if !meta.content_type.starts_with("image/") {
            return Err(UploadError::Rejected(format!(
                "unsupported content type: {}",
                meta.content_type
            )));
        }

        debug!(
            file_name = %meta.file_name,
            size = bytes.len(),
            "uploading image"
        );

        let part = Part::bytes(bytes)
            .file_name(meta.file_name.clone())
            .mime_str(&meta.content_type)
            .map_err(|e| UploadError::Rejected(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.preset.clone());

        let send = self.client.post(&self.config.endpoint).multipart(form).send();
        let response = tokio::time::timeout(self.config.timeout, send)
            .await
            .map_err(|_| UploadError::Timeout(self.config.timeout))?
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::BadResponse(format!(
                "HTTP {} from upload endpoint",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| UploadError::BadResponse(e.to_string()))?;

        let url = body
            .get("secure_url")
            .or_else(|| body.get("url"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                UploadError::BadResponse("response has no secure_url or url field".to_string())
            })?;

        info!(file_name = %meta.file_name, url, "upload complete");
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(max_bytes: usize) -> HttpUploadGateway {
        let mut config = UploadConfig::new("https://upload.invalid/image", "preset1");
        config.max_bytes = max_bytes;
        HttpUploadGateway::new(config)
    }

    fn meta(content_type: &str) -> UploadMetadata {
        UploadMetadata {
            file_name: "corte.jpg".to_string(),
            content_type: content_type.to_string(),
        }
    }

    #[tokio::test]
    async fn test_oversized_payload_rejected_before_network() {
        let gateway = gateway(16);
        let result = gateway.upload(vec![0u8; 17], &meta("image/jpeg")).await;
        assert!(matches!(result, Err(UploadError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_non_image_rejected_before_network() {
        let gateway = gateway(1024);
        let result = gateway.upload(vec![0u8; 8], &meta("application/pdf")).await;
        assert!(matches!(result, Err(UploadError::Rejected(_))));
    }
}
