//! Mock asset uploader for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::identity::ItemIdentity;
use crate::uploader::{AssetUploader, EncodingOptions, UploadError, UploadedAsset};

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: ItemIdentity,
    pub image: Vec<u8>,
    pub encoding: EncodingOptions,
    /// Whether the upload succeeded.
    pub success: bool,
}

/// Mock implementation of the AssetUploader trait.
///
/// Succeeds by default with `https://assets.test/<format>/<key>` URLs. A
/// failure registered for a key applies to the next upload of that key only.
#[derive(Debug, Default)]
pub struct MockUploader {
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    key_errors: Arc<RwLock<HashMap<String, UploadError>>>,
    latency: Arc<RwLock<Option<Duration>>>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded uploads, failed ones included.
    pub async fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    /// Number of successful uploads.
    pub async fn upload_count(&self) -> usize {
        self.uploads.read().await.iter().filter(|u| u.success).count()
    }

    /// Clear recorded uploads.
    pub async fn clear_recorded_uploads(&self) {
        self.uploads.write().await.clear();
    }

    /// Fail the next upload of `key` with `error`.
    pub async fn fail_key(&self, key: &str, error: UploadError) {
        self.key_errors.write().await.insert(key.to_string(), error);
    }

    /// Simulated time each upload takes.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }
}

#[async_trait]
impl AssetUploader for MockUploader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(
        &self,
        image: Vec<u8>,
        key: &ItemIdentity,
        encoding: &EncodingOptions,
    ) -> Result<UploadedAsset, UploadError> {
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let error = self.key_errors.write().await.remove(key.as_str());
        self.uploads.write().await.push(RecordedUpload {
            key: key.clone(),
            image,
            encoding: encoding.clone(),
            success: error.is_none(),
        });

        match error {
            Some(error) => Err(error),
            None => Ok(UploadedAsset {
                url: format!("https://assets.test/{}/{}", encoding.format, key),
                public_id: key.to_string(),
            }),
        }
    }
}
