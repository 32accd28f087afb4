//! Asset store collaborator.
//!
//! Captured screenshots leave the process through `AssetUploader`; the store
//! returns a durable URL that becomes the catalog record's `url`. Lossy
//! re-encoding happens at the store, never in-process.

mod cloudinary;
mod error;

pub use cloudinary::{sign_params, CloudinaryUploader};
pub use error::UploadError;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::identity::ItemIdentity;

/// Output encoding the asset store applies to an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingOptions {
    /// Stored format, e.g. "webp".
    pub format: String,
    /// Store-specific quality directive, e.g. "auto:good".
    pub quality: String,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            format: "webp".to_string(),
            quality: "auto:good".to_string(),
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    /// Durable (https) URL of the stored asset.
    pub url: String,
    /// Identifier the store assigned, usually `folder/key`.
    pub public_id: String,
}

/// A remote store that keeps captured images.
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Returns the name of this uploader implementation.
    fn name(&self) -> &str;

    /// Upload `image` under the stable `key`.
    ///
    /// Re-uploading the same key replaces the stored asset.
    async fn upload(
        &self,
        image: Vec<u8>,
        key: &ItemIdentity,
        encoding: &EncodingOptions,
    ) -> Result<UploadedAsset, UploadError>;
}
