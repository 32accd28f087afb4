//! Cloudinary upload API implementation.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

use crate::config::AssetStoreConfig;
use crate::identity::ItemIdentity;

use super::{AssetUploader, EncodingOptions, UploadError, UploadedAsset};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Signs upload parameters the way Cloudinary expects.
///
/// Parameters are sorted by name, joined as `k=v&k=v`, suffixed with the API
/// secret and hashed with SHA-256.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!("{:x}", Sha256::digest(format!("{}{}", to_sign, api_secret)))
}

/// Uploads captured screenshots to a Cloudinary cloud with signed requests.
pub struct CloudinaryUploader {
    client: Client,
    config: AssetStoreConfig,
}

impl CloudinaryUploader {
    /// Create a new CloudinaryUploader with the given configuration.
    pub fn new(config: AssetStoreConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;
        Ok(Self { client, config })
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Parameters covered by the signature.
    fn signed_params(
        &self,
        key: &ItemIdentity,
        encoding: &EncodingOptions,
        timestamp: i64,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("public_id", key.to_string()),
            ("overwrite", "true".to_string()),
            ("timestamp", timestamp.to_string()),
        ];
        if !self.config.folder.is_empty() {
            params.push(("folder", self.config.folder.clone()));
        }
        if !encoding.format.is_empty() {
            params.push(("format", encoding.format.clone()));
        }
        if !encoding.quality.is_empty() {
            params.push(("transformation", format!("q_{}", encoding.quality)));
        }
        params
    }
}

#[async_trait]
impl AssetUploader for CloudinaryUploader {
    fn name(&self) -> &str {
        "cloudinary"
    }

    async fn upload(
        &self,
        image: Vec<u8>,
        key: &ItemIdentity,
        encoding: &EncodingOptions,
    ) -> Result<UploadedAsset, UploadError> {
        let params = self.signed_params(key, encoding, chrono::Utc::now().timestamp());
        let signature = sign_params(&params, &self.config.api_secret);

        let file_part = multipart::Part::bytes(image)
            .file_name(format!("{}.png", key))
            .mime_str("image/png")?;

        let mut form = multipart::Form::new()
            .part("file", file_part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        debug!(key = %key, "Uploading to Cloudinary");

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        Ok(UploadedAsset {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> AssetStoreConfig {
        AssetStoreConfig {
            cloud_name: "demo".to_string(),
            api_key: "123456".to_string(),
            api_secret: "s3cr3t".to_string(),
            folder: "website-screenshots".to_string(),
            api_base_url: base.to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_signature_matches_known_vector() {
        let uploader = CloudinaryUploader::new(config("http://unused")).unwrap();
        let params = uploader.signed_params(
            &ItemIdentity::new("item42"),
            &EncodingOptions::default(),
            1_700_000_000,
        );
        assert_eq!(
            sign_params(&params, "s3cr3t"),
            "3ad617adb80ef0a4c3a429b496c7f7eed5092606a2c27eee610c6b2e8653c97e"
        );
    }

    #[test]
    fn test_signature_ignores_param_order() {
        let a = vec![("b", "2".to_string()), ("a", "1".to_string())];
        let b = vec![("a", "1".to_string()), ("b", "2".to_string())];
        assert_eq!(sign_params(&a, "x"), sign_params(&b, "x"));
    }

    #[test]
    fn test_upload_url() {
        let uploader = CloudinaryUploader::new(config("https://api.example/v1_1/")).unwrap();
        assert_eq!(
            uploader.upload_url(),
            "https://api.example/v1_1/demo/image/upload"
        );
    }

    #[tokio::test]
    async fn test_upload_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "public_id": "website-screenshots/item42",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/website-screenshots/item42.webp",
                "format": "webp"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uploader = CloudinaryUploader::new(config(&server.uri())).unwrap();
        let asset = uploader
            .upload(
                b"\x89PNG fake".to_vec(),
                &ItemIdentity::new("item42"),
                &EncodingOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(asset.public_id, "website-screenshots/item42");
        assert!(asset.url.ends_with("item42.webp"));

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(body.contains("name=\"public_id\""));
        assert!(body.contains("item42"));
        assert!(body.contains("name=\"signature_algorithm\""));
        assert!(body.contains("q_auto:good"));
        assert!(body.contains("filename=\"item42.png\""));
    }

    #[tokio::test]
    async fn test_upload_rejected_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid Signature" }
            })))
            .mount(&server)
            .await;

        let uploader = CloudinaryUploader::new(config(&server.uri())).unwrap();
        let err = uploader
            .upload(vec![1, 2, 3], &ItemIdentity::new("item1"), &EncodingOptions::default())
            .await
            .unwrap_err();

        match err {
            UploadError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let uploader = CloudinaryUploader::new(config(&server.uri())).unwrap();
        let err = uploader
            .upload(vec![1], &ItemIdentity::new("item1"), &EncodingOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }
}
