//! Run settings, derived once from the loaded configuration.

use crate::capture::CaptureSettings;
use crate::config::{Config, ConfigError};
use crate::identity::IdentityExtractor;
use crate::uploader::EncodingOptions;

/// Everything one run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub page_url: String,
    pub item_selector: String,
    pub extractor: IdentityExtractor,
    pub max_items_per_run: usize,
    pub page_size: usize,
    pub capture: CaptureSettings,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let extractor = IdentityExtractor::new(
            config.target.identity_attribute.clone(),
            &config.target.identity_pattern,
        )
        .map_err(|e| ConfigError::ValidationError(format!("target.identity_pattern: {}", e)))?;

        Ok(Self {
            page_url: config.target.page_url.clone(),
            item_selector: config.target.item_selector.clone(),
            extractor,
            max_items_per_run: config.capture.max_items_per_run,
            page_size: config.catalog.page_size,
            capture: CaptureSettings {
                inter_capture_delay: config.capture.inter_capture_delay(),
                encoding: EncodingOptions {
                    format: config.capture.output_format.clone(),
                    quality: config.capture.output_quality.clone(),
                },
            },
        })
    }
}
