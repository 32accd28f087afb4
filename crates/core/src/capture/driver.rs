use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogRecord;
use crate::discovery::DiscoveredItem;
use crate::identity::ItemIdentity;
use crate::metrics;
use crate::renderer::{PageRenderer, RenderError};
use crate::uploader::{AssetUploader, EncodingOptions};

/// Pacing and encoding for a capture pass.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Minimum gap between the starts of two consecutive screenshots.
    pub inter_capture_delay: Duration,
    pub encoding: EncodingOptions,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            inter_capture_delay: Duration::from_millis(300),
            encoding: EncodingOptions::default(),
        }
    }
}

/// Where a single item's capture failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStage {
    Screenshot,
    Upload,
}

impl CaptureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStage::Screenshot => "screenshot",
            CaptureStage::Upload => "upload",
        }
    }
}

impl std::fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An item that produced no record this run. It stays a candidate next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    pub identity: ItemIdentity,
    pub stage: CaptureStage,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureReport {
    /// One record per successful upload, in capture order.
    pub captured: Vec<CatalogRecord>,
    pub failures: Vec<CaptureFailure>,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The browser went away mid-pass. Records already uploaded are carried
    /// so the caller can report them.
    #[error("renderer lost after {} capture(s): {source}", .captured.len())]
    RendererLost {
        captured: Vec<CatalogRecord>,
        #[source]
        source: RenderError,
    },
}

/// Screenshots and uploads eligible items one at a time.
pub struct CaptureDriver {
    renderer: Arc<dyn PageRenderer>,
    uploader: Arc<dyn AssetUploader>,
    settings: CaptureSettings,
}

impl CaptureDriver {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        uploader: Arc<dyn AssetUploader>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            renderer,
            uploader,
            settings,
        }
    }

    /// Capture `items` in order.
    ///
    /// Successive screenshots start at least `inter_capture_delay` apart. A
    /// failed screenshot or upload is recorded and the pass moves on.
    pub async fn capture_all(
        &self,
        items: Vec<DiscoveredItem>,
    ) -> Result<CaptureReport, CaptureError> {
        let total = items.len();
        let mut report = CaptureReport::default();
        let mut last_start: Option<Instant> = None;

        info!(
            total,
            renderer = self.renderer.name(),
            uploader = self.uploader.name(),
            "Starting capture pass"
        );

        for (position, item) in items.into_iter().enumerate() {
            if let Some(previous) = last_start {
                sleep_until(previous + self.settings.inter_capture_delay).await;
            }
            let started = Instant::now();
            last_start = Some(started);

            debug!(identity = %item.identity, position = position + 1, total, "Capturing item");

            let image = match self.renderer.screenshot(item.element).await {
                Ok(bytes) if bytes.is_empty() => {
                    self.record_failure(
                        &mut report,
                        item.identity,
                        CaptureStage::Screenshot,
                        "renderer returned an empty image".to_string(),
                    );
                    continue;
                }
                Ok(bytes) => bytes,
                Err(e) if e.is_fatal() => {
                    error!(identity = %item.identity, error = %e, "Renderer lost during capture");
                    metrics::CAPTURES_TOTAL
                        .with_label_values(&["aborted"])
                        .inc();
                    return Err(CaptureError::RendererLost {
                        captured: report.captured,
                        source: e,
                    });
                }
                Err(e) => {
                    self.record_failure(
                        &mut report,
                        item.identity,
                        CaptureStage::Screenshot,
                        e.to_string(),
                    );
                    continue;
                }
            };

            match self
                .uploader
                .upload(image, &item.identity, &self.settings.encoding)
                .await
            {
                Ok(asset) => {
                    let captured_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                    info!(
                        identity = %item.identity,
                        url = %asset.url,
                        position = position + 1,
                        total,
                        "Item captured"
                    );
                    metrics::CAPTURES_TOTAL
                        .with_label_values(&["success"])
                        .inc();
                    metrics::CAPTURE_DURATION.observe(started.elapsed().as_secs_f64());
                    report
                        .captured
                        .push(CatalogRecord::new(item.identity, asset.url, captured_at));
                }
                Err(e) => {
                    self.record_failure(
                        &mut report,
                        item.identity,
                        CaptureStage::Upload,
                        e.to_string(),
                    );
                }
            }
        }

        info!(
            captured = report.captured.len(),
            failed = report.failures.len(),
            "Capture pass finished"
        );
        Ok(report)
    }

    fn record_failure(
        &self,
        report: &mut CaptureReport,
        identity: ItemIdentity,
        stage: CaptureStage,
        reason: String,
    ) {
        warn!(identity = %identity, stage = %stage, reason = %reason, "Capture failed, item skipped");
        let label = match stage {
            CaptureStage::Screenshot => "screenshot_failed",
            CaptureStage::Upload => "upload_failed",
        };
        metrics::CAPTURES_TOTAL.with_label_values(&[label]).inc();
        report.failures.push(CaptureFailure {
            identity,
            stage,
            reason,
        });
    }
}
