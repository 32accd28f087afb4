//! Prometheus metrics for the capture pipeline.
//!
//! The runner is a one-shot process, so metrics are exported through a
//! node-exporter textfile rather than a scrape endpoint.

use std::io::Write;
use std::path::Path;

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

// =============================================================================
// Runs
// =============================================================================

/// Runs total by outcome.
pub static RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("snapshelf_runs_total", "Total capture runs"),
        &["result"], // "persisted", "discovery_failed", "catalog_failed", ...
    )
    .unwrap()
});

/// Unix time of the last persisted run.
pub static LAST_SUCCESS_TIMESTAMP: Lazy<Gauge> = Lazy::new(|| {
    Gauge::new(
        "snapshelf_last_success_timestamp_seconds",
        "Unix timestamp of the last run that persisted the catalog",
    )
    .unwrap()
});

// =============================================================================
// Discovery
// =============================================================================

pub static ITEMS_DISCOVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "snapshelf_items_discovered_total",
        "Items identified on the target page",
    )
    .unwrap()
});

pub static ITEMS_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "snapshelf_items_skipped_total",
        "Matched elements skipped for lack of a valid identity",
    )
    .unwrap()
});

// =============================================================================
// Capture
// =============================================================================

/// Capture attempts by result.
pub static CAPTURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("snapshelf_captures_total", "Total capture attempts"),
        &["result"], // "success", "screenshot_failed", "upload_failed", "aborted"
    )
    .unwrap()
});

/// Screenshot + upload duration of successful captures.
pub static CAPTURE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "snapshelf_capture_duration_seconds",
            "Duration of a successful screenshot and upload",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .unwrap()
});

// =============================================================================
// Catalog
// =============================================================================

pub static CATALOG_RECORDS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "snapshelf_catalog_records",
        "Records in the catalog after the last persisted run",
    )
    .unwrap()
});

pub static CATALOG_PAGES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "snapshelf_catalog_pages",
        "Pages in the catalog after the last persisted run",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Runs
        Box::new(RUNS_TOTAL.clone()),
        Box::new(LAST_SUCCESS_TIMESTAMP.clone()),
        // Discovery
        Box::new(ITEMS_DISCOVERED.clone()),
        Box::new(ITEMS_SKIPPED.clone()),
        // Capture
        Box::new(CAPTURES_TOTAL.clone()),
        Box::new(CAPTURE_DURATION.clone()),
        // Catalog
        Box::new(CATALOG_RECORDS.clone()),
        Box::new(CATALOG_PAGES.clone()),
    ]
}

/// Render all metrics in the Prometheus text exposition format.
pub fn render_text() -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    for collector in all_metrics() {
        registry.register(collector)?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Write all metrics to `path` for the node-exporter textfile collector.
///
/// The file is replaced atomically so the collector never reads a partial
/// exposition.
pub fn render_textfile(path: &Path) -> std::io::Result<()> {
    let text = render_text().map_err(std::io::Error::other)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = std::path::PathBuf::from(staging);

    let mut file = std::fs::File::create(&staging)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(&staging, path)
}
