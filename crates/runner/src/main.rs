use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapshelf_core::{
    config_hash, load_config, metrics, validate_config, AssetUploader, CatalogStore,
    ChromiumRenderer, CloudinaryUploader, JsonCatalogStore, LogFormat, PageRenderer,
    RunOrchestrator, RunSettings, SanitizedConfig,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file picked up from the working directory when no path is given.
const DEFAULT_CONFIG_FILE: &str = "snapshelf.toml";

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// One capture run. Returns the process exit code.
async fn run() -> Result<i32> {
    let config_path = resolve_config_path(
        std::env::var("SNAPSHELF_CONFIG").ok(),
        Path::new(DEFAULT_CONFIG_FILE).exists(),
    );

    // Logging format lives in the config, so load it before anything can log.
    let loaded = load_config(config_path.as_deref());
    init_logging(
        loaded
            .as_ref()
            .map(|c| c.logging.format)
            .unwrap_or_default(),
    );

    info!(version = VERSION, config = ?config_path, "Starting snapshelf");
    let config = loaded.with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load config from environment".to_string(),
    })?;

    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        config_hash = %config_hash(&config),
        config = %serde_json::to_string(&sanitized).unwrap_or_default(),
        "Configuration loaded"
    );

    let settings = RunSettings::from_config(&config).context("Invalid run settings")?;

    let uploader: Arc<dyn AssetUploader> = Arc::new(
        CloudinaryUploader::new(config.asset_store.clone())
            .context("Failed to create asset uploader")?,
    );
    let store: Arc<dyn CatalogStore> = Arc::new(JsonCatalogStore::new(config.catalog.path.clone()));

    info!("Launching headless browser");
    let renderer: Arc<dyn PageRenderer> = Arc::new(
        ChromiumRenderer::launch(config.renderer.clone())
            .await
            .context("Failed to launch browser")?,
    );

    let orchestrator = RunOrchestrator::new(settings, renderer, uploader, store);
    let code = match orchestrator.run_once().await {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                captured = report.captured.len(),
                failed = report.failures.len(),
                total_records = report.total_records,
                "Done"
            );
            0
        }
        Err(e) => e.exit_code(),
    };

    if let Some(path) = &config.metrics.textfile {
        match metrics::render_textfile(path) {
            Ok(()) => info!(path = %path.display(), "Metrics written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write metrics"),
        }
    }

    Ok(code)
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,chromiumoxide=warn".into());

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .init();
}

/// Explicit path from the environment wins; otherwise use the default file
/// when present and fall back to environment-only configuration.
fn resolve_config_path(from_env: Option<String>, default_exists: bool) -> Option<PathBuf> {
    match from_env.filter(|p| !p.trim().is_empty()) {
        Some(path) => Some(PathBuf::from(path)),
        None if default_exists => Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
        None => None,
    }
}
