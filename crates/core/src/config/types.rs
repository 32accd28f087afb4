use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub target: TargetConfig,
    pub asset_store: AssetStoreConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// The page being watched and how its items are recognised.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Page to scrape (e.g., "http://example.com/sales.html").
    pub page_url: String,
    /// CSS selector matching every list item on the page.
    #[serde(default = "default_item_selector")]
    pub item_selector: String,
    /// Element attribute holding the item identity.
    #[serde(default = "default_identity_attribute")]
    pub identity_attribute: String,
    /// Naming convention the identity must follow. The default only takes
    /// numbered ids, so containers such as `items` or `itemList` never match.
    #[serde(default = "default_identity_pattern")]
    pub identity_pattern: String,
}

fn default_item_selector() -> String {
    r#"[id^="item"]"#.to_string()
}

fn default_identity_attribute() -> String {
    "id".to_string()
}

fn default_identity_pattern() -> String {
    r"^item\d+$".to_string()
}

/// Per-run capture limits and output encoding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    /// Hard cap on new items captured in one run.
    #[serde(default = "default_max_items_per_run")]
    pub max_items_per_run: usize,
    /// Minimum spacing between the starts of two screenshots (milliseconds).
    #[serde(default = "default_inter_capture_delay")]
    pub inter_capture_delay_ms: u64,
    /// Format the asset store converts uploads into.
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Quality setting applied by the asset store.
    #[serde(default = "default_output_quality")]
    pub output_quality: String,
}

impl CaptureConfig {
    pub fn inter_capture_delay(&self) -> Duration {
        Duration::from_millis(self.inter_capture_delay_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_items_per_run: default_max_items_per_run(),
            inter_capture_delay_ms: default_inter_capture_delay(),
            output_format: default_output_format(),
            output_quality: default_output_quality(),
        }
    }
}

fn default_max_items_per_run() -> usize {
    60
}

fn default_inter_capture_delay() -> u64 {
    300
}

fn default_output_format() -> String {
    "webp".to_string()
}

fn default_output_quality() -> String {
    "auto:good".to_string()
}

/// Catalog file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Records per page in the persisted document.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            page_size: default_page_size(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/gallery.json")
}

fn default_page_size() -> usize {
    60
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RendererConfig {
    /// Explicit Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_executable: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,
    /// How long to wait for the first matching item to appear.
    #[serde(default = "default_wait_for_items")]
    pub wait_for_items_ms: u64,
    /// Extra settle time after items appear (lazy-loaded images).
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            headless: true,
            navigation_timeout_ms: default_navigation_timeout(),
            wait_for_items_ms: default_wait_for_items(),
            settle_ms: default_settle(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_wait_for_items() -> u64 {
    30_000
}

fn default_settle() -> u64 {
    2_000
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    2000
}

/// Cloudinary asset store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetStoreConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Folder uploads are placed in.
    #[serde(default = "default_folder")]
    pub folder: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u32,
}

fn default_folder() -> String {
    "website-screenshots".to_string()
}

fn default_api_base_url() -> String {
    "https://api.cloudinary.com/v1_1".to_string()
}

fn default_upload_timeout() -> u32 {
    60
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write Prometheus text exposition here after each run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile: Option<PathBuf>,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub target: TargetConfig,
    pub capture: CaptureConfig,
    pub catalog: CatalogConfig,
    pub renderer: RendererConfig,
    pub asset_store: SanitizedAssetStoreConfig,
}

/// Sanitized asset store config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAssetStoreConfig {
    pub cloud_name: String,
    pub folder: String,
    pub api_base_url: String,
    pub api_key_configured: bool,
    pub api_secret_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            target: config.target.clone(),
            capture: config.capture.clone(),
            catalog: config.catalog.clone(),
            renderer: config.renderer.clone(),
            asset_store: SanitizedAssetStoreConfig {
                cloud_name: config.asset_store.cloud_name.clone(),
                folder: config.asset_store.folder.clone(),
                api_base_url: config.asset_store.api_base_url.clone(),
                api_key_configured: !config.asset_store.api_key.is_empty(),
                api_secret_configured: !config.asset_store.api_secret.is_empty(),
                timeout_secs: config.asset_store.timeout_secs,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[target]
page_url = "http://example.com/sales.html"

[asset_store]
cloud_name = "demo"
api_key = "key"
api_secret = "secret"
"#;

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.target.page_url, "http://example.com/sales.html");
        assert_eq!(config.target.identity_attribute, "id");
        assert_eq!(config.capture.max_items_per_run, 60);
        assert_eq!(config.capture.inter_capture_delay_ms, 300);
        assert_eq!(config.catalog.page_size, 60);
        assert_eq!(config.catalog.path.to_str().unwrap(), "data/gallery.json");
        assert_eq!(config.asset_store.folder, "website-screenshots");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.textfile.is_none());
        assert!(config.renderer.headless);
    }

    #[test]
    fn test_deserialize_missing_target_fails() {
        let toml = r#"
[asset_store]
cloud_name = "demo"
api_key = "key"
api_secret = "secret"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_overrides() {
        let toml = format!(
            "{}\n[capture]\nmax_items_per_run = 10\ninter_capture_delay_ms = 1000\n\n[catalog]\npage_size = 25\n\n[logging]\nformat = \"json\"\n",
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.capture.max_items_per_run, 10);
        assert_eq!(config.capture.inter_capture_delay(), Duration::from_secs(1));
        assert_eq!(config.catalog.page_size, 25);
        assert_eq!(config.logging.format, LogFormat::Json);
        // untouched fields keep their defaults
        assert_eq!(config.capture.output_format, "webp");
    }

    #[test]
    fn test_sanitized_config_hides_credentials() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.asset_store.api_key_configured);
        assert!(sanitized.asset_store.api_secret_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret\""));
        assert!(json.contains("\"cloud_name\":\"demo\""));
    }
}
