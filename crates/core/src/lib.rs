pub mod capture;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod identity;
pub mod merge;
pub mod metrics;
pub mod renderer;
pub mod run;
pub mod testing;
pub mod uploader;

pub use capture::{BudgetDecision, CaptureBudget, CaptureDriver, CaptureReport, CaptureSettings};
pub use catalog::{Catalog, CatalogError, CatalogPage, CatalogRecord, CatalogStore, JsonCatalogStore};
pub use config::{
    config_hash, load_config, load_config_from_str, validate_config, Config, ConfigError,
    LogFormat, SanitizedConfig,
};
pub use discovery::{discover, DiscoveredItem, Discovery, DiscoveryError};
pub use identity::{IdentityError, IdentityExtractor, ItemIdentity};
pub use merge::{merge_and_persist, merge_records, MergeError};
pub use renderer::{ChromiumRenderer, ElementHandle, PageRenderer, RenderError};
pub use run::{RunError, RunOrchestrator, RunReport, RunSettings, RunState};
pub use uploader::{AssetUploader, CloudinaryUploader, EncodingOptions, UploadError, UploadedAsset};
