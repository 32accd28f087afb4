use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use sha2::{Digest, Sha256};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix for environment overrides (`SNAPSHELF_CAPTURE__MAX_ITEMS_PER_RUN=10`).
pub const ENV_PREFIX: &str = "SNAPSHELF_";

/// Load configuration from an optional TOML file plus environment variables.
///
/// Precedence, lowest first: file, `CLOUDINARY_*` credentials, `SNAPSHELF_*`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: Config = figment
        .merge(
            Env::prefixed("CLOUDINARY_")
                .only(&["cloud_name", "api_key", "api_secret"])
                .map(|key| format!("asset_store.{}", key).into()),
        )
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Short SHA-256 fingerprint of the effective configuration.
pub fn config_hash(config: &Config) -> String {
    let config_json = serde_json::to_string(config).unwrap_or_default();
    let hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    hash[..16].to_string()
}
