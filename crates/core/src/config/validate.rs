use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Target page is an http(s) URL
/// - Identity pattern compiles
/// - Catalog page size is not 0
/// - Asset store credentials are present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.target.page_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "target.page_url must be an http(s) URL, got {:?}",
            config.target.page_url
        )));
    }

    if config.target.item_selector.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "target.item_selector cannot be empty".to_string(),
        ));
    }

    if let Err(e) = regex_lite::Regex::new(&config.target.identity_pattern) {
        return Err(ConfigError::ValidationError(format!(
            "target.identity_pattern is not a valid regex: {}",
            e
        )));
    }

    if config.catalog.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.page_size cannot be 0".to_string(),
        ));
    }

    let store = &config.asset_store;
    for (name, value) in [
        ("cloud_name", &store.cloud_name),
        ("api_key", &store.api_key),
        ("api_secret", &store.api_secret),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "asset_store.{} cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[target]
page_url = "https://example.com/sales.html"

[asset_store]
cloud_name = "demo"
api_key = "key"
api_secret = "secret"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_page_size_zero_fails() {
        let mut config = valid_config();
        config.catalog.page_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = valid_config();
        config.target.page_url = "file:///etc/passwd".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = valid_config();
        config.target.identity_pattern = "item(".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_secret() {
        let mut config = valid_config();
        config.asset_store.api_secret = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("api_secret"));
    }

    #[test]
    fn test_zero_budget_is_allowed() {
        let mut config = valid_config();
        config.capture.max_items_per_run = 0;
        assert!(validate_config(&config).is_ok());
    }
}
