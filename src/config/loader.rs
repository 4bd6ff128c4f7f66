//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (CLASSGATE__*, then SUPABASE_URL and SUPABASE_ANON_KEY)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "classgate.toml",
    ".classgate.toml",
    "~/.config/classgate/config.toml",
    "/etc/classgate/config.toml",
];

/// Upper bound on `backend.max_retries`
const MAX_RETRIES: u32 = 10;

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    // Skip anon key validation for testing
    validate_config_relaxed(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with CLASSGATE__ prefix
    // e.g., CLASSGATE__BACKEND__URL, CLASSGATE__FRESHNESS__FETCH_TIMEOUT_SECS
    builder = builder.add_source(
        Environment::with_prefix("CLASSGATE")
            .separator("__")
            .try_parsing(true),
    );

    // 4. Conventional project variables, unless the prefixed form is set
    if let Ok(url) = std::env::var("SUPABASE_URL")
        && !url.is_empty()
        && std::env::var_os("CLASSGATE__BACKEND__URL").is_none()
    {
        builder = builder
            .set_override("backend.url", url)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    if let Ok(key) = std::env::var("SUPABASE_ANON_KEY")
        && !key.is_empty()
        && std::env::var_os("CLASSGATE__BACKEND__ANON_KEY").is_none()
    {
        builder = builder
            .set_override("backend.anon_key", key)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    // Build and deserialize
    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values (relaxed - for testing without an anon key)
fn validate_config_relaxed(config: &AppConfig) -> Result<(), ConfigError> {
    if config.backend.url.is_empty() {
        return Err(ConfigError::Missing {
            field: "backend.url".to_string(),
        });
    }

    if !config.backend.url.starts_with("http://") && !config.backend.url.starts_with("https://")
    {
        return Err(ConfigError::Invalid {
            message: format!(
                "backend.url must start with http:// or https://, got: {}",
                config.backend.url
            ),
        });
    }

    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "backend.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.backend.max_retries > MAX_RETRIES {
        return Err(ConfigError::Invalid {
            message: format!(
                "backend.max_retries must be at most {}, got: {}",
                MAX_RETRIES, config.backend.max_retries
            ),
        });
    }

    if config.freshness.fetch_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "freshness.fetch_timeout_secs must be greater than 0".to_string(),
        });
    }

    for (field, path) in config.routes.all() {
        if !path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!("{} must start with '/', got: {}", field, path),
            });
        }
    }

    Ok(())
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_config_relaxed(config)?;

    // The anon key is what lets any request through the gateway
    match config.backend.anon_key.as_deref() {
        Some(key) if !key.is_empty() => Ok(()),
        _ => Err(ConfigError::Missing {
            field: "backend.anon_key (set SUPABASE_ANON_KEY environment variable)".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FailurePolicy;

    #[test]
    fn test_load_config_from_str_basic() {
        let toml = r#"
[backend]
url = "https://school.supabase.co"
anon_key = "anon"
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.backend.url, "https://school.supabase.co");
        assert_eq!(config.backend.anon_key, Some("anon".to_string()));
        assert_eq!(config.routes.pending, "/pending");
    }

    #[test]
    fn test_load_freshness_section() {
        let toml = r#"
[backend]
url = "https://school.supabase.co"

[freshness]
fetch_timeout_secs = 3
on_fetch_failure = "keep_cached"
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.freshness.fetch_timeout_secs, 3);
        assert_eq!(config.freshness.on_fetch_failure, FailurePolicy::KeepCached);
    }

    #[test]
    fn test_invalid_url_error() {
        let toml = r#"
[backend]
url = "not-a-url"
"#;

        let result = load_config_from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_url_error() {
        let toml = r#"
[backend]
url = ""
"#;

        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::Missing { .. }
        ));
    }

    #[test]
    fn test_route_must_be_absolute() {
        let toml = r#"
[routes]
pending = "pending"
"#;

        assert!(matches!(
            load_config_from_str(toml).unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }

    #[test]
    fn test_missing_anon_key_rejected_by_strict_validation() {
        let config = AppConfig::default();
        assert!(matches!(
            validate_config(&config).unwrap_err(),
            ConfigError::Missing { .. }
        ));
    }
}
