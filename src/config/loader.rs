//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::net::SocketAddr;
use std::path::{Component, Path};

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "SKIN_RECORDS_CONFIG";

/// Config file used when `SKIN_RECORDS_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Resolve the config path from the environment.
pub fn config_path() -> String {
  std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    bind = %config.server.bind_address,
    database = %config.database.path,
    media_root = %config.media.root,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - A parseable socket address
/// - A well-formed API prefix and media URL
/// - An upload directory that stays inside the media root
fn validate_config(config: &AppConfig) -> Result<()> {
  // Server validation
  config
    .server
    .bind_address
    .parse::<SocketAddr>()
    .with_context(|| format!("Invalid bind_address: {}", config.server.bind_address))?;

  let prefix = &config.server.api_prefix;
  anyhow::ensure!(
    prefix.is_empty() || (prefix.starts_with('/') && !prefix.ends_with('/')),
    "api_prefix must be empty or start with '/' and not end with '/', got {prefix:?}"
  );
  anyhow::ensure!(
    config.server.max_body_bytes > 0,
    "max_body_bytes must be positive"
  );
  anyhow::ensure!(
    !config.server.log_level.is_empty(),
    "log_level must not be empty"
  );

  // Database validation
  anyhow::ensure!(
    !config.database.path.is_empty(),
    "database path must not be empty"
  );

  // Media validation
  anyhow::ensure!(!config.media.root.is_empty(), "media root must not be empty");
  anyhow::ensure!(
    config.media.base_url.ends_with('/'),
    "media base_url must end with '/', got {:?}",
    config.media.base_url
  );
  anyhow::ensure!(
    !config.media.upload_dir.is_empty()
      && Path::new(&config.media.upload_dir)
        .components()
        .all(|c| matches!(c, Component::Normal(_))),
    "media upload_dir must be a relative path without '..', got {:?}",
    config.media.upload_dir
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_load_nonexistent_file() {
    let result = load_config("nonexistent.toml");
    assert!(result.is_err());
  }

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config.server.bind_address, "0.0.0.0:8000");
    assert_eq!(config.server.api_prefix, "/api");
    assert_eq!(config.database.table, "skin_records");
    assert_eq!(config.media.base_url, "/media/");
    assert_eq!(config.media.upload_dir, "skin_records");
    assert!(config.server.cors_allowed_origins.is_empty());
  }

  #[test]
  fn test_partial_sections_merge_with_defaults() {
    let config = parse_config(
      r#"
      [server]
      bind_address = "127.0.0.1:9000"
      cors_allowed_origins = ["http://localhost:5173"]

      [database]
      path = ":memory:"
      "#,
    )
    .unwrap();
    assert_eq!(config.server.bind_address, "127.0.0.1:9000");
    assert_eq!(config.server.log_level, "info");
    assert_eq!(config.server.cors_allowed_origins.len(), 1);
    assert_eq!(config.database.path, ":memory:");
    assert_eq!(config.database.table, "skin_records");
  }

  #[test]
  fn test_rejects_bad_prefix_and_media() {
    assert!(parse_config("[server]\napi_prefix = \"api/\"").is_err());
    assert!(parse_config("[server]\nbind_address = \"nowhere\"").is_err());
    assert!(parse_config("[media]\nbase_url = \"/media\"").is_err());
    assert!(parse_config("[media]\nupload_dir = \"../outside\"").is_err());
  }
}
