//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Every section
//! has defaults, so an empty file yields a runnable local setup.
//! The store schema and media layout are derived from this value at
//! startup and passed down explicitly - nothing reads globals.

pub mod loader;

use serde::Deserialize;

/// Top-level service configuration.
///
/// Loaded from `config.toml` at startup. All fields are validated
/// before the server binds its socket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// HTTP listener and request handling.
  pub server: ServerConfig,
  /// Relational store location and table.
  pub database: DatabaseConfig,
  /// Uploaded image storage.
  pub media: MediaConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Human-readable service name (logged at startup).
  pub name: String,
  /// Socket address to listen on.
  pub bind_address: String,
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  pub log_level: String,
  /// Path prefix the record endpoints are mounted under ("" for root).
  pub api_prefix: String,
  /// Browser origins allowed by CORS. Empty disables the CORS layer.
  pub cors_allowed_origins: Vec<String>,
  /// Maximum accepted request body, uploads included.
  pub max_body_bytes: usize,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  /// SQLite file path, or `:memory:`.
  pub path: String,
  /// Table holding the records.
  pub table: String,
}

/// Media (uploaded image) configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
  /// Filesystem root of the blob area.
  pub root: String,
  /// URL prefix image paths are appended to. Must end with `/`.
  pub base_url: String,
  /// Subdirectory of `root` new uploads go to.
  pub upload_dir: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      name: default_name(),
      bind_address: "0.0.0.0:8000".to_string(),
      log_level: "info".to_string(),
      api_prefix: "/api".to_string(),
      cors_allowed_origins: Vec::new(),
      max_body_bytes: default_max_body_bytes(),
    }
  }
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      path: "data/skin_records.sqlite3".to_string(),
      table: "skin_records".to_string(),
    }
  }
}

impl Default for MediaConfig {
  fn default() -> Self {
    Self {
      root: "media".to_string(),
      base_url: "/media/".to_string(),
      upload_dir: "skin_records".to_string(),
    }
  }
}

fn default_name() -> String {
  "skin-records".to_string()
}

fn default_max_body_bytes() -> usize {
  10 * 1024 * 1024 // 10 MiB
}
