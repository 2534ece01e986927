// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the Loom secret relay.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`LOOM_RELAY_*`)
//!
//! # Usage
//!
//! ```ignore
//! use loom_relay_config::load_config;
//!
//! let config = load_config()?;
//! println!("Relay listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::RelayConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved relay configuration.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
	pub http: HttpConfig,
	pub tls: TlsConfig,
	pub catalog: CatalogConfig,
	pub keys: KeysConfig,
	pub authz: AuthzConfig,
	pub logging: LoggingConfig,
}

impl RelayConfig {
	/// Get the socket address string for binding.
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`LOOM_RELAY_*`)
/// 2. Config file (`/etc/loom/relay.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<RelayConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<RelayConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge the given sources in precedence order and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<RelayConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = RelayConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: RelayConfigLayer) -> Result<RelayConfig, ConfigError> {
	let config = RelayConfig {
		http: layer.http.unwrap_or_default().finalize(),
		tls: layer.tls.unwrap_or_default().finalize(),
		catalog: layer.catalog.unwrap_or_default().finalize(),
		keys: layer.keys.unwrap_or_default().finalize(),
		authz: layer.authz.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		seed = %config.catalog.seed_path.display(),
		pool_size = config.keys.pool_size,
		allow_all = config.authz.allows_all(),
		tls_configured = config.tls.cert_path.is_some(),
		"Relay configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
fn validate_config(config: &RelayConfig) -> Result<(), ConfigError> {
	if config.http.max_body_bytes == 0 {
		return Err(ConfigError::Validation(
			"http.max_body_bytes must be greater than zero".to_string(),
		));
	}

	if config.tls.handshake_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"tls.handshake_timeout_secs must be greater than zero".to_string(),
		));
	}

	Ok(())
}
