// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::RelayConfigLayer;
use crate::sections::{
	AuthzConfigLayer, CatalogConfigLayer, HttpConfigLayer, KeysConfigLayer, LogFormat,
	LoggingConfigLayer, TlsConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<RelayConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<RelayConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(RelayConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/loom/relay.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<RelayConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(RelayConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: RelayConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: LOOM_RELAY_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<RelayConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(RelayConfigLayer {
			http: Some(load_http_from_env()?),
			tls: Some(load_tls_from_env()?),
			catalog: Some(load_catalog_from_env()),
			keys: Some(load_keys_from_env()?),
			authz: Some(load_authz_from_env()),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
	env_var(name).map(PathBuf::from)
}

fn env_list(name: &str) -> Option<Vec<String>> {
	env_var(name).map(|s| {
		s.split(',')
			.map(|s| s.trim().to_string())
			.filter(|s| !s.is_empty())
			.collect()
	})
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid size value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("LOOM_RELAY_HOST"),
		port: env_u16("LOOM_RELAY_PORT")?,
		max_body_bytes: env_usize("LOOM_RELAY_MAX_BODY_BYTES")?,
	})
}

fn load_tls_from_env() -> Result<TlsConfigLayer, ConfigError> {
	Ok(TlsConfigLayer {
		cert_path: env_path("LOOM_RELAY_TLS_CERT_PATH"),
		key_path: env_path("LOOM_RELAY_TLS_KEY_PATH"),
		bundle_path: env_path("LOOM_RELAY_TLS_BUNDLE_PATH"),
		handshake_timeout_secs: env_u64("LOOM_RELAY_TLS_HANDSHAKE_TIMEOUT_SECS")?,
	})
}

fn load_catalog_from_env() -> CatalogConfigLayer {
	CatalogConfigLayer {
		seed_path: env_path("LOOM_RELAY_CATALOG_SEED_PATH"),
	}
}

fn load_keys_from_env() -> Result<KeysConfigLayer, ConfigError> {
	Ok(KeysConfigLayer {
		pool_size: env_usize("LOOM_RELAY_KEYS_POOL_SIZE")?,
	})
}

fn load_authz_from_env() -> AuthzConfigLayer {
	AuthzConfigLayer {
		allowed_trust_domains: env_list("LOOM_RELAY_AUTHZ_ALLOWED_TRUST_DOMAINS"),
	}
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	let format = match env_var("LOOM_RELAY_LOG_FORMAT") {
		Some(v) => Some(LogFormat::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
			key: "LOOM_RELAY_LOG_FORMAT".to_string(),
			message: format!("expected 'text' or 'json', got '{v}'"),
		})?),
		None => None,
	};

	Ok(LoggingConfigLayer {
		level: env_var("LOOM_RELAY_LOG_LEVEL"),
		format,
	})
}
