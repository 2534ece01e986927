// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mutual TLS material written to disk by the workload identity agent.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// TLS configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct TlsConfig {
	/// PEM SVID certificate chain, leaf first.
	pub cert_path: Option<PathBuf>,
	/// PEM private key for the SVID.
	pub key_path: Option<PathBuf>,
	/// PEM trust bundle used to verify client certificates.
	pub bundle_path: Option<PathBuf>,
	pub handshake_timeout_secs: u64,
}

impl Default for TlsConfig {
	fn default() -> Self {
		TlsConfigLayer::default().finalize()
	}
}

/// Resolved paths required to terminate mutual TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
	pub cert_path: PathBuf,
	pub key_path: PathBuf,
	pub bundle_path: PathBuf,
}

impl TlsConfig {
	/// All three paths, or a validation error naming the first missing one.
	pub fn require_paths(&self) -> Result<TlsPaths, ConfigError> {
		fn require(value: &Option<PathBuf>, name: &str) -> Result<PathBuf, ConfigError> {
			value.clone().ok_or_else(|| {
				ConfigError::Validation(format!(
					"tls.{name} is required to serve (LOOM_RELAY_TLS_{})",
					name.to_uppercase()
				))
			})
		}

		Ok(TlsPaths {
			cert_path: require(&self.cert_path, "cert_path")?,
			key_path: require(&self.key_path, "key_path")?,
			bundle_path: require(&self.bundle_path, "bundle_path")?,
		})
	}
}

/// TLS configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfigLayer {
	#[serde(default)]
	pub cert_path: Option<PathBuf>,
	#[serde(default)]
	pub key_path: Option<PathBuf>,
	#[serde(default)]
	pub bundle_path: Option<PathBuf>,
	#[serde(default)]
	pub handshake_timeout_secs: Option<u64>,
}

impl TlsConfigLayer {
	pub fn merge(&mut self, other: TlsConfigLayer) {
		if other.cert_path.is_some() {
			self.cert_path = other.cert_path;
		}
		if other.key_path.is_some() {
			self.key_path = other.key_path;
		}
		if other.bundle_path.is_some() {
			self.bundle_path = other.bundle_path;
		}
		if other.handshake_timeout_secs.is_some() {
			self.handshake_timeout_secs = other.handshake_timeout_secs;
		}
	}

	pub fn finalize(self) -> TlsConfig {
		TlsConfig {
			cert_path: self.cert_path,
			key_path: self.key_path,
			bundle_path: self.bundle_path,
			handshake_timeout_secs: self
				.handshake_timeout_secs
				.unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
		}
	}
}
