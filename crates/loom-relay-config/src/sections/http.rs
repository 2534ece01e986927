// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP listener configuration.

use serde::Deserialize;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8443;
const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024;

/// HTTP listener configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct HttpConfig {
	pub host: String,
	pub port: u16,
	/// Upper bound on request bodies. A PEM public key is well under 1 KiB.
	pub max_body_bytes: usize,
}

impl Default for HttpConfig {
	fn default() -> Self {
		HttpConfigLayer::default().finalize()
	}
}

/// HTTP configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub max_body_bytes: Option<usize>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.max_body_bytes.is_some() {
			self.max_body_bytes = other.max_body_bytes;
		}
	}

	pub fn finalize(self) -> HttpConfig {
		HttpConfig {
			host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
			port: self.port.unwrap_or(DEFAULT_PORT),
			max_body_bytes: self.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = HttpConfigLayer::default().finalize();
		assert_eq!(config.host, "0.0.0.0");
		assert_eq!(config.port, 8443);
		assert_eq!(config.max_body_bytes, 16384);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = HttpConfigLayer {
			host: Some("127.0.0.1".to_string()),
			port: Some(3000),
			max_body_bytes: None,
		};
		let overlay = HttpConfigLayer {
			host: None,
			port: Some(9443),
			max_body_bytes: Some(4096),
		};
		base.merge(overlay);
		assert_eq!(base.host, Some("127.0.0.1".to_string()));
		assert_eq!(base.port, Some(9443));
		assert_eq!(base.max_body_bytes, Some(4096));
	}
}
