// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	AuthzConfigLayer, CatalogConfigLayer, HttpConfigLayer, KeysConfigLayer, LoggingConfigLayer,
	TlsConfigLayer,
};

/// Relay configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub tls: Option<TlsConfigLayer>,
	#[serde(default)]
	pub catalog: Option<CatalogConfigLayer>,
	#[serde(default)]
	pub keys: Option<KeysConfigLayer>,
	#[serde(default)]
	pub authz: Option<AuthzConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl RelayConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: RelayConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.tls, other.tls, TlsConfigLayer::merge);
		merge_option(&mut self.catalog, other.catalog, CatalogConfigLayer::merge);
		merge_option(&mut self.keys, other.keys, KeysConfigLayer::merge);
		merge_option(&mut self.authz, other.authz, AuthzConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = RelayConfigLayer::default();
		base.merge(RelayConfigLayer::default());
		assert!(base.http.is_none());
		assert!(base.tls.is_none());
	}

	#[test]
	fn test_merge_other_overwrites() {
		let mut base = RelayConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(9443),
				host: Some("127.0.0.1".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		let other = RelayConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(443),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(other);
		assert_eq!(base.http.as_ref().unwrap().port, Some(443));
		assert_eq!(
			base.http.as_ref().unwrap().host,
			Some("127.0.0.1".to_string())
		);
	}

	#[test]
	fn test_merge_adds_missing_sections() {
		let mut base = RelayConfigLayer::default();
		let other = RelayConfigLayer {
			keys: Some(KeysConfigLayer { pool_size: Some(4) }),
			..Default::default()
		};
		base.merge(other);
		assert_eq!(base.keys.as_ref().unwrap().pool_size, Some(4));
	}

	#[test]
	fn test_deserialize_full_toml() {
		let toml_str = r#"
[http]
port = 9443

[tls]
cert_path = "/run/svid/svid.pem"
key_path = "/run/svid/svid_key.pem"
bundle_path = "/run/svid/bundle.pem"

[catalog]
seed_path = "/opt/loom/secrets.json"

[keys]
pool_size = 8

[authz]
allowed_trust_domains = ["example.org"]

[logging]
level = "debug"
format = "json"
"#;
		let layer: RelayConfigLayer = toml::from_str(toml_str).unwrap();
		assert_eq!(layer.http.unwrap().port, Some(9443));
		assert_eq!(layer.keys.unwrap().pool_size, Some(8));
		assert_eq!(
			layer.authz.unwrap().allowed_trust_domains,
			Some(vec!["example.org".to_string()])
		);
	}
}
