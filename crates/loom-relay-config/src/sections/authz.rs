// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller authorization.

use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct AuthzConfig {
	/// Trust domains allowed to fetch secrets. Empty allows every
	/// authenticated caller.
	pub allowed_trust_domains: Vec<String>,
}

impl AuthzConfig {
	pub fn allows_all(&self) -> bool {
		self.allowed_trust_domains.is_empty()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthzConfigLayer {
	#[serde(default)]
	pub allowed_trust_domains: Option<Vec<String>>,
}

impl AuthzConfigLayer {
	pub fn merge(&mut self, other: AuthzConfigLayer) {
		if other.allowed_trust_domains.is_some() {
			self.allowed_trust_domains = other.allowed_trust_domains;
		}
	}

	pub fn finalize(self) -> AuthzConfig {
		AuthzConfig {
			allowed_trust_domains: self
				.allowed_trust_domains
				.unwrap_or_default()
				.into_iter()
				.map(|d| d.trim().to_string())
				.filter(|d| !d.is_empty())
				.collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_allows_all() {
		assert!(AuthzConfigLayer::default().finalize().allows_all());
	}

	#[test]
	fn test_blank_entries_are_dropped() {
		let config = AuthzConfigLayer {
			allowed_trust_domains: Some(vec![" example.org ".into(), "".into()]),
		}
		.finalize();
		assert_eq!(config.allowed_trust_domains, vec!["example.org"]);
		assert!(!config.allows_all());
	}

	#[test]
	fn test_merge_replaces_list() {
		let mut base = AuthzConfigLayer {
			allowed_trust_domains: Some(vec!["a.org".into(), "b.org".into()]),
		};
		base.merge(AuthzConfigLayer {
			allowed_trust_domains: Some(vec!["c.org".into()]),
		});
		assert_eq!(base.allowed_trust_domains, Some(vec!["c.org".to_string()]));
	}
}
