// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory secret catalog.
//!
//! The catalog is seeded once at startup from a JSON file and never mutated
//! afterwards, so it can be shared across connections behind an `Arc` without
//! any locking.
//!
//! Seed format:
//!
//! ```json
//! {
//!   "secrets": [
//!     {
//!       "name": "relay:example.org",
//!       "value": ["alpha", "beta"],
//!       "created": "2024-05-01T00:00:00Z",
//!       "updated": "2024-05-01T00:00:00Z",
//!       "notBefore": "2024-05-01T00:00:00Z",
//!       "expiresAfter": "2025-05-01T00:00:00Z"
//!     }
//!   ],
//!   "algorithm": "aes"
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{RelayError, RelayResult};

/// Prefix joined with a trust domain to form a catalog key.
pub const CATALOG_KEY_PREFIX: &str = "relay:";

/// Catalog key for a trust domain.
pub fn catalog_key(trust_domain: &str) -> String {
	format!("{CATALOG_KEY_PREFIX}{trust_domain}")
}

/// Errors raised while seeding the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("failed to read secrets file {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse secrets file {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Ordered secret values. Redacted in Debug output and zeroized on drop.
#[derive(Clone)]
pub struct SecretValues(Zeroizing<Vec<String>>);

impl SecretValues {
	pub fn new(values: Vec<String>) -> Self {
		Self(Zeroizing::new(values))
	}

	/// Explicitly access the values.
	pub fn expose(&self) -> &[String] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretValues {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretValues([REDACTED; {}])", self.0.len())
	}
}

impl<'de> Deserialize<'de> for SecretValues {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Vec::<String>::deserialize(deserializer).map(SecretValues::new)
	}
}

/// A single catalog entry. Timestamps are carried through uninterpreted.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretRecord {
	pub name: String,
	pub value: SecretValues,
	#[serde(default)]
	pub created: String,
	#[serde(default)]
	pub updated: String,
	#[serde(default)]
	pub not_before: String,
	#[serde(default)]
	pub expires_after: String,
}

impl SecretRecord {
	pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
		Self {
			name: name.into(),
			value: SecretValues::new(values),
			created: String::new(),
			updated: String::new(),
			not_before: String::new(),
			expires_after: String::new(),
		}
	}
}

/// On-disk seed document.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
	#[serde(default)]
	pub secrets: Vec<SecretRecord>,
	#[serde(default)]
	pub algorithm: Option<String>,
}

/// Read-only table of secrets keyed by name.
#[derive(Debug, Default)]
pub struct SecretCatalog {
	index: HashMap<String, SecretRecord>,
}

impl SecretCatalog {
	/// Build a catalog from records. When several records share a name the
	/// first one wins, exactly as a front-to-back scan would resolve it.
	pub fn from_records(records: impl IntoIterator<Item = SecretRecord>) -> Self {
		let mut index = HashMap::new();
		for record in records {
			if index.contains_key(&record.name) {
				warn!(name = %record.name, "duplicate secret name in seed, keeping first");
				continue;
			}
			index.insert(record.name.clone(), record);
		}
		Self { index }
	}

	/// Load and index a seed file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
		let path = path.as_ref();
		debug!(path = %path.display(), "loading secrets seed");

		let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
			path: path.to_path_buf(),
			source: e,
		})?;

		let seed: SeedFile = serde_json::from_str(&content).map_err(|e| CatalogError::Parse {
			path: path.to_path_buf(),
			source: e,
		})?;

		let catalog = Self::from_records(seed.secrets);
		info!(
			path = %path.display(),
			secrets = catalog.len(),
			algorithm = seed.algorithm.as_deref().unwrap_or("unspecified"),
			"Secret catalog loaded"
		);
		Ok(catalog)
	}

	/// Resolve the secret a trust domain is entitled to.
	pub fn lookup(&self, trust_domain: &str) -> RelayResult<&SecretRecord> {
		self.index
			.get(&catalog_key(trust_domain))
			.ok_or_else(|| RelayError::SecretNotFound(trust_domain.to_string()))
	}

	pub fn len(&self) -> usize {
		self.index.len()
	}

	pub fn is_empty(&self) -> bool {
		self.index.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::io::Write;

	fn values(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn lookup_uses_prefixed_key() {
		let catalog =
			SecretCatalog::from_records([SecretRecord::new("relay:example.org", values(&["alpha", "beta"]))]);

		let record = catalog.lookup("example.org").unwrap();
		assert_eq!(record.value.expose(), ["alpha", "beta"]);
	}

	#[test]
	fn lookup_is_exact_match() {
		let catalog =
			SecretCatalog::from_records([SecretRecord::new("relay:example.org", values(&["alpha"]))]);

		assert!(matches!(
			catalog.lookup("other.org"),
			Err(RelayError::SecretNotFound(_))
		));
		assert!(catalog.lookup("example.or").is_err());
		assert!(catalog.lookup("EXAMPLE.ORG").is_err());
		assert!(catalog.lookup("relay:example.org").is_err());
	}

	#[test]
	fn unprefixed_names_are_unreachable() {
		let catalog = SecretCatalog::from_records([SecretRecord::new("example.org", values(&["x"]))]);
		assert!(catalog.lookup("example.org").is_err());
	}

	#[test]
	fn first_duplicate_wins() {
		let catalog = SecretCatalog::from_records([
			SecretRecord::new("relay:example.org", values(&["first"])),
			SecretRecord::new("relay:example.org", values(&["second"])),
		]);

		assert_eq!(catalog.len(), 1);
		assert_eq!(
			catalog.lookup("example.org").unwrap().value.expose(),
			["first"]
		);
	}

	#[test]
	fn debug_redacts_values() {
		let record = SecretRecord::new("relay:example.org", values(&["hunter2"]));
		let debug = format!("{record:?}");
		assert!(!debug.contains("hunter2"));
		assert!(debug.contains("REDACTED"));
		assert!(debug.contains("relay:example.org"));
	}

	#[test]
	fn load_parses_seed_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"{{
				"secrets": [
					{{
						"name": "relay:example.org",
						"value": ["alpha", "beta"],
						"created": "2024-05-01T00:00:00Z",
						"updated": "2024-05-02T00:00:00Z",
						"notBefore": "2024-05-01T00:00:00Z",
						"expiresAfter": "2025-05-01T00:00:00Z"
					}}
				],
				"algorithm": "aes"
			}}"#
		)
		.unwrap();

		let catalog = SecretCatalog::load(file.path()).unwrap();
		let record = catalog.lookup("example.org").unwrap();
		assert_eq!(record.value.expose(), ["alpha", "beta"]);
		assert_eq!(record.updated, "2024-05-02T00:00:00Z");
		assert_eq!(record.expires_after, "2025-05-01T00:00:00Z");
	}

	#[test]
	fn load_missing_file_is_error() {
		let dir = tempfile::tempdir().unwrap();
		let result = SecretCatalog::load(dir.path().join("absent.json"));
		assert!(matches!(result, Err(CatalogError::Read { .. })));
	}

	#[test]
	fn load_malformed_json_is_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "{{ not json").unwrap();
		let result = SecretCatalog::load(file.path());
		assert!(matches!(result, Err(CatalogError::Parse { .. })));
	}

	proptest! {
		#[test]
		fn prop_index_matches_linear_scan(
			names in proptest::collection::vec("[a-c]{1,2}", 0..20),
			wanted in "[a-c]{1,2}",
		) {
			let records: Vec<SecretRecord> = names
				.iter()
				.enumerate()
				.map(|(i, name)| SecretRecord::new(catalog_key(name), vec![i.to_string()]))
				.collect();

			let expected = records
				.iter()
				.find(|r| r.name == catalog_key(&wanted))
				.map(|r| r.value.expose().to_vec());

			let catalog = SecretCatalog::from_records(records);
			let actual = catalog.lookup(&wanted).ok().map(|r| r.value.expose().to_vec());

			prop_assert_eq!(expected, actual);
		}
	}
}
