// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret catalog seed location.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_SEED_PATH: &str = "secrets.json";

#[derive(Debug, Clone)]
pub struct CatalogConfig {
	pub seed_path: PathBuf,
}

impl Default for CatalogConfig {
	fn default() -> Self {
		CatalogConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfigLayer {
	#[serde(default)]
	pub seed_path: Option<PathBuf>,
}

impl CatalogConfigLayer {
	pub fn merge(&mut self, other: CatalogConfigLayer) {
		if other.seed_path.is_some() {
			self.seed_path = other.seed_path;
		}
	}

	pub fn finalize(self) -> CatalogConfig {
		CatalogConfig {
			seed_path: self
				.seed_path
				.unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_PATH)),
		}
	}
}
