// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ephemeral keypair supply.

use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct KeysConfig {
	/// Number of pre-generated single-use keypairs to keep ready.
	/// Zero generates a keypair per response.
	pub pool_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysConfigLayer {
	#[serde(default)]
	pub pool_size: Option<usize>,
}

impl KeysConfigLayer {
	pub fn merge(&mut self, other: KeysConfigLayer) {
		if other.pool_size.is_some() {
			self.pool_size = other.pool_size;
		}
	}

	pub fn finalize(self) -> KeysConfig {
		KeysConfig {
			pool_size: self.pool_size.unwrap_or(0),
		}
	}
}
