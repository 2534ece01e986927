// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use serde::Deserialize;

fn default_level() -> String {
	"info,tower_http::trace=debug".to_string()
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Text,
	Json,
}

impl LogFormat {
	pub fn parse(value: &str) -> Option<Self> {
		match value.to_lowercase().as_str() {
			"text" | "pretty" => Some(LogFormat::Text),
			"json" => Some(LogFormat::Json),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
	pub format: Option<LogFormat>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.format.is_some() {
			self.format = other.format;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(default_level),
			format: self.format.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
	pub level: String,
	pub format: LogFormat,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		LoggingConfigLayer::default().finalize()
	}
}
