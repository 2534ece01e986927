// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the relay client.

use std::path::PathBuf;

use loom_relay_core::RelayError;
use thiserror::Error;

/// Result type alias for relay client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while fetching a secret.
#[derive(Debug, Error)]
pub enum ClientError {
	/// Relay URL was not configured.
	#[error("relay URL is required")]
	MissingUrl,

	/// SVID or trust bundle was not configured.
	#[error("{0} is required")]
	MissingTlsMaterial(&'static str),

	/// A PEM file could not be read.
	#[error("failed to read {path}: {source}")]
	ReadPem {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// TLS material could not be parsed or assembled.
	#[error("TLS configuration error: {0}")]
	Tls(String),

	/// The request keypair could not be generated.
	#[error("key generation failed: {0}")]
	KeyGeneration(String),

	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Relay answered with a non-success status.
	#[error("relay error (status {status}): {message}")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Plain-text description from the relay.
		message: String,
	},

	/// Success response without an `X-Public-Key` header.
	#[error("response is missing the X-Public-Key header")]
	MissingPublicKeyHeader,

	/// Envelope failed verification or decryption.
	#[error("envelope rejected: {0}")]
	Envelope(#[from] RelayError),
}

impl ClientError {
	/// Whether a retry could plausibly succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			ClientError::RequestFailed(_) => true,
			ClientError::ServerError { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn server_errors_above_500_are_transient() {
		let err = ClientError::ServerError {
			status: 500,
			message: "Error encrypting data".into(),
		};
		assert!(err.is_transient());

		let err = ClientError::ServerError {
			status: 404,
			message: "No secret found for the given SPIFFE ID".into(),
		};
		assert!(!err.is_transient());
	}

	#[test]
	fn envelope_errors_are_not_transient() {
		let err = ClientError::from(RelayError::SignatureInvalid);
		assert!(!err.is_transient());
		assert!(err.to_string().starts_with("envelope rejected"));
	}
}
