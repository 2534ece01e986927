// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use std::path::PathBuf;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
};
use loom_relay_config::ConfigError;
use loom_relay_core::{CatalogError, RelayError};

/// Errors returned by request handlers.
///
/// Responses are plain text: the status plus a short description that never
/// carries key or secret material.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error(transparent)]
	Relay(#[from] RelayError),

	/// The request body could not be read (too large, connection reset).
	#[error("Error reading request body: {0}")]
	Body(String),
}

impl ServerError {
	pub fn status(&self) -> StatusCode {
		match self {
			ServerError::Relay(e) => {
				StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
			}
			ServerError::Body(_) => StatusCode::BAD_REQUEST,
		}
	}

	pub fn message(&self) -> String {
		match self {
			ServerError::Relay(e) => e.public_message(),
			ServerError::Body(_) => "Error reading request body".to_string(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		(self.status(), self.message()).into_response()
	}
}

/// Errors that prevent the relay from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Catalog(#[from] CatalogError),

	#[error("Failed to read {path}: {source}")]
	ReadPem {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Certificate error: {0}")]
	Certificate(String),

	#[error("Private key error: {0}")]
	PrivateKey(String),

	#[error("TLS configuration error: {0}")]
	Tls(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn relay_errors_keep_their_status() {
		let err = ServerError::from(RelayError::SecretNotFound("other.org".into()));
		assert_eq!(err.status(), StatusCode::NOT_FOUND);
		assert_eq!(err.message(), "No secret found for the given SPIFFE ID");
	}

	#[test]
	fn body_errors_are_bad_request() {
		let err = ServerError::Body("length limit exceeded".into());
		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
		assert!(!err.message().contains("length limit"));
	}

	#[test]
	fn internal_errors_are_opaque() {
		let err = ServerError::from(RelayError::KeyWrap("message too long for RSA key".into()));
		assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(err.message(), "Error encrypting AES key");
	}
}
