// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the relay exchange.

use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that terminate a relay exchange.
///
/// Every variant maps to exactly one HTTP status. Messages are safe to return
/// to the caller; none of them carry key or secret material.
#[derive(Debug, Error)]
pub enum RelayError {
	// =========================================================================
	// Authentication Errors
	// =========================================================================
	#[error("no client certificate provided")]
	MissingCertificate,

	#[error("unusable client certificate: {0}")]
	InvalidCertificate(String),

	#[error("access denied for trust domain {0}")]
	AccessDenied(String),

	// =========================================================================
	// Input Errors
	// =========================================================================
	#[error("invalid identity URI")]
	InvalidIdentity(String),

	#[error("invalid client public key: {0}")]
	InvalidPublicKey(String),

	#[error("unreadable request body: {0}")]
	InvalidBody(String),

	// =========================================================================
	// Lookup Errors
	// =========================================================================
	#[error("no secret found for trust domain {0}")]
	SecretNotFound(String),

	// =========================================================================
	// Crypto Errors
	// =========================================================================
	#[error("key generation failed: {0}")]
	KeyGeneration(String),

	#[error("encryption failed: {0}")]
	Encryption(String),

	#[error("key wrap failed: {0}")]
	KeyWrap(String),

	#[error("signing failed: {0}")]
	Signing(String),

	#[error("invalid key size: expected {expected}, got {actual}")]
	InvalidKeySize { expected: usize, actual: usize },

	// =========================================================================
	// Encoding Errors
	// =========================================================================
	#[error("encoding failed: {0}")]
	Encoding(String),

	// =========================================================================
	// Envelope Errors (client side)
	// =========================================================================
	#[error("decryption failed: {0}")]
	Decryption(String),

	#[error("signature verification failed")]
	SignatureInvalid,
}

impl RelayError {
	/// Returns true if this error should be logged at error level.
	pub fn is_internal(&self) -> bool {
		matches!(
			self,
			RelayError::KeyGeneration(_)
				| RelayError::Encryption(_)
				| RelayError::KeyWrap(_)
				| RelayError::Signing(_)
				| RelayError::InvalidKeySize { .. }
				| RelayError::Encoding(_)
				| RelayError::Decryption(_)
		)
	}

	/// Returns the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			// 401 Unauthorized
			RelayError::MissingCertificate | RelayError::InvalidCertificate(_) => 401,

			// 403 Forbidden
			RelayError::AccessDenied(_) => 403,

			// 400 Bad Request
			RelayError::InvalidIdentity(_)
			| RelayError::InvalidPublicKey(_)
			| RelayError::InvalidBody(_) => 400,

			// 404 Not Found
			RelayError::SecretNotFound(_) => 404,

			// 500 Internal Server Error
			RelayError::KeyGeneration(_)
			| RelayError::Encryption(_)
			| RelayError::KeyWrap(_)
			| RelayError::Signing(_)
			| RelayError::InvalidKeySize { .. }
			| RelayError::Encoding(_)
			| RelayError::Decryption(_)
			| RelayError::SignatureInvalid => 500,
		}
	}

	/// Short description returned to the caller.
	///
	/// Internal failures collapse to a fixed message so that crypto library
	/// diagnostics never reach the wire.
	pub fn public_message(&self) -> String {
		match self {
			RelayError::KeyGeneration(_) => "Error generating keypair".to_string(),
			RelayError::Encryption(_) | RelayError::InvalidKeySize { .. } => {
				"Error encrypting data".to_string()
			}
			RelayError::KeyWrap(_) => "Error encrypting AES key".to_string(),
			RelayError::Signing(_) => "Error signing data".to_string(),
			RelayError::Encoding(_) => "Error encoding response".to_string(),
			RelayError::InvalidPublicKey(_) => "Invalid client public key".to_string(),
			RelayError::InvalidBody(_) => "Error reading request body".to_string(),
			RelayError::InvalidIdentity(_) => "Invalid SPIFFE ID".to_string(),
			RelayError::SecretNotFound(_) => "No secret found for the given SPIFFE ID".to_string(),
			other => other.to_string(),
		}
	}
}
