// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! RSASSA-PKCS1-v1_5 signatures with SHA-256 over response ciphertext.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::{RelayError, RelayResult};

/// Sign `data` (hashed with SHA-256 internally).
pub fn sign(private: &RsaPrivateKey, data: &[u8]) -> RelayResult<Vec<u8>> {
	let key = SigningKey::<Sha256>::new(private.clone());
	let signature = key
		.try_sign(data)
		.map_err(|e| RelayError::Signing(e.to_string()))?;
	Ok(signature.to_vec())
}

/// Verify a signature produced by [`sign`].
pub fn verify(public: &RsaPublicKey, data: &[u8], signature: &[u8]) -> RelayResult<()> {
	let key = VerifyingKey::<Sha256>::new(public.clone());
	let signature = Signature::try_from(signature).map_err(|_| RelayError::SignatureInvalid)?;
	key.verify(data, &signature)
		.map_err(|_| RelayError::SignatureInvalid)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::rngs::OsRng;

	#[test]
	fn signature_verifies() {
		let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		let signature = sign(&private, b"ciphertext").unwrap();
		assert_eq!(signature.len(), 256);
		assert!(verify(&private.to_public_key(), b"ciphertext", &signature).is_ok());
	}

	#[test]
	fn altered_data_fails_verification() {
		let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		let signature = sign(&private, b"ciphertext").unwrap();
		let result = verify(&private.to_public_key(), b"ciphertexT", &signature);
		assert!(matches!(result, Err(RelayError::SignatureInvalid)));
	}

	#[test]
	fn other_key_fails_verification() {
		let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		let other = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		let signature = sign(&private, b"ciphertext").unwrap();
		assert!(verify(&other.to_public_key(), b"ciphertext", &signature).is_err());
	}

	#[test]
	fn empty_signature_is_rejected() {
		let private = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		assert!(verify(&private.to_public_key(), b"ciphertext", &[]).is_err());
	}
}
