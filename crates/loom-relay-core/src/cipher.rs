// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hybrid encryption of secret payloads.
//!
//! A fresh AES-256-GCM key encrypts the payload; that key is then wrapped
//! with RSA-OAEP (SHA-256, empty label) under the caller's public key. The
//! ciphertext layout is `nonce || sealed`, with no associated data.

use aes_gcm::{
	aead::{Aead, KeyInit, OsRng},
	Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{RelayError, RelayResult};

/// Size of the symmetric key in bytes (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Output of [`encrypt_for`]: the wrapped key and the `nonce || sealed` bytes.
#[derive(Debug, Clone)]
pub struct SealedPayload {
	pub wrapped_key: Vec<u8>,
	pub ciphertext: Vec<u8>,
}

/// Generate a random symmetric key.
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	OsRng.fill_bytes(key.as_mut());
	key
}

/// Generate a random 96-bit nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
	let mut nonce = [0u8; NONCE_SIZE];
	OsRng.fill_bytes(&mut nonce);
	nonce
}

/// Encrypt with a fresh nonce and return `nonce || sealed`.
pub fn seal(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> RelayResult<Vec<u8>> {
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

	let nonce_bytes = generate_nonce();
	let nonce = Nonce::from_slice(&nonce_bytes);

	let sealed = cipher
		.encrypt(nonce, plaintext)
		.map_err(|e| RelayError::Encryption(format!("payload encryption failed: {e}")))?;

	let mut out = Vec::with_capacity(NONCE_SIZE + sealed.len());
	out.extend_from_slice(&nonce_bytes);
	out.extend_from_slice(&sealed);
	Ok(out)
}

/// Split `nonce || sealed` and decrypt.
pub fn open(key: &[u8; KEY_SIZE], data: &[u8]) -> RelayResult<Zeroizing<Vec<u8>>> {
	if data.len() < NONCE_SIZE {
		return Err(RelayError::Decryption(format!(
			"ciphertext shorter than nonce ({} bytes)",
			data.len()
		)));
	}

	let (nonce_bytes, sealed) = data.split_at(NONCE_SIZE);
	let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

	cipher
		.decrypt(Nonce::from_slice(nonce_bytes), sealed)
		.map(Zeroizing::new)
		.map_err(|e| RelayError::Decryption(format!("payload decryption failed: {e}")))
}

/// Wrap a symmetric key under an RSA public key with OAEP-SHA256.
pub fn wrap_key(public: &RsaPublicKey, key: &[u8; KEY_SIZE]) -> RelayResult<Vec<u8>> {
	public
		.encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_slice())
		.map_err(|e| RelayError::KeyWrap(e.to_string()))
}

/// Unwrap a symmetric key with the matching RSA private key.
pub fn unwrap_key(private: &RsaPrivateKey, wrapped: &[u8]) -> RelayResult<Zeroizing<[u8; KEY_SIZE]>> {
	let mut plaintext = Zeroizing::new(
		private
			.decrypt(Oaep::new::<Sha256>(), wrapped)
			.map_err(|e| RelayError::Decryption(format!("key unwrap failed: {e}")))?,
	);

	if plaintext.len() != KEY_SIZE {
		return Err(RelayError::InvalidKeySize {
			expected: KEY_SIZE,
			actual: plaintext.len(),
		});
	}

	let mut key = Zeroizing::new([0u8; KEY_SIZE]);
	key.copy_from_slice(&plaintext);
	plaintext.zeroize();
	Ok(key)
}

/// Canonical plaintext for a value list: a JSON array of strings.
pub fn encode_values(values: &[String]) -> RelayResult<Zeroizing<Vec<u8>>> {
	serde_json::to_vec(values)
		.map(Zeroizing::new)
		.map_err(|e| RelayError::Encoding(format!("failed to marshal secret: {e}")))
}

/// Inverse of [`encode_values`].
pub fn decode_values(plaintext: &[u8]) -> RelayResult<Vec<String>> {
	serde_json::from_slice(plaintext)
		.map_err(|e| RelayError::Decryption(format!("plaintext is not a string array: {e}")))
}

/// Encrypt a value list so that only the holder of `recipient`'s private key
/// can read it. The symmetric key never leaves this function unwrapped.
pub fn encrypt_for(recipient: &RsaPublicKey, values: &[String]) -> RelayResult<SealedPayload> {
	let key = generate_key();
	let plaintext = encode_values(values)?;
	let ciphertext = seal(&key, &plaintext)?;
	let wrapped_key = wrap_key(recipient, &key)?;

	Ok(SealedPayload {
		wrapped_key,
		ciphertext,
	})
}

/// Reverse of [`encrypt_for`].
pub fn decrypt_with(
	private: &RsaPrivateKey,
	wrapped_key: &[u8],
	ciphertext: &[u8],
) -> RelayResult<Vec<String>> {
	let key = unwrap_key(private, wrapped_key)?;
	let plaintext = open(&key, ciphertext)?;
	decode_values(&plaintext)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::sync::OnceLock;

	fn recipient() -> &'static RsaPrivateKey {
		static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
		KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
	}

	#[test]
	fn generated_keys_are_unique() {
		let a = generate_key();
		let b = generate_key();
		assert_ne!(*a, *b);
	}

	#[test]
	fn ciphertext_starts_with_nonce() {
		let key = generate_key();
		let ciphertext = seal(&key, b"payload").unwrap();
		// nonce + plaintext + 16-byte tag
		assert_eq!(ciphertext.len(), NONCE_SIZE + 7 + 16);
	}

	#[test]
	fn same_plaintext_gets_fresh_nonce() {
		let key = generate_key();
		let a = seal(&key, b"payload").unwrap();
		let b = seal(&key, b"payload").unwrap();
		assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
		assert_ne!(a, b);
	}

	#[test]
	fn wrong_key_fails_open() {
		let ciphertext = seal(&generate_key(), b"payload").unwrap();
		let result = open(&generate_key(), &ciphertext);
		assert!(matches!(result, Err(RelayError::Decryption(_))));
	}

	#[test]
	fn truncated_ciphertext_fails_open() {
		let key = generate_key();
		let result = open(&key, &[0u8; NONCE_SIZE - 1]);
		assert!(matches!(result, Err(RelayError::Decryption(_))));
	}

	#[test]
	fn tampered_ciphertext_fails_open() {
		let key = generate_key();
		let mut ciphertext = seal(&key, b"payload").unwrap();
		let last = ciphertext.len() - 1;
		ciphertext[last] ^= 0x01;
		assert!(open(&key, &ciphertext).is_err());
	}

	#[test]
	fn wrapped_key_unwraps() {
		let key = generate_key();
		let wrapped = wrap_key(&recipient().to_public_key(), &key).unwrap();
		assert_eq!(wrapped.len(), 256);

		let unwrapped = unwrap_key(recipient(), &wrapped).unwrap();
		assert_eq!(*unwrapped, *key);
	}

	#[test]
	fn unwrap_with_wrong_private_key_fails() {
		let key = generate_key();
		let wrapped = wrap_key(&recipient().to_public_key(), &key).unwrap();

		let other = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		assert!(unwrap_key(&other, &wrapped).is_err());
	}

	#[test]
	fn encode_values_is_json_array() {
		let values = vec!["alpha".to_string(), "beta".to_string()];
		let encoded = encode_values(&values).unwrap();
		assert_eq!(encoded.as_slice(), br#"["alpha","beta"]"#);
	}

	#[test]
	fn encrypt_for_recipient() {
		let values = vec!["alpha".to_string(), "beta".to_string()];
		let sealed = encrypt_for(&recipient().to_public_key(), &values).unwrap();

		let recovered = decrypt_with(recipient(), &sealed.wrapped_key, &sealed.ciphertext).unwrap();
		assert_eq!(recovered, values);
	}

	proptest! {
		#![proptest_config(ProptestConfig::with_cases(32))]

		#[test]
		fn prop_value_lists_survive_encryption(
			values in proptest::collection::vec(".*", 0..8),
		) {
			let sealed = encrypt_for(&recipient().to_public_key(), &values).unwrap();
			let recovered = decrypt_with(recipient(), &sealed.wrapped_key, &sealed.ciphertext).unwrap();
			prop_assert_eq!(recovered, values);
		}

		#[test]
		fn prop_single_bit_flip_is_detected(
			plaintext in proptest::collection::vec(any::<u8>(), 1..256),
			bit in 0usize..8,
			position in any::<prop::sample::Index>(),
		) {
			let key = generate_key();
			let mut ciphertext = seal(&key, &plaintext).unwrap();
			let i = position.index(ciphertext.len());
			ciphertext[i] ^= 1 << bit;
			prop_assert!(open(&key, &ciphertext).is_err());
		}
	}
}
