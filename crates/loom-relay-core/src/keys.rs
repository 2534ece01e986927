// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Key exchange material.
//!
//! Each response is bound to two RSA keys:
//! - the caller's public key, submitted as PEM in the request body and used
//!   only to wrap the response's AES key
//! - a server-side ephemeral keypair, used once to sign the ciphertext and
//!   then dropped
//!
//! RSA-2048 generation is CPU bound. [`FreshKeyPairs`] runs it on the blocking
//! pool per request; [`KeyPairPool`] keeps a small buffer of pre-generated,
//! single-use keypairs topped up by a background producer.

use std::fmt;

use async_trait::async_trait;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{RelayError, RelayResult};
use crate::signer;

/// Modulus size for ephemeral keypairs.
pub const RSA_KEY_BITS: usize = 2048;

/// Parse the caller's public key from a request body.
///
/// The body must be UTF-8 PEM holding a SubjectPublicKeyInfo (`PUBLIC KEY`)
/// for an RSA key.
pub fn parse_client_public_key(body: &[u8]) -> RelayResult<RsaPublicKey> {
	let pem = std::str::from_utf8(body)
		.map_err(|e| RelayError::InvalidBody(format!("body is not UTF-8: {e}")))?;

	RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| RelayError::InvalidPublicKey(e.to_string()))
}

/// Encode a public key as SubjectPublicKeyInfo PEM.
pub fn public_key_pem(key: &RsaPublicKey) -> RelayResult<String> {
	key.to_public_key_pem(LineEnding::LF)
		.map_err(|e| RelayError::Encoding(format!("public key PEM encoding failed: {e}")))
}

/// Short hex fingerprint of a public key, safe to log.
pub fn fingerprint(key: &RsaPublicKey) -> String {
	match key.to_public_key_der() {
		Ok(der) => hex::encode(&Sha256::digest(der.as_bytes())[..8]),
		Err(_) => "unknown".to_string(),
	}
}

/// A server keypair that signs exactly one response.
pub struct EphemeralKeyPair {
	private: RsaPrivateKey,
}

impl EphemeralKeyPair {
	/// Generate a new RSA-2048 keypair. Blocks; call from the blocking pool.
	pub fn generate() -> RelayResult<Self> {
		let private = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
			.map_err(|e| RelayError::KeyGeneration(e.to_string()))?;
		Ok(Self { private })
	}

	pub fn public_key(&self) -> RsaPublicKey {
		self.private.to_public_key()
	}

	pub fn public_key_pem(&self) -> RelayResult<String> {
		public_key_pem(&self.public_key())
	}

	pub fn fingerprint(&self) -> String {
		fingerprint(&self.public_key())
	}

	/// Sign data with the private half, consuming the keypair.
	pub fn sign(self, data: &[u8]) -> RelayResult<Vec<u8>> {
		signer::sign(&self.private, data)
	}
}

impl fmt::Debug for EphemeralKeyPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EphemeralKeyPair")
			.field("fingerprint", &self.fingerprint())
			.field("private", &"[REDACTED]")
			.finish()
	}
}

/// Supplies ephemeral keypairs to the relay.
///
/// Implementations must never hand out the same keypair twice.
#[async_trait]
pub trait KeyPairSource: Send + Sync {
	async fn acquire(&self) -> RelayResult<EphemeralKeyPair>;
}

/// Generates a keypair on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreshKeyPairs;

#[async_trait]
impl KeyPairSource for FreshKeyPairs {
	async fn acquire(&self) -> RelayResult<EphemeralKeyPair> {
		tokio::task::spawn_blocking(EphemeralKeyPair::generate)
			.await
			.map_err(|e| RelayError::KeyGeneration(format!("key generation task failed: {e}")))?
	}
}

/// Bounded buffer of pre-generated keypairs.
///
/// A background producer on the blocking pool keeps the buffer full. Each
/// keypair is moved out of the channel exactly once. When the buffer is empty
/// the pool falls back to generating on demand instead of waiting.
pub struct KeyPairPool {
	receiver: Mutex<mpsc::Receiver<EphemeralKeyPair>>,
	capacity: usize,
	fallback: FreshKeyPairs,
}

impl KeyPairPool {
	/// Create a pool and start its producer. Must be called inside a tokio
	/// runtime. The producer exits when the pool is dropped.
	pub fn spawn(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		let (sender, receiver) = mpsc::channel(capacity);

		tokio::task::spawn_blocking(move || {
			loop {
				let keypair = match EphemeralKeyPair::generate() {
					Ok(keypair) => keypair,
					Err(e) => {
						warn!(error = %e, "keypair pool producer stopped");
						return;
					}
				};
				if sender.blocking_send(keypair).is_err() {
					debug!("keypair pool closed, producer exiting");
					return;
				}
			}
		});

		info!(capacity, "Keypair pool started");
		Self {
			receiver: Mutex::new(receiver),
			capacity,
			fallback: FreshKeyPairs,
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

impl fmt::Debug for KeyPairPool {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KeyPairPool")
			.field("capacity", &self.capacity)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl KeyPairSource for KeyPairPool {
	async fn acquire(&self) -> RelayResult<EphemeralKeyPair> {
		let pooled = self.receiver.lock().await.try_recv().ok();
		match pooled {
			Some(keypair) => Ok(keypair),
			None => {
				debug!("keypair pool empty, generating on demand");
				self.fallback.acquire().await
			}
		}
	}
}
