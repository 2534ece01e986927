// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire envelope for relay responses.
//!
//! The JSON body carries the wrapped key, the ciphertext and the signature,
//! each standard base64. The ephemeral public key that verifies the signature
//! travels separately in the `X-Public-Key` header as base64 of its PEM.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs8::DecodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::cipher;
use crate::error::{RelayError, RelayResult};
use crate::signer;

/// Response header carrying the ephemeral public key.
pub const PUBLIC_KEY_HEADER: &str = "X-Public-Key";

/// JSON body of a successful relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
	#[serde(rename = "encryptedAESKey")]
	pub encrypted_aes_key: String,
	#[serde(rename = "encryptedData")]
	pub encrypted_data: String,
	pub signature: String,
}

/// A complete response: body plus the `X-Public-Key` header value.
#[derive(Debug, Clone)]
pub struct RelayResponse {
	pub envelope: EncryptedEnvelope,
	pub public_key_header: String,
}

/// Package raw response parts for the wire.
pub fn assemble(
	wrapped_key: &[u8],
	ciphertext: &[u8],
	signature: &[u8],
	server_public_key_pem: &str,
) -> RelayResponse {
	RelayResponse {
		envelope: EncryptedEnvelope {
			encrypted_aes_key: BASE64.encode(wrapped_key),
			encrypted_data: BASE64.encode(ciphertext),
			signature: BASE64.encode(signature),
		},
		public_key_header: BASE64.encode(server_public_key_pem),
	}
}

/// Decode an `X-Public-Key` header value into the signer's public key.
pub fn decode_public_key_header(header: &str) -> RelayResult<RsaPublicKey> {
	let pem = BASE64
		.decode(header.trim())
		.map_err(|e| RelayError::InvalidPublicKey(format!("header is not base64: {e}")))?;
	let pem = String::from_utf8(pem)
		.map_err(|e| RelayError::InvalidPublicKey(format!("header PEM is not UTF-8: {e}")))?;
	RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| RelayError::InvalidPublicKey(e.to_string()))
}

fn decode_field(name: &str, value: &str) -> RelayResult<Vec<u8>> {
	BASE64
		.decode(value)
		.map_err(|e| RelayError::Decryption(format!("{name} is not base64: {e}")))
}

/// Verify and decrypt an envelope on the workload side.
///
/// The signature is checked over the ciphertext before anything is
/// decrypted; a bad signature never reaches the key unwrap.
pub fn open(
	envelope: &EncryptedEnvelope,
	public_key_header: &str,
	client_private_key: &RsaPrivateKey,
) -> RelayResult<Vec<String>> {
	let server_key = decode_public_key_header(public_key_header)?;

	let wrapped_key = decode_field("encryptedAESKey", &envelope.encrypted_aes_key)?;
	let ciphertext = decode_field("encryptedData", &envelope.encrypted_data)?;
	let signature = decode_field("signature", &envelope.signature)?;

	signer::verify(&server_key, &ciphertext, &signature)?;
	cipher::decrypt_with(client_private_key, &wrapped_key, &ciphertext)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::keys::{public_key_pem, EphemeralKeyPair};
	use proptest::prelude::*;
	use rand::rngs::OsRng;
	use std::sync::OnceLock;

	struct Fixture {
		client: RsaPrivateKey,
		response: RelayResponse,
	}

	fn fixture(values: &[&str]) -> Fixture {
		let client = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		let values: Vec<String> = values.iter().map(|s| s.to_string()).collect();

		let sealed = cipher::encrypt_for(&client.to_public_key(), &values).unwrap();
		let server = EphemeralKeyPair::generate().unwrap();
		let server_pem = server.public_key_pem().unwrap();
		let signature = server.sign(&sealed.ciphertext).unwrap();

		Fixture {
			client,
			response: assemble(&sealed.wrapped_key, &sealed.ciphertext, &signature, &server_pem),
		}
	}

	#[test]
	fn envelope_uses_wire_field_names() {
		let envelope = EncryptedEnvelope {
			encrypted_aes_key: "a".into(),
			encrypted_data: "b".into(),
			signature: "c".into(),
		};
		let json = serde_json::to_value(&envelope).unwrap();
		assert_eq!(
			json,
			serde_json::json!({"encryptedAESKey": "a", "encryptedData": "b", "signature": "c"})
		);
	}

	#[test]
	fn open_recovers_values() {
		let f = fixture(&["alpha", "beta"]);
		let values = open(&f.response.envelope, &f.response.public_key_header, &f.client).unwrap();
		assert_eq!(values, ["alpha", "beta"]);
	}

	#[test]
	fn header_is_base64_pem() {
		let f = fixture(&["alpha"]);
		let pem = BASE64.decode(&f.response.public_key_header).unwrap();
		let pem = String::from_utf8(pem).unwrap();
		assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
	}

	fn shared_fixture() -> &'static Fixture {
		static FIXTURE: OnceLock<Fixture> = OnceLock::new();
		FIXTURE.get_or_init(|| fixture(&["alpha", "beta"]))
	}

	#[test]
	fn tampered_ciphertext_fails_open() {
		let f = shared_fixture();
		let mut ciphertext = BASE64.decode(&f.response.envelope.encrypted_data).unwrap();
		ciphertext[0] ^= 0x80;

		let mut envelope = f.response.envelope.clone();
		envelope.encrypted_data = BASE64.encode(&ciphertext);

		let result = open(&envelope, &f.response.public_key_header, &f.client);
		assert!(matches!(result, Err(RelayError::SignatureInvalid)));
	}

	proptest! {
		#[test]
		fn prop_any_ciphertext_bit_flip_fails_signature(
			bit in 0usize..8,
			position in any::<prop::sample::Index>(),
		) {
			let f = shared_fixture();
			let server_key = decode_public_key_header(&f.response.public_key_header).unwrap();
			let signature = BASE64.decode(&f.response.envelope.signature).unwrap();
			let mut ciphertext = BASE64.decode(&f.response.envelope.encrypted_data).unwrap();

			let i = position.index(ciphertext.len());
			ciphertext[i] ^= 1 << bit;

			prop_assert!(matches!(
				signer::verify(&server_key, &ciphertext, &signature),
				Err(RelayError::SignatureInvalid)
			));
		}
	}

	#[test]
	fn substituted_signer_key_fails_signature() {
		let f = fixture(&["alpha"]);
		let imposter = EphemeralKeyPair::generate().unwrap();
		let header = BASE64.encode(public_key_pem(&imposter.public_key()).unwrap());

		let result = open(&f.response.envelope, &header, &f.client);
		assert!(matches!(result, Err(RelayError::SignatureInvalid)));
	}

	#[test]
	fn wrong_client_key_cannot_decrypt() {
		let f = fixture(&["alpha"]);
		let other = RsaPrivateKey::new(&mut OsRng, 2048).unwrap();
		let result = open(&f.response.envelope, &f.response.public_key_header, &other);
		assert!(matches!(result, Err(RelayError::Decryption(_))));
	}

	#[test]
	fn garbage_header_is_rejected() {
		let f = fixture(&["alpha"]);
		let result = open(&f.response.envelope, "%%%", &f.client);
		assert!(matches!(result, Err(RelayError::InvalidPublicKey(_))));
	}
}
