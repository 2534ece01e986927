// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loom Secret Relay
//!
//! Relays secrets to workloads that authenticate with SPIFFE X.509 SVIDs over
//! mutual TLS, without relying on TLS alone for confidentiality:
//!
//! - **Identity**: the caller's trust domain comes from the first URI SAN of
//!   its leaf certificate
//! - **Catalog**: an immutable table mapping `relay:<trust domain>` to a list
//!   of secret values
//! - **Hybrid encryption**: a per-response AES-256-GCM key, wrapped with
//!   RSA-OAEP-SHA256 under the public key the caller submitted
//! - **Signatures**: the ciphertext is signed with a single-use RSA keypair
//!   whose public half is returned in the `X-Public-Key` header
//!
//! # Security Design
//!
//! - Secret values use [`SecretValues`] to prevent logging
//! - Symmetric keys live in `Zeroizing` buffers and never leave the process
//!   unwrapped
//! - Ephemeral keypairs are consumed by signing and never reused

pub mod catalog;
pub mod cipher;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod keys;
pub mod policy;
pub mod service;
pub mod signer;

pub use catalog::{catalog_key, CatalogError, SecretCatalog, SecretRecord, SecretValues, SeedFile};
pub use cipher::{KEY_SIZE, NONCE_SIZE};
pub use envelope::{EncryptedEnvelope, RelayResponse, PUBLIC_KEY_HEADER};
pub use error::{RelayError, RelayResult};
pub use identity::PeerIdentity;
pub use keys::{EphemeralKeyPair, FreshKeyPairs, KeyPairPool, KeyPairSource};
pub use policy::{AllowAll, Authorizer, Decision, TrustDomainAllowList};
pub use service::RelayService;
