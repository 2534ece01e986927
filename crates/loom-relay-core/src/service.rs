// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Relay service tying the exchange together.
//!
//! One call to [`RelayService::handle`] runs the whole sequence for a request:
//! authenticate, authorize, resolve the secret, parse the caller's key, obtain
//! an ephemeral keypair, encrypt, sign and assemble. The secret is resolved
//! before any keypair is generated so rejected callers cost no RSA work.

use std::sync::Arc;

use tracing::{debug, error, field, info, instrument, warn, Span};

use crate::catalog::SecretCatalog;
use crate::cipher;
use crate::envelope::{self, RelayResponse};
use crate::error::{RelayError, RelayResult};
use crate::identity::PeerIdentity;
use crate::keys::{self, FreshKeyPairs, KeyPairSource};
use crate::policy::{AllowAll, Authorizer, Decision};

/// Serves relay requests against a fixed catalog.
#[derive(Clone)]
pub struct RelayService {
	catalog: Arc<SecretCatalog>,
	authorizer: Arc<dyn Authorizer>,
	keys: Arc<dyn KeyPairSource>,
}

impl RelayService {
	/// Create a service that allows every authenticated caller and generates a
	/// keypair per response.
	pub fn new(catalog: Arc<SecretCatalog>) -> Self {
		Self {
			catalog,
			authorizer: Arc::new(AllowAll),
			keys: Arc::new(FreshKeyPairs),
		}
	}

	pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
		self.authorizer = authorizer;
		self
	}

	pub fn with_key_source(mut self, keys: Arc<dyn KeyPairSource>) -> Self {
		self.keys = keys;
		self
	}

	pub fn catalog(&self) -> &SecretCatalog {
		&self.catalog
	}

	/// Establish the caller's identity and check it against the authorizer.
	pub fn authenticate<C: AsRef<[u8]>>(&self, chain: &[C]) -> RelayResult<PeerIdentity> {
		let identity = PeerIdentity::from_chain(chain)?;
		match self.authorizer.authorize(&identity) {
			Decision::Allow => Ok(identity),
			Decision::Deny(reason) => {
				debug!(identity = %identity, %reason, "authorizer denied caller");
				Err(RelayError::AccessDenied(identity.trust_domain().to_string()))
			}
		}
	}

	/// Run one relay exchange.
	///
	/// `chain` is the verified peer certificate chain (DER, leaf first) and
	/// `body` the raw request body.
	#[instrument(skip_all, fields(identity = field::Empty, trust_domain = field::Empty))]
	pub async fn handle<C>(&self, chain: &[C], body: &[u8]) -> RelayResult<RelayResponse>
	where
		C: AsRef<[u8]> + Sync,
	{
		let result = self.exchange(chain, body).await;
		if let Err(e) = &result {
			if e.is_internal() {
				error!(error = %e, status = e.status_code(), "relay exchange failed");
			} else {
				warn!(error = %e, status = e.status_code(), "relay request rejected");
			}
		}
		result
	}

	async fn exchange<C>(&self, chain: &[C], body: &[u8]) -> RelayResult<RelayResponse>
	where
		C: AsRef<[u8]> + Sync,
	{
		let identity = self.authenticate(chain)?;
		let span = Span::current();
		span.record("identity", identity.uri());
		span.record("trust_domain", identity.trust_domain());

		let record = self.catalog.lookup(identity.trust_domain())?;
		let client_key = keys::parse_client_public_key(body)?;

		let keypair = self.keys.acquire().await?;
		let server_fingerprint = keypair.fingerprint();
		let server_public_key_pem = keypair.public_key_pem()?;

		let sealed = cipher::encrypt_for(&client_key, record.value.expose())?;
		let signature = keypair.sign(&sealed.ciphertext)?;

		info!(
			secret = %record.name,
			values = record.value.len(),
			client_key = %keys::fingerprint(&client_key),
			server_key = %server_fingerprint,
			"Relayed secret"
		);

		Ok(envelope::assemble(
			&sealed.wrapped_key,
			&sealed.ciphertext,
			&signature,
			&server_public_key_pem,
		))
	}
}
