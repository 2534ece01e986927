// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Relay client for workloads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use loom_relay_core::keys::{public_key_pem, RSA_KEY_BITS};
use loom_relay_core::{envelope, EncryptedEnvelope, PUBLIC_KEY_HEADER};
use rand::rngs::OsRng;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use rsa::RsaPrivateKey;
use tracing::{debug, info, instrument, warn};

use crate::error::{ClientError, ClientResult};
use crate::tls;

/// Content type of the request body.
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

enum Pem {
	File(PathBuf),
	Bytes(Vec<u8>),
}

impl Pem {
	fn read(&self) -> ClientResult<Vec<u8>> {
		match self {
			Pem::File(path) => std::fs::read(path).map_err(|e| ClientError::ReadPem {
				path: path.clone(),
				source: e,
			}),
			Pem::Bytes(bytes) => Ok(bytes.clone()),
		}
	}
}

/// Builder for constructing a [`RelayClient`].
pub struct RelayClientBuilder {
	url: Option<String>,
	cert: Option<Pem>,
	key: Option<Pem>,
	bundle: Option<Pem>,
	server_trust_domain: Option<String>,
	request_timeout: Duration,
}

impl RelayClientBuilder {
	pub fn new() -> Self {
		Self {
			url: None,
			cert: None,
			key: None,
			bundle: None,
			server_trust_domain: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
		}
	}

	/// Sets the relay URL.
	///
	/// Example: `https://relay.example.org:8443/`
	pub fn url(mut self, url: impl Into<String>) -> Self {
		self.url = Some(url.into());
		self
	}

	/// Loads the workload SVID, its key and the trust bundle from files, as
	/// written by the workload identity agent.
	pub fn svid_files(
		mut self,
		cert: impl AsRef<Path>,
		key: impl AsRef<Path>,
		bundle: impl AsRef<Path>,
	) -> Self {
		self.cert = Some(Pem::File(cert.as_ref().to_path_buf()));
		self.key = Some(Pem::File(key.as_ref().to_path_buf()));
		self.bundle = Some(Pem::File(bundle.as_ref().to_path_buf()));
		self
	}

	/// Uses in-memory PEM for the workload SVID, its key and the trust bundle.
	pub fn svid_pem(
		mut self,
		cert: impl Into<Vec<u8>>,
		key: impl Into<Vec<u8>>,
		bundle: impl Into<Vec<u8>>,
	) -> Self {
		self.cert = Some(Pem::Bytes(cert.into()));
		self.key = Some(Pem::Bytes(key.into()));
		self.bundle = Some(Pem::Bytes(bundle.into()));
		self
	}

	/// Only accept a relay whose SPIFFE ID belongs to this trust domain.
	pub fn server_trust_domain(mut self, trust_domain: impl Into<String>) -> Self {
		self.server_trust_domain = Some(trust_domain.into());
		self
	}

	/// Sets the HTTP request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;
		self
	}

	/// Builds the client. TLS material is read once here; a rotated SVID needs
	/// a new client.
	pub fn build(self) -> ClientResult<RelayClient> {
		let url = self.url.ok_or(ClientError::MissingUrl)?;
		let cert = self
			.cert
			.ok_or(ClientError::MissingTlsMaterial("SVID certificate"))?;
		let key = self.key.ok_or(ClientError::MissingTlsMaterial("SVID key"))?;
		let bundle = self
			.bundle
			.ok_or(ClientError::MissingTlsMaterial("trust bundle"))?;

		let chain = tls::parse_certificates(&cert.read()?)?;
		let key = tls::parse_private_key(&key.read()?)?;
		let bundle = tls::parse_certificates(&bundle.read()?)?;

		let tls_config = tls::client_config(chain, key, bundle, self.server_trust_domain)?;

		let http = Client::builder()
			.use_preconfigured_tls(tls_config)
			.timeout(self.request_timeout)
			.pool_max_idle_per_host(0)
			.user_agent(concat!("loom-relay-client/", env!("CARGO_PKG_VERSION")))
			.build()?;

		info!(url = %url, "Relay client initialized");

		Ok(RelayClient { http, url })
	}
}

impl Default for RelayClientBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Fetches the workload's secret from the relay.
///
/// # Example
///
/// ```ignore
/// use loom_relay_client::RelayClient;
///
/// let client = RelayClient::builder()
///     .url("https://relay.example.org:8443/")
///     .svid_files("/run/svid/svid.pem", "/run/svid/svid_key.pem", "/run/svid/bundle.pem")
///     .build()?;
///
/// let values = client.fetch().await?;
/// ```
#[derive(Debug, Clone)]
pub struct RelayClient {
	http: Client,
	url: String,
}

impl RelayClient {
	pub fn builder() -> RelayClientBuilder {
		RelayClientBuilder::new()
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Run one exchange and return the decrypted secret values.
	///
	/// A fresh RSA keypair is generated for every call; its private half
	/// never leaves this function.
	#[instrument(skip(self), fields(url = %self.url))]
	pub async fn fetch(&self) -> ClientResult<Vec<String>> {
		let private = tokio::task::spawn_blocking(|| RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS))
			.await
			.map_err(|e| ClientError::KeyGeneration(e.to_string()))?
			.map_err(|e| ClientError::KeyGeneration(e.to_string()))?;
		let pem = public_key_pem(&private.to_public_key())
			.map_err(|e| ClientError::KeyGeneration(e.to_string()))?;

		let response = self
			.http
			.post(&self.url)
			.header(CONTENT_TYPE, PEM_CONTENT_TYPE)
			.body(pem)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			warn!(status = status.as_u16(), message = %message.trim(), "relay rejected request");
			return Err(ClientError::ServerError {
				status: status.as_u16(),
				message: message.trim().to_string(),
			});
		}

		let public_key_header = response
			.headers()
			.get(PUBLIC_KEY_HEADER)
			.ok_or(ClientError::MissingPublicKeyHeader)?
			.to_str()
			.map_err(|_| ClientError::MissingPublicKeyHeader)?
			.to_string();

		let envelope: EncryptedEnvelope = response.json().await?;
		let values = envelope::open(&envelope, &public_key_header, &private)?;

		debug!(values = values.len(), "secret received");
		Ok(values)
	}
}
