// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client side of the mutual TLS handshake.
//!
//! The relay is authenticated the SPIFFE way: its chain must verify against
//! the trust bundle and its leaf must carry a SPIFFE ID, optionally from an
//! expected trust domain. DNS names on the certificate are not consulted.

use std::sync::Arc;

use loom_relay_core::PeerIdentity;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

pub(crate) fn parse_certificates(pem: &[u8]) -> ClientResult<Vec<CertificateDer<'static>>> {
	let certs = CertificateDer::pem_slice_iter(pem)
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| ClientError::Tls(format!("failed to parse certificates: {e}")))?;
	if certs.is_empty() {
		return Err(ClientError::Tls("no certificates found in PEM".into()));
	}
	Ok(certs)
}

pub(crate) fn parse_private_key(pem: &[u8]) -> ClientResult<PrivateKeyDer<'static>> {
	PrivateKeyDer::from_pem_slice(pem)
		.map_err(|e| ClientError::Tls(format!("failed to parse private key: {e}")))
}

/// Build a rustls client config presenting the workload SVID.
pub(crate) fn client_config(
	chain: Vec<CertificateDer<'static>>,
	key: PrivateKeyDer<'static>,
	bundle: Vec<CertificateDer<'static>>,
	server_trust_domain: Option<String>,
) -> ClientResult<ClientConfig> {
	let mut roots = RootCertStore::empty();
	for cert in bundle {
		roots
			.add(cert)
			.map_err(|e| ClientError::Tls(format!("failed to add bundle certificate: {e}")))?;
	}

	let provider = Arc::new(rustls::crypto::ring::default_provider());
	let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
		.build()
		.map_err(|e| ClientError::Tls(format!("server verifier error: {e}")))?;

	let verifier = SpiffeServerVerifier {
		inner,
		trust_domain: server_trust_domain,
	};

	let mut config = ClientConfig::builder_with_provider(provider)
		.with_safe_default_protocol_versions()
		.map_err(|e| ClientError::Tls(e.to_string()))?
		.dangerous()
		.with_custom_certificate_verifier(Arc::new(verifier))
		.with_client_auth_cert(chain, key)
		.map_err(|e| ClientError::Tls(format!("client identity error: {e}")))?;
	config.alpn_protocols = vec![b"http/1.1".to_vec()];

	Ok(config)
}

/// Verifies the relay's chain against the trust bundle and authorizes it by
/// SPIFFE ID instead of hostname.
#[derive(Debug)]
struct SpiffeServerVerifier {
	inner: Arc<WebPkiServerVerifier>,
	trust_domain: Option<String>,
}

impl ServerCertVerifier for SpiffeServerVerifier {
	fn verify_server_cert(
		&self,
		end_entity: &CertificateDer<'_>,
		intermediates: &[CertificateDer<'_>],
		server_name: &ServerName<'_>,
		ocsp_response: &[u8],
		now: UnixTime,
	) -> Result<ServerCertVerified, rustls::Error> {
		match self
			.inner
			.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
		{
			Ok(_) => {}
			// SVIDs are authorized by SPIFFE ID below; DNS names do not apply.
			Err(rustls::Error::InvalidCertificate(
				CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
			)) => {}
			Err(e) => return Err(e),
		}

		let identity = PeerIdentity::from_chain(&[end_entity.as_ref()]).map_err(|e| {
			debug!(error = %e, "relay certificate has no usable SPIFFE ID");
			rustls::Error::InvalidCertificate(CertificateError::ApplicationVerificationFailure)
		})?;

		if let Some(expected) = &self.trust_domain {
			if identity.trust_domain() != expected {
				debug!(
					identity = %identity,
					expected = %expected,
					"relay is in an unexpected trust domain"
				);
				return Err(rustls::Error::InvalidCertificate(
					CertificateError::ApplicationVerificationFailure,
				));
			}
		}

		debug!(identity = %identity, "relay identity verified");
		Ok(ServerCertVerified::assertion())
	}

	fn verify_tls12_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		self.inner.verify_tls12_signature(message, cert, dss)
	}

	fn verify_tls13_signature(
		&self,
		message: &[u8],
		cert: &CertificateDer<'_>,
		dss: &DigitallySignedStruct,
	) -> Result<HandshakeSignatureValid, rustls::Error> {
		self.inner.verify_tls13_signature(message, cert, dss)
	}

	fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
		self.inner.supported_verify_schemes()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_pem_has_no_certificates() {
		assert!(matches!(parse_certificates(b""), Err(ClientError::Tls(_))));
	}

	#[test]
	fn unparseable_key_is_rejected() {
		assert!(matches!(
			parse_private_key(b"not a key"),
			Err(ClientError::Tls(_))
		));
	}
}
