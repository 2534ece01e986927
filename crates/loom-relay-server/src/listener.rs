// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mutual TLS listener.
//!
//! Terminates TLS with the relay's SVID, requires every client to present a
//! certificate chaining to the trust bundle, and serves the axum router over
//! hyper. The verified client chain is attached to every request on the
//! connection as a [`PeerCertificates`] extension.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::Request, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use loom_relay_config::TlsPaths;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::Service;
use tracing::{debug, info, warn};

use crate::error::ServeError;
use crate::extract::PeerCertificates;

/// Load SVID, key and trust bundle from disk and build the server config.
pub fn load_server_config(paths: &TlsPaths) -> Result<Arc<ServerConfig>, ServeError> {
	let chain = parse_certificates(&read_pem(&paths.cert_path)?)?;
	let key = parse_private_key(&read_pem(&paths.key_path)?)?;
	let bundle = parse_certificates(&read_pem(&paths.bundle_path)?)?;

	info!(
		cert = %paths.cert_path.display(),
		bundle = %paths.bundle_path.display(),
		chain_len = chain.len(),
		roots = bundle.len(),
		"Loaded TLS material"
	);

	build_server_config(chain, key, bundle)
}

/// Build a rustls server config that requires client certificates.
pub fn build_server_config(
	chain: Vec<CertificateDer<'static>>,
	key: PrivateKeyDer<'static>,
	bundle: Vec<CertificateDer<'static>>,
) -> Result<Arc<ServerConfig>, ServeError> {
	if chain.is_empty() {
		return Err(ServeError::Certificate("no server certificates found".into()));
	}
	if bundle.is_empty() {
		return Err(ServeError::Certificate("trust bundle is empty".into()));
	}

	let mut roots = RootCertStore::empty();
	for cert in bundle {
		roots
			.add(cert)
			.map_err(|e| ServeError::Certificate(format!("failed to add bundle certificate: {e}")))?;
	}

	let provider = Arc::new(rustls::crypto::ring::default_provider());

	let verifier = WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider.clone())
		.build()
		.map_err(|e| ServeError::Tls(format!("client verifier error: {e}")))?;

	let mut config = ServerConfig::builder_with_provider(provider)
		.with_safe_default_protocol_versions()
		.map_err(|e| ServeError::Tls(e.to_string()))?
		.with_client_cert_verifier(verifier)
		.with_single_cert(chain, key)
		.map_err(|e| ServeError::Tls(format!("server config error: {e}")))?;
	config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

	Ok(Arc::new(config))
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ServeError> {
	std::fs::read(path).map_err(|e| ServeError::ReadPem {
		path: path.to_path_buf(),
		source: e,
	})
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, ServeError> {
	CertificateDer::pem_slice_iter(pem)
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| ServeError::Certificate(format!("failed to parse certificates: {e}")))
}

fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, ServeError> {
	PrivateKeyDer::from_pem_slice(pem)
		.map_err(|e| ServeError::PrivateKey(format!("failed to parse private key: {e}")))
}

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Delay before retrying `accept` after `failures` consecutive errors.
///
/// Doubles from 10ms up to 1s so exhausted file descriptors (EMFILE) do not
/// spin the accept loop.
fn accept_backoff(failures: u32) -> Duration {
	let exponent = failures.saturating_sub(1).min(16);
	ACCEPT_BACKOFF_BASE
		.saturating_mul(1 << exponent)
		.min(ACCEPT_BACKOFF_MAX)
}

/// Accept connections until `shutdown` resolves.
///
/// Each connection runs on its own task: TLS handshake under
/// `handshake_timeout`, then HTTP/1.1 or HTTP/2 via hyper. Connections already
/// in flight are left to finish on their own.
pub async fn serve<F>(
	listener: TcpListener,
	tls: Arc<ServerConfig>,
	app: Router,
	handshake_timeout: Duration,
	shutdown: F,
) -> Result<(), ServeError>
where
	F: Future<Output = ()> + Send,
{
	let acceptor = TlsAcceptor::from(tls);
	tokio::pin!(shutdown);
	let mut accept_failures: u32 = 0;

	loop {
		let (stream, remote) = tokio::select! {
			accepted = listener.accept() => match accepted {
				Ok(conn) => {
					accept_failures = 0;
					conn
				}
				Err(e) => {
					accept_failures = accept_failures.saturating_add(1);
					let delay = accept_backoff(accept_failures);
					warn!(error = %e, failures = accept_failures, ?delay, "failed to accept connection");
					tokio::time::sleep(delay).await;
					continue;
				}
			},
			_ = &mut shutdown => {
				info!("Listener stopped accepting connections");
				return Ok(());
			}
		};

		let acceptor = acceptor.clone();
		let app = app.clone();

		tokio::spawn(async move {
			let tls_stream =
				match tokio::time::timeout(handshake_timeout, acceptor.accept(stream)).await {
					Ok(Ok(tls_stream)) => tls_stream,
					Ok(Err(e)) => {
						debug!(%remote, error = %e, "TLS handshake failed");
						return;
					}
					Err(_) => {
						debug!(%remote, "TLS handshake timed out");
						return;
					}
				};

			let peer = PeerCertificates::from_handshake(tls_stream.get_ref().1.peer_certificates());
			debug!(%remote, chain_len = peer.chain().len(), "TLS handshake complete");

			let service = hyper::service::service_fn(move |mut request: Request<Incoming>| {
				request.extensions_mut().insert(peer.clone());
				app.clone().call(request)
			});

			if let Err(e) = auto::Builder::new(TokioExecutor::new())
				.serve_connection(TokioIo::new(tls_stream), service)
				.await
			{
				debug!(%remote, error = %e, "connection closed with error");
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rcgen::{
		BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair,
		KeyUsagePurpose,
	};

	struct Material {
		chain: Vec<CertificateDer<'static>>,
		key: PrivateKeyDer<'static>,
		bundle: Vec<CertificateDer<'static>>,
	}

	fn material() -> Material {
		let ca_key = KeyPair::generate().unwrap();
		let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
		ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
		ca_params.key_usages = vec![KeyUsagePurpose::KeyCertSign];
		let ca = ca_params.self_signed(&ca_key).unwrap();

		let key = KeyPair::generate().unwrap();
		let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
		params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
		let cert = params.signed_by(&key, &ca, &ca_key).unwrap();

		Material {
			chain: parse_certificates(cert.pem().as_bytes()).unwrap(),
			key: parse_private_key(key.serialize_pem().as_bytes()).unwrap(),
			bundle: parse_certificates(ca.pem().as_bytes()).unwrap(),
		}
	}

	#[test]
	fn accept_backoff_doubles_up_to_cap() {
		assert_eq!(accept_backoff(1), Duration::from_millis(10));
		assert_eq!(accept_backoff(2), Duration::from_millis(20));
		assert_eq!(accept_backoff(4), Duration::from_millis(80));
		assert_eq!(accept_backoff(8), ACCEPT_BACKOFF_MAX);
		assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
	}

	#[test]
	fn accept_backoff_is_never_zero() {
		assert!(accept_backoff(0) >= ACCEPT_BACKOFF_BASE);
	}

	#[test]
	fn builds_config_from_pem() {
		let m = material();
		let config = build_server_config(m.chain, m.key, m.bundle).unwrap();
		assert!(config.alpn_protocols.contains(&b"http/1.1".to_vec()));
	}

	#[test]
	fn empty_bundle_is_rejected() {
		let m = material();
		let result = build_server_config(m.chain, m.key, Vec::new());
		assert!(matches!(result, Err(ServeError::Certificate(_))));
	}

	#[test]
	fn garbage_key_is_rejected() {
		let result = parse_private_key(b"-----BEGIN NOTHING-----");
		assert!(matches!(result, Err(ServeError::PrivateKey(_))));
	}

	#[test]
	fn missing_file_names_path() {
		let dir = tempfile::tempdir().unwrap();
		let paths = TlsPaths {
			cert_path: dir.path().join("svid.pem"),
			key_path: dir.path().join("svid_key.pem"),
			bundle_path: dir.path().join("bundle.pem"),
		};
		let err = load_server_config(&paths).unwrap_err();
		assert!(err.to_string().contains("svid.pem"));
	}
}
