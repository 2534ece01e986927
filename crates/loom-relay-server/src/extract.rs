// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer certificate extraction.
//!
//! The TLS listener stores the verified client chain of each connection in
//! the request extensions; handlers pull it back out with the
//! [`PeerCertificates`] extractor.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use rustls::pki_types::CertificateDer;

/// Verified client certificate chain (DER, leaf first).
///
/// Empty when the connection presented no certificate or the request did not
/// arrive through the TLS listener.
#[derive(Debug, Clone, Default)]
pub struct PeerCertificates(Arc<Vec<CertificateDer<'static>>>);

impl PeerCertificates {
	pub fn new(chain: Vec<CertificateDer<'static>>) -> Self {
		Self(Arc::new(chain))
	}

	/// Capture the chain from a completed handshake.
	pub fn from_handshake(chain: Option<&[CertificateDer<'_>]>) -> Self {
		let chain = chain
			.unwrap_or_default()
			.iter()
			.map(|cert| cert.clone().into_owned())
			.collect();
		Self::new(chain)
	}

	pub fn chain(&self) -> &[CertificateDer<'static>] {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl<S> FromRequestParts<S> for PeerCertificates
where
	S: Send + Sync,
{
	type Rejection = Infallible;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(parts
			.extensions
			.get::<PeerCertificates>()
			.cloned()
			.unwrap_or_default())
	}
}
