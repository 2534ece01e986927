// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Caller identity derived from the mutual TLS handshake.
//!
//! Workloads present an X.509 SVID whose first URI subject alternative name is
//! their SPIFFE ID, e.g. `spiffe://example.org/workload/edge-store`. The
//! authority segment of that URI is the trust domain, which partitions the
//! secret catalog.

use std::fmt;

use x509_parser::prelude::{FromDer, GeneralName, X509Certificate};

use crate::error::{RelayError, RelayResult};

/// Identity of the workload on the other end of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
	uri: String,
	trust_domain: String,
}

impl PeerIdentity {
	/// Build an identity from a SPIFFE-style URI.
	///
	/// The URI is split on `/`; the third segment is the trust domain. Nothing
	/// else about the URI is validated.
	pub fn from_uri(uri: &str) -> RelayResult<Self> {
		let parts: Vec<&str> = uri.split('/').collect();
		if parts.len() < 3 {
			return Err(RelayError::InvalidIdentity(uri.to_string()));
		}

		Ok(Self {
			uri: uri.to_string(),
			trust_domain: parts[2].to_string(),
		})
	}

	/// Extract the identity from a verified peer certificate chain (DER).
	///
	/// Only the leaf certificate is inspected, and only its first URI SAN.
	pub fn from_chain<C: AsRef<[u8]>>(chain: &[C]) -> RelayResult<Self> {
		let leaf = chain.first().ok_or(RelayError::MissingCertificate)?;
		let uri = first_uri_san(leaf.as_ref())?;
		Self::from_uri(&uri)
	}

	/// The full identity URI.
	pub fn uri(&self) -> &str {
		&self.uri
	}

	/// The authority segment of the identity URI.
	pub fn trust_domain(&self) -> &str {
		&self.trust_domain
	}
}

impl fmt::Display for PeerIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.uri)
	}
}

fn first_uri_san(der: &[u8]) -> RelayResult<String> {
	let (_, cert) = X509Certificate::from_der(der)
		.map_err(|e| RelayError::InvalidCertificate(format!("failed to parse certificate: {e}")))?;

	let san = cert
		.subject_alternative_name()
		.map_err(|e| RelayError::InvalidCertificate(format!("malformed SAN extension: {e}")))?
		.ok_or_else(|| RelayError::InvalidCertificate("certificate has no SAN extension".into()))?;

	san.value
		.general_names
		.iter()
		.find_map(|name| match name {
			GeneralName::URI(uri) => Some(uri.to_string()),
			_ => None,
		})
		.ok_or_else(|| RelayError::InvalidCertificate("certificate has no URI SAN".into()))
}
