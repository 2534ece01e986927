// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access control for relay callers.
//!
//! Authorization runs after the caller's identity is established and before
//! the catalog is consulted. The default policy allows every authenticated
//! caller; the catalog itself already limits a caller to its own trust
//! domain's secret.

use std::collections::HashSet;

use crate::identity::PeerIdentity;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
	Allow,
	Deny(String),
}

/// Decides whether an authenticated peer may receive its secret.
pub trait Authorizer: Send + Sync {
	fn authorize(&self, identity: &PeerIdentity) -> Decision;
}

/// Allows every authenticated peer.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
	fn authorize(&self, _identity: &PeerIdentity) -> Decision {
		Decision::Allow
	}
}

/// Allows peers whose trust domain is on a fixed list.
#[derive(Debug, Clone)]
pub struct TrustDomainAllowList {
	domains: HashSet<String>,
}

impl TrustDomainAllowList {
	pub fn new<I, S>(domains: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			domains: domains.into_iter().map(Into::into).collect(),
		}
	}

	pub fn contains(&self, trust_domain: &str) -> bool {
		self.domains.contains(trust_domain)
	}
}

impl Authorizer for TrustDomainAllowList {
	fn authorize(&self, identity: &PeerIdentity) -> Decision {
		if self.contains(identity.trust_domain()) {
			Decision::Allow
		} else {
			Decision::Deny(format!(
				"trust domain {} is not on the allow list",
				identity.trust_domain()
			))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity(uri: &str) -> PeerIdentity {
		PeerIdentity::from_uri(uri).unwrap()
	}

	#[test]
	fn allow_all_allows() {
		assert_eq!(
			AllowAll.authorize(&identity("spiffe://anything.test/w")),
			Decision::Allow
		);
	}

	#[test]
	fn allow_list_allows_listed_domain() {
		let policy = TrustDomainAllowList::new(["example.org", "partner.org"]);
		assert_eq!(
			policy.authorize(&identity("spiffe://partner.org/workload")),
			Decision::Allow
		);
	}

	#[test]
	fn allow_list_denies_unlisted_domain() {
		let policy = TrustDomainAllowList::new(["example.org"]);
		let decision = policy.authorize(&identity("spiffe://other.org/workload"));
		assert!(matches!(decision, Decision::Deny(reason) if reason.contains("other.org")));
	}

	#[test]
	fn allow_list_is_exact() {
		let policy = TrustDomainAllowList::new(["example.org"]);
		assert!(!policy.contains("sub.example.org"));
		assert!(!policy.contains("Example.org"));
	}
}
