// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;

use axum::{
	extract::DefaultBodyLimit,
	routing::{any, get},
	Router,
};
use loom_relay_config::RelayConfig;
use loom_relay_core::{
	AllowAll, Authorizer, FreshKeyPairs, KeyPairPool, KeyPairSource, RelayService, SecretCatalog,
	TrustDomainAllowList,
};
use tracing::info;

use crate::error::ServeError;
use crate::routes;

/// Default request body limit when state is built without a config.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024;

#[derive(Clone)]
pub struct AppState {
	pub service: RelayService,
	pub max_body_bytes: usize,
}

impl AppState {
	pub fn new(service: RelayService) -> Self {
		Self {
			service,
			max_body_bytes: DEFAULT_MAX_BODY_BYTES,
		}
	}
}

/// Build application state from configuration.
///
/// Loads the secret catalog and wires the configured authorizer and keypair
/// source. Must run inside a tokio runtime when a keypair pool is configured.
pub fn create_app_state(config: &RelayConfig) -> Result<AppState, ServeError> {
	let catalog = Arc::new(SecretCatalog::load(&config.catalog.seed_path)?);

	let authorizer: Arc<dyn Authorizer> = if config.authz.allows_all() {
		Arc::new(AllowAll)
	} else {
		info!(
			domains = ?config.authz.allowed_trust_domains,
			"Restricting relay to allowed trust domains"
		);
		Arc::new(TrustDomainAllowList::new(
			config.authz.allowed_trust_domains.iter().cloned(),
		))
	};

	let keys: Arc<dyn KeyPairSource> = if config.keys.pool_size > 0 {
		Arc::new(KeyPairPool::spawn(config.keys.pool_size))
	} else {
		Arc::new(FreshKeyPairs)
	};

	let service = RelayService::new(catalog)
		.with_authorizer(authorizer)
		.with_key_source(keys);

	Ok(AppState {
		service,
		max_body_bytes: config.http.max_body_bytes,
	})
}

/// Build the relay router.
///
/// `GET /health` is the liveness check; every other method on every path,
/// `/health` included, goes to the relay handler.
pub fn create_router(state: AppState) -> Router {
	let max_body_bytes = state.max_body_bytes;

	Router::new()
		.route(
			"/health",
			get(routes::health::health_check).fallback(routes::relay::relay_secret),
		)
		.route("/", any(routes::relay::relay_secret))
		.route("/{*path}", any(routes::relay::relay_secret))
		.layer(DefaultBodyLimit::max(max_body_bytes))
		.with_state(state)
}
