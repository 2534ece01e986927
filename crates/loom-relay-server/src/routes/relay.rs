// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret relay route.
//!
//! Endpoints:
//! - `POST /` (any path, any method) - Exchange a PEM public key for the
//!   caller's encrypted, signed secret

use axum::{
	extract::{rejection::BytesRejection, State},
	http::{Method, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use bytes::Bytes;
use loom_relay_core::PUBLIC_KEY_HEADER;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::api::AppState;
use crate::error::ServerError;
use crate::extract::PeerCertificates;

#[instrument(
	skip_all,
	fields(request_id = %Uuid::new_v4(), method = %method)
)]
pub async fn relay_secret(
	State(state): State<AppState>,
	method: Method,
	peer: PeerCertificates,
	body: Result<Bytes, BytesRejection>,
) -> Result<Response, ServerError> {
	let body = body.map_err(|e| {
		warn!(error = %e, "failed to read request body");
		ServerError::Body(e.body_text())
	})?;

	debug!(
		chain_len = peer.chain().len(),
		body_len = body.len(),
		"relay request received"
	);

	let response = state.service.handle(peer.chain(), &body).await?;

	Ok((
		StatusCode::OK,
		[(PUBLIC_KEY_HEADER, response.public_key_header)],
		Json(response.envelope),
	)
		.into_response())
}
