// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health check route.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub secrets: usize,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok",
		secrets: state.service.catalog().len(),
	})
}
