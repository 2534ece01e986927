// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mutual TLS HTTP server for the Loom secret relay.
//!
//! The router is plain axum and can be driven directly in tests; the
//! [`listener`] module terminates mutual TLS and feeds each request the
//! verified client chain.

pub mod api;
pub mod error;
pub mod extract;
pub mod listener;
pub mod routes;

pub use api::{create_app_state, create_router, AppState, DEFAULT_MAX_BODY_BYTES};
pub use error::{ServeError, ServerError};
pub use extract::PeerCertificates;
pub use listener::{build_server_config, load_server_config, serve};
