// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Workload client for the Loom secret relay.
//!
//! Presents the workload's SVID over mutual TLS, sends a single-use RSA
//! public key and opens the signed, encrypted envelope the relay returns.

mod client;
mod error;
mod tls;

pub use client::{RelayClient, RelayClientBuilder, PEM_CONTENT_TYPE};
pub use error::{ClientError, ClientResult};
