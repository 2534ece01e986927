// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for loom-relay.

pub mod authz;
pub mod catalog;
pub mod http;
pub mod keys;
pub mod logging;
pub mod tls;

pub use authz::{AuthzConfig, AuthzConfigLayer};
pub use catalog::{CatalogConfig, CatalogConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use keys::{KeysConfig, KeysConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use tls::{TlsConfig, TlsConfigLayer, TlsPaths};
