// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fetch a workload secret from the Loom relay.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use loom_relay_client::RelayClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Loom relay fetch - retrieves this workload's secret over mutual TLS.
#[derive(Parser, Debug)]
#[command(name = "loom-relay-fetch", about = "Fetch a secret from the Loom relay", version)]
struct Args {
	/// Relay URL
	#[arg(long, env = "LOOM_RELAY_URL", default_value = "https://localhost:8443/")]
	url: String,

	/// PEM SVID certificate chain
	#[arg(long, env = "LOOM_RELAY_CLIENT_CERT_PATH", default_value = "svid.pem")]
	cert: PathBuf,

	/// PEM SVID private key
	#[arg(long, env = "LOOM_RELAY_CLIENT_KEY_PATH", default_value = "svid_key.pem")]
	key: PathBuf,

	/// PEM trust bundle for verifying the relay
	#[arg(long, env = "LOOM_RELAY_CLIENT_BUNDLE_PATH", default_value = "bundle.pem")]
	bundle: PathBuf,

	/// Require the relay's SPIFFE ID to be in this trust domain
	#[arg(long, env = "LOOM_RELAY_SERVER_TRUST_DOMAIN")]
	server_trust_domain: Option<String>,

	/// Keep fetching every N seconds instead of exiting after one fetch
	#[arg(long, env = "LOOM_RELAY_POLL_INTERVAL_SECS")]
	interval: Option<u64>,

	/// HTTP request timeout in seconds
	#[arg(long, default_value_t = 30)]
	timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();
	let args = Args::parse();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "warn,loom_relay_client=info".into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let mut builder = RelayClient::builder()
		.url(args.url)
		.svid_files(&args.cert, &args.key, &args.bundle)
		.request_timeout(Duration::from_secs(args.timeout));
	if let Some(trust_domain) = args.server_trust_domain {
		builder = builder.server_trust_domain(trust_domain);
	}
	let client = builder.build()?;

	let Some(interval) = args.interval else {
		let values = client.fetch().await?;
		println!("{}", serde_json::to_string(&values)?);
		return Ok(());
	};

	let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
	loop {
		tokio::select! {
			_ = ticker.tick() => {
				match client.fetch().await {
					Ok(values) => println!("{}", serde_json::to_string(&values)?),
					Err(e) if e.is_transient() => {
						tracing::warn!(error = %e, "fetch failed, retrying next interval");
					}
					Err(e) => {
						tracing::error!(error = %e, "fetch failed");
					}
				}
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Received shutdown signal");
				return Ok(());
			}
		}
	}
}
