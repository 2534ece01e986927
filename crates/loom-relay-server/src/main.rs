// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loom secret relay binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use loom_relay_config::{LogFormat, RelayConfig};
use loom_relay_server::{create_app_state, create_router, load_server_config, serve};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod version;

/// Loom relay - serves secrets to SPIFFE workloads over mutual TLS.
#[derive(Parser, Debug)]
#[command(name = "loom-relay", about = "Loom secret relay", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/loom/relay.toml)
	#[arg(long, global = true, env = "LOOM_RELAY_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Serve the relay (default)
	Serve,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => loom_relay_config::load_config_with_file(path)?,
		None => loom_relay_config::load_config()?,
	};

	init_tracing(&config);

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		seed = %config.catalog.seed_path.display(),
		"starting loom-relay"
	);

	let tls_paths = config.tls.require_paths()?;
	let tls = load_server_config(&tls_paths)?;

	let state = create_app_state(&config)?;

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	tracing::info!("listening on {}", addr);

	serve(
		listener,
		tls,
		app,
		Duration::from_secs(config.tls.handshake_timeout_secs),
		async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "Failed to listen for shutdown signal");
				std::future::pending::<()>().await;
			}
			tracing::info!("Received shutdown signal");
		},
	)
	.await?;

	tracing::info!("Server shutdown complete");
	Ok(())
}

fn init_tracing(config: &RelayConfig) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| config.logging.level.clone().into());

	let (json, text) = match config.logging.format {
		LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
		LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer())),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(json)
		.with(text)
		.init();
}
