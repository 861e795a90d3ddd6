// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TokenForge Node
//!
//! Entry point for the `tokenforge-node` binary. Parses CLI arguments,
//! initializes logging and metrics, hosts the token factory behind the
//! HTTP/WS API, and drives explorer verification.
//!
//! The binary supports four subcommands:
//!
//! - `serve`       : run the API and metrics servers
//! - `verify`      : verify one deployed token and wait for the verdict
//! - `encode-args` : print ABI-encoded constructor arguments
//! - `version`     : print build version information

mod api;
mod chain;
mod cli;
mod config;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;

use tokenforge_protocol::config::COMPILER_VERSION;
use tokenforge_protocol::types::parse_address;
use tokenforge_protocol::verification::{HttpVerifier, VerificationOrchestrator};

use cli::{Commands, TokenForgeCli};
use config::NodeConfig;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TokenForgeCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Verify(args) => verify_token(args).await,
        Commands::EncodeArgs(args) => encode_args(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Runs the node: API server, metrics endpoint, and verification jobs.
async fn serve(args: cli::ServeArgs) -> Result<()> {
    logging::init(args.log_format);

    let config = NodeConfig::validate(&args).context("invalid configuration")?;

    tracing::info!(
        api_port = config.api_port,
        metrics_port = config.metrics_port,
        retention_secs = config.verification_retention.as_secs(),
        chain_id = config.explorer.chain_id,
        network = %config.explorer.name,
        factory = %config.factory_address.to_checksum(None),
        "starting tokenforge-node"
    );
    if !config.explorer.has_api_key() {
        tracing::warn!(
            network = %config.explorer.name,
            "no explorer API key configured, verification requests will be refused"
        );
    }

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new());

    // --- Verification ---
    let http_verifier = HttpVerifier::new(config.explorer.api_url.clone())
        .context("failed to build explorer client")?;
    tracing::info!(api = %http_verifier.api_url(), "explorer client ready");
    let verifier = Arc::new(VerificationOrchestrator::new(
        Arc::new(http_verifier),
        config.explorer.clone(),
    ));

    // --- Application state ---
    let app_state = api::AppState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        config.factory_address,
        verifier,
        Arc::clone(&node_metrics),
    )
    .with_verification_retention(config.verification_retention);

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", config.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", config.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    // Dropping the handles cancels any job still polling.
    let pending = app_state.verifications.len();
    app_state.verifications.clear();
    tracing::info!(verifications = pending, "tokenforge-node stopped");
    Ok(())
}

/// Verifies one token and blocks until the explorer gives a verdict.
///
/// Ctrl+C cancels the job, including a request still in flight.
async fn verify_token(args: cli::VerifyArgs) -> Result<()> {
    logging::init(args.log_format);

    let address = parse_address(&args.address)
        .with_context(|| format!("invalid contract address {:?}", args.address))?;
    let params = config::token_params(&args.token)?;
    let explorer = config::explorer_config(&args.network).context("invalid network")?;

    let http_verifier =
        HttpVerifier::new(explorer.api_url.clone()).context("failed to build explorer client")?;

    tracing::info!(
        address = %address.to_checksum(None),
        network = %explorer.name,
        api = %http_verifier.api_url(),
        args = %params.constructor_args_hex(),
        "verifying contract"
    );

    let orchestrator = VerificationOrchestrator::new(Arc::new(http_verifier), explorer.clone());
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("interrupted, cancelling verification");
        let _ = cancel_tx.send(true);
    });

    let outcome = orchestrator.verify(address, params, cancel_rx).await;
    interrupt.abort();

    let job = outcome.context("verification failed")?;
    println!("Contract verified.");
    println!("  Address     : {}", job.contract_address.to_checksum(None));
    println!("  Network     : {}", explorer.name);
    println!("  Checks      : {}", job.status_checks);
    println!("  Explorer    : {}", explorer.address_url(&job.contract_address));
    Ok(())
}

/// Prints the ABI-encoded constructor arguments, unprefixed, on stdout.
fn encode_args(args: cli::EncodeArgs) -> Result<()> {
    let params = config::token_params(&args.token)?;
    println!("{}", params.constructor_args_hex());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("tokenforge-node {}", env!("CARGO_PKG_VERSION"));
    println!("solc            {}", COMPILER_VERSION);
    println!("rustc           {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported. If a handler cannot be
/// installed the corresponding branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
