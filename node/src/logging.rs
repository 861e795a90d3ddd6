//! # Logging
//!
//! `tracing` setup for `tokenforge-node`. Events go to stderr, either as
//! human-readable lines with source locations or as JSON objects, so stdout
//! carries nothing but command results (`encode-args` output is piped into
//! deployment scripts).
//!
//! `RUST_LOG` replaces [`DEFAULT_DIRECTIVES`] entirely when set.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Node crates at `info`; request spans from `tower_http` at `debug`.
pub const DEFAULT_DIRECTIVES: &str =
    "tokenforge_node=info,tokenforge_protocol=info,tokenforge_contracts=info,tower_http=debug";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One line per event with file and line number.
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

/// `RUST_LOG` if it parses, otherwise [`DEFAULT_DIRECTIVES`].
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber. Call once, before the first event.
pub fn init(format: LogFormat) {
    let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(env_filter())
        .init();
}
