//! # CLI Interface
//!
//! Defines the command-line argument structure for `tokenforge-node` using
//! `clap` derive. Supports four subcommands: `serve`, `verify`,
//! `encode-args` and `version`.
//!
//! Every network setting falls back to an environment variable, so a
//! deployment can be configured entirely through its environment.

use clap::{ArgAction, Args, Parser, Subcommand};

use tokenforge_protocol::config::DEFAULT_CHAIN_ID;

use crate::logging::LogFormat;

/// TokenForge node.
///
/// Hosts token ledgers created through the factory, serves them over a
/// REST/WebSocket API, and submits deployed tokens to the chain's block
/// explorer for source verification.
#[derive(Parser, Debug)]
#[command(
    name = "tokenforge-node",
    about = "TokenForge token factory node",
    version,
    propagate_version = true
)]
pub struct TokenForgeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API and metrics servers.
    Serve(ServeArgs),
    /// Verify one deployed token on the block explorer and wait for the
    /// verdict.
    Verify(VerifyArgs),
    /// Print the ABI-encoded constructor arguments for a token.
    EncodeArgs(EncodeArgs),
    /// Print version information and exit.
    Version,
}

/// Which chain to talk to and how to reach its explorer.
#[derive(Args, Debug, Clone)]
pub struct NetworkArgs {
    /// EIP-155 chain id of the target network.
    #[arg(long, env = "TOKENFORGE_CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    /// API key for bscscan.com (BSC mainnet and testnet).
    #[arg(long, env = "BSCSCAN_API_KEY", hide_env_values = true)]
    pub bscscan_api_key: Option<String>,

    /// API key for etherscan.io (Ethereum mainnet and Sepolia).
    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Override the explorer API endpoint (mirrors, local test servers).
    #[arg(long, env = "TOKENFORGE_API_URL")]
    pub api_url: Option<String>,
}

/// Constructor arguments of a token, as passed on the command line.
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// Token name.
    #[arg(long)]
    pub name: String,

    /// Ticker symbol.
    #[arg(long)]
    pub symbol: String,

    /// Display decimals.
    #[arg(long, default_value_t = 18)]
    pub decimals: u8,

    /// Initial supply in base units, exactly as passed to the constructor.
    #[arg(long)]
    pub initial_supply: String,

    /// Owner address (receives the initial supply).
    #[arg(long)]
    pub owner: String,

    /// Whether the token was deployed as mintable.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub mintable: bool,

    /// Whether the token was deployed as burnable.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub burnable: bool,
}

/// Arguments for the `serve` subcommand.
#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub network: NetworkArgs,

    /// Address of the token factory this node simulates.
    #[arg(long, env = "TOKENFORGE_FACTORY_ADDRESS")]
    pub factory_address: Option<String>,

    /// Port for the REST/WebSocket API.
    #[arg(long, env = "TOKENFORGE_API_PORT", default_value_t = 8080)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TOKENFORGE_METRICS_PORT", default_value_t = 9100)]
    pub metrics_port: u16,

    /// Seconds a finished verification job stays queryable before it is
    /// forgotten.
    #[arg(long, env = "TOKENFORGE_VERIFICATION_RETENTION_SECS", default_value_t = 3600)]
    pub verification_retention_secs: u64,

    /// Log output format.
    #[arg(long, env = "TOKENFORGE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `verify` subcommand.
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Address of the deployed token.
    pub address: String,

    #[command(flatten)]
    pub token: TokenArgs,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// Log output format.
    #[arg(long, env = "TOKENFORGE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `encode-args` subcommand.
#[derive(Parser, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub token: TokenArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        TokenForgeCli::command().debug_assert();
    }

    #[test]
    fn verify_parses_positional_address_and_flags() {
        let cli = TokenForgeCli::try_parse_from([
            "tokenforge-node",
            "verify",
            "0x000000000000000000000000000000000000bEEF",
            "--name",
            "Test Token",
            "--symbol",
            "TTK",
            "--initial-supply",
            "1000000000000000000000",
            "--owner",
            "0x000000000000000000000000000000000000000A",
            "--mintable",
            "false",
            "--chain-id",
            "56",
        ])
        .unwrap();

        let Commands::Verify(args) = cli.command else {
            panic!("expected verify");
        };
        assert_eq!(args.token.decimals, 18);
        assert!(!args.token.mintable);
        assert!(args.token.burnable);
        assert_eq!(args.network.chain_id, 56);
    }
}
