//! # Node Configuration
//!
//! Turns parsed CLI arguments into validated settings. Everything that can
//! be wrong with the environment is caught here, before any port is bound.

use std::time::Duration;

use tokenforge_protocol::config::{validate_factory_address, ConfigError, ExplorerConfig};
use tokenforge_protocol::types::{parse_address, Address, U256};
use tokenforge_protocol::TokenParams;

use crate::cli::{NetworkArgs, ServeArgs, TokenArgs};

/// Validated settings for `serve`.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub factory_address: Address,
    pub explorer: ExplorerConfig,
    pub api_port: u16,
    pub metrics_port: u16,
    /// How long finished verification jobs remain queryable.
    pub verification_retention: Duration,
}

impl NodeConfig {
    /// Checks the factory address and resolves the explorer for the chain.
    ///
    /// # Errors
    ///
    /// A [`ConfigError`] describing the first problem found.
    pub fn validate(args: &ServeArgs) -> Result<Self, ConfigError> {
        let factory_address = validate_factory_address(args.factory_address.as_deref())?;
        let explorer = explorer_config(&args.network)?;
        Ok(Self {
            factory_address,
            explorer,
            api_port: args.api_port,
            metrics_port: args.metrics_port,
            verification_retention: Duration::from_secs(args.verification_retention_secs),
        })
    }
}

/// Resolves the explorer for the configured chain, applying the API URL
/// override if one was given.
pub fn explorer_config(args: &NetworkArgs) -> Result<ExplorerConfig, ConfigError> {
    let explorer = ExplorerConfig::for_chain(
        args.chain_id,
        args.bscscan_api_key.as_deref(),
        args.etherscan_api_key.as_deref(),
    )?;
    Ok(match args.api_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => explorer.with_api_url(url),
        _ => explorer,
    })
}

/// Builds constructor arguments from the command line.
pub fn token_params(args: &TokenArgs) -> anyhow::Result<TokenParams> {
    let supply = args.initial_supply.trim();
    let initial_supply = Some(supply)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| U256::from_str_radix(s, 10).ok())
        .ok_or_else(|| {
            anyhow::anyhow!("initial supply must be a base-unit integer, got {:?}", args.initial_supply)
        })?;
    let owner = parse_address(&args.owner)
        .map_err(|e| anyhow::anyhow!("invalid owner address {:?}: {e}", args.owner))?;

    Ok(TokenParams {
        name: args.name.clone(),
        symbol: args.symbol.clone(),
        decimals: args.decimals,
        initial_supply,
        owner,
        is_mintable: args.mintable,
        is_burnable: args.burnable,
    })
}
