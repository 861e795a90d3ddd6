//! # Protocol Configuration & Constants
//!
//! Every magic number lives here: the explorer networks we know how to talk
//! to, the compiler metadata that has to match the deployed bytecode, and
//! the polling cadence for verification jobs.
//!
//! The compiler constants are not preferences. If they drift from what the
//! factory was compiled with, every verification will come back as a
//! bytecode mismatch.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{parse_address, Address};

// ---------------------------------------------------------------------------
// Chain Identifiers
// ---------------------------------------------------------------------------

/// Ethereum mainnet.
pub const CHAIN_ID_ETHEREUM: u64 = 1;

/// BNB Smart Chain mainnet.
pub const CHAIN_ID_BSC: u64 = 56;

/// BNB Smart Chain testnet. The default deployment target.
pub const CHAIN_ID_BSC_TESTNET: u64 = 97;

/// Sepolia testnet.
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;

/// Chain used when nothing else is configured.
pub const DEFAULT_CHAIN_ID: u64 = CHAIN_ID_BSC_TESTNET;

// ---------------------------------------------------------------------------
// Compiler Metadata
// ---------------------------------------------------------------------------

/// Fully-qualified name of the token contract inside the source bundle.
pub const CONTRACT_NAME: &str = "contracts/ERC20Custom.sol:ERC20Custom";

/// Exact solc build used for the deployed bytecode.
pub const COMPILER_VERSION: &str = "v0.8.28+commit.7893614a";

/// Source format submitted to the explorer.
pub const CODE_FORMAT: &str = "solidity-standard-json-input";

/// The factory is compiled without the optimizer.
pub const OPTIMIZER_ENABLED: bool = false;

/// Optimizer runs recorded in the settings even though it is disabled.
pub const OPTIMIZER_RUNS: u32 = 200;

// ---------------------------------------------------------------------------
// Verification Polling
// ---------------------------------------------------------------------------

/// Delay between a successful submission and the first status check.
pub const FIRST_POLL_DELAY: Duration = Duration::from_secs(5);

/// Delay between consecutive status checks while the job is pending.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Status checks before a pending job is declared timed out. 60 checks at
/// 10 s is roughly ten minutes, far longer than explorers normally need.
pub const MAX_STATUS_CHECKS: u32 = 60;

/// Explorer status text for a finished, successful verification.
pub const STATUS_VERIFIED: &str = "Pass - Verified";

/// Explorer status text for a job still waiting in the queue.
pub const STATUS_PENDING: &str = "Pending in queue";

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// Which explorer family issues the API key for a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiKeyKind {
    /// bscscan.com keys.
    BscScan,
    /// etherscan.io keys.
    Etherscan,
}

/// Static description of a network with a supported block explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownNetwork {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Display name.
    pub name: &'static str,
    /// Explorer web UI root.
    pub explorer_url: &'static str,
    /// Explorer API endpoint.
    pub api_url: &'static str,
    /// Which key family the API accepts.
    pub key_kind: ApiKeyKind,
}

/// Networks we can verify on.
pub const KNOWN_NETWORKS: &[KnownNetwork] = &[
    KnownNetwork {
        chain_id: CHAIN_ID_BSC_TESTNET,
        name: "BSC Testnet",
        explorer_url: "https://testnet.bscscan.com",
        api_url: "https://api-testnet.bscscan.com/api",
        key_kind: ApiKeyKind::BscScan,
    },
    KnownNetwork {
        chain_id: CHAIN_ID_BSC,
        name: "BSC Mainnet",
        explorer_url: "https://bscscan.com",
        api_url: "https://api.bscscan.com/api",
        key_kind: ApiKeyKind::BscScan,
    },
    KnownNetwork {
        chain_id: CHAIN_ID_ETHEREUM,
        name: "Ethereum Mainnet",
        explorer_url: "https://etherscan.io",
        api_url: "https://api.etherscan.io/api",
        key_kind: ApiKeyKind::Etherscan,
    },
    KnownNetwork {
        chain_id: CHAIN_ID_SEPOLIA,
        name: "Sepolia Testnet",
        explorer_url: "https://sepolia.etherscan.io",
        api_url: "https://api-sepolia.etherscan.io/api",
        key_kind: ApiKeyKind::Etherscan,
    },
];

/// Looks up a known network by chain id. We don't guess for unknown ids.
pub fn known_network(chain_id: u64) -> Option<&'static KnownNetwork> {
    KNOWN_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No explorer is known for this chain.
    #[error("network not supported for verification: chain id {0}")]
    UnsupportedChain(u64),

    /// The factory address was not configured.
    #[error("factory address is required")]
    MissingFactoryAddress,

    /// The factory address is not a valid address.
    #[error("factory address is not a valid Ethereum address: {0}")]
    InvalidFactoryAddress(String),
}

// ---------------------------------------------------------------------------
// Explorer Configuration
// ---------------------------------------------------------------------------

/// Everything needed to talk to one block explorer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Display name.
    pub name: String,
    /// Explorer web UI root.
    pub explorer_url: String,
    /// Explorer API endpoint.
    pub api_url: String,
    /// API key; `None` means verification is unavailable.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ExplorerConfig {
    /// Builds the config for a known chain, picking the matching key family.
    ///
    /// Empty keys are treated as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedChain`] for chains not in
    /// [`KNOWN_NETWORKS`].
    pub fn for_chain(
        chain_id: u64,
        bscscan_api_key: Option<&str>,
        etherscan_api_key: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let network = known_network(chain_id).ok_or(ConfigError::UnsupportedChain(chain_id))?;
        let key = match network.key_kind {
            ApiKeyKind::BscScan => bscscan_api_key,
            ApiKeyKind::Etherscan => etherscan_api_key,
        };
        Ok(Self {
            chain_id,
            name: network.name.to_string(),
            explorer_url: network.explorer_url.to_string(),
            api_url: network.api_url.to_string(),
            api_key: key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        })
    }

    /// Points the API at a different endpoint (self-hosted mirror, test server).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Explorer page for an address.
    pub fn address_url(&self, address: &Address) -> String {
        format!(
            "{}/address/{}",
            self.explorer_url.trim_end_matches('/'),
            address.to_checksum(None)
        )
    }
}

/// Validates a configured factory address the way the deployment tooling
/// does: it must be present and must parse.
///
/// # Errors
///
/// [`ConfigError::MissingFactoryAddress`] or
/// [`ConfigError::InvalidFactoryAddress`].
pub fn validate_factory_address(raw: Option<&str>) -> Result<Address, ConfigError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ConfigError::MissingFactoryAddress)?;
    parse_address(raw).map_err(|_| ConfigError::InvalidFactoryAddress(raw.to_string()))
}

/// Returns a friendly name for a chain id, mainly for logging.
pub fn network_name(chain_id: u64) -> String {
    known_network(chain_id)
        .map(|n| n.name.to_string())
        .unwrap_or_else(|| format!("unknown(chain {chain_id})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_ids_are_distinct() {
        for (i, a) in KNOWN_NETWORKS.iter().enumerate() {
            for b in &KNOWN_NETWORKS[i + 1..] {
                assert_ne!(a.chain_id, b.chain_id);
            }
        }
    }

    #[test]
    fn bsc_uses_bscscan_key() {
        let cfg = ExplorerConfig::for_chain(97, Some("bsc-key"), Some("eth-key")).unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("bsc-key"));
        assert_eq!(cfg.api_url, "https://api-testnet.bscscan.com/api");
    }

    #[test]
    fn sepolia_uses_etherscan_key() {
        let cfg = ExplorerConfig::for_chain(CHAIN_ID_SEPOLIA, Some("bsc"), None).unwrap();
        assert!(!cfg.has_api_key());
        assert_eq!(cfg.name, "Sepolia Testnet");
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cfg = ExplorerConfig::for_chain(56, Some("   "), None).unwrap();
        assert!(!cfg.has_api_key());
    }

    #[test]
    fn unknown_chain_rejected() {
        assert_eq!(
            ExplorerConfig::for_chain(31337, None, None),
            Err(ConfigError::UnsupportedChain(31337))
        );
        assert_eq!(network_name(31337), "unknown(chain 31337)");
    }

    #[test]
    fn explorer_links() {
        let cfg = ExplorerConfig::for_chain(1, None, None).unwrap();
        let addr = Address::left_padding_from(&[0xde, 0xad]);
        assert_eq!(
            cfg.address_url(&addr),
            format!("https://etherscan.io/address/{}", addr.to_checksum(None))
        );
    }

    #[test]
    fn api_key_never_serialized() {
        let cfg = ExplorerConfig::for_chain(97, Some("secret"), None).unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn factory_address_validation() {
        assert_eq!(
            validate_factory_address(None),
            Err(ConfigError::MissingFactoryAddress)
        );
        assert_eq!(
            validate_factory_address(Some("")),
            Err(ConfigError::MissingFactoryAddress)
        );
        assert!(matches!(
            validate_factory_address(Some("0x123")),
            Err(ConfigError::InvalidFactoryAddress(_))
        ));
        assert!(validate_factory_address(Some("0x000000000000000000000000000000000000dead")).is_ok());
    }

    #[test]
    fn polling_constants_sanity() {
        assert!(FIRST_POLL_DELAY < POLL_INTERVAL);
        assert!(MAX_STATUS_CHECKS > 0);
    }
}
