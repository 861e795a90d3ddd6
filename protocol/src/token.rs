//! # Token Parameters
//!
//! The constructor arguments of a token, in one place. The factory consumes
//! them to build a ledger, the ledger keeps them as immutable metadata, and
//! the verification orchestrator ABI-encodes them so the explorer can rebuild
//! the exact deployment.

use alloy_sol_types::SolConstructor;
use serde::{Deserialize, Serialize};

use crate::abi::ERC20Custom;
use crate::types::{u256_decimal, Address, U256};

/// Largest `decimals` value callers are expected to use. The ledger itself
/// stores whatever it is given; enforcement happens at the API edge.
pub const MAX_DECIMALS: u8 = 18;

/// Immutable creation parameters of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenParams {
    /// Human-readable name (e.g., "Test Token").
    pub name: String,
    /// Ticker symbol (e.g., "TTK"). Not required to be unique.
    pub symbol: String,
    /// Display precision.
    pub decimals: u8,
    /// Supply minted to `owner` at construction, in base units.
    #[serde(with = "u256_decimal")]
    pub initial_supply: U256,
    /// The only address allowed to mint or burn.
    pub owner: Address,
    /// Whether `mint` is available after construction.
    pub is_mintable: bool,
    /// Whether `burn` is available after construction.
    pub is_burnable: bool,
}

impl TokenParams {
    /// The constructor call these parameters describe.
    pub fn constructor_call(&self) -> ERC20Custom::constructorCall {
        ERC20Custom::constructorCall {
            _name: self.name.clone(),
            _symbol: self.symbol.clone(),
            _decimals: self.decimals,
            _initialSupply: self.initial_supply,
            _owner: self.owner,
            _isMintable: self.is_mintable,
            _isBurnable: self.is_burnable,
        }
    }

    /// ABI-encoded constructor arguments.
    pub fn constructor_args(&self) -> Vec<u8> {
        self.constructor_call().abi_encode()
    }

    /// Hex-encoded ABI constructor arguments without a `0x` prefix, which is
    /// the shape explorers expect in `constructorArguements`.
    pub fn constructor_args_hex(&self) -> String {
        hex::encode(self.constructor_args())
    }
}
