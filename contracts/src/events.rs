//! # Ledger Events
//!
//! Notifications produced by ledger and factory operations. Every mutating
//! call returns the events it produced, in order; nothing is published
//! behind the caller's back.
//!
//! Events can be rendered as EVM logs ([`Log`]) with the same topic layout
//! the deployed contracts use, which is what a receipt consumer (for
//! example a UI looking for the new token's address) works with.

use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};

use tokenforge_protocol::abi;
use tokenforge_protocol::types::{u256_decimal, Address, U256};

/// An EVM log entry: emitting contract, topics and ABI-encoded data.
pub use alloy_primitives::Log;

// ---------------------------------------------------------------------------
// Ledger Events
// ---------------------------------------------------------------------------

/// A notification from a [`TokenLedger`](crate::TokenLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Tokens moved. `from` is zero for mints, `to` is zero for burns.
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "u256_decimal")]
        value: U256,
    },
    /// An allowance was set to an absolute value.
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "u256_decimal")]
        value: U256,
    },
}

impl LedgerEvent {
    /// Renders the event as the log the deployed token would emit.
    pub fn to_log(&self, token: Address) -> Log {
        let data = match *self {
            LedgerEvent::Transfer { from, to, value } => {
                abi::Transfer { from, to, value }.encode_log_data()
            }
            LedgerEvent::Approval {
                owner,
                spender,
                value,
            } => abi::Approval {
                owner,
                spender,
                value,
            }
            .encode_log_data(),
        };
        Log {
            address: token,
            data,
        }
    }
}

/// Emitted once per successful `create_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCreated {
    pub token: Address,
    pub owner: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(with = "u256_decimal")]
    pub initial_supply: U256,
}

impl TokenCreated {
    /// Renders the event as the factory's log. `token` and `owner` are
    /// indexed; the rest is ABI-encoded into `data`.
    pub fn to_log(&self, factory: Address) -> Log {
        let data = abi::TokenCreated {
            tokenAddress: self.token,
            owner: self.owner,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            initialSupply: self.initial_supply,
        }
        .encode_log_data();
        Log {
            address: factory,
            data,
        }
    }
}

/// Finds the `TokenCreated` log and returns the new token's address.
///
/// Logs with another `topics[0]`, or that fail to decode, are skipped.
pub fn token_address_from_logs(logs: &[Log]) -> Option<Address> {
    logs.iter()
        .filter(|log| log.topics().first() == Some(&abi::TokenCreated::SIGNATURE_HASH))
        .find_map(|log| abi::TokenCreated::decode_log_data(&log.data, true).ok())
        .map(|event| event.tokenAddress)
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Somewhere to put ledger events.
pub trait EventSink {
    fn emit(&mut self, event: LedgerEvent);

    fn emit_all(&mut self, events: Vec<LedgerEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

impl EventSink for Vec<LedgerEvent> {
    fn emit(&mut self, event: LedgerEvent) {
        self.push(event);
    }
}
