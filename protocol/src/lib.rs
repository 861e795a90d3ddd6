// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # TokenForge Protocol Core Library
//!
//! Everything the token factory needs that is not the ledger itself: the
//! Ethereum primitives, the contract ABI that turns constructor
//! parameters into the bytes an explorer expects, the network table, and the
//! orchestrator that drives a block-explorer source verification to a
//! terminal state.
//!
//! ## Architecture
//!
//! - **types**: Addresses, 256-bit amounts, EIP-55 checksums, unit parsing.
//! - **abi**: `sol!` declarations of the token constructor and its events.
//! - **token**: The constructor-argument record shared by every component.
//! - **config**: Explorer networks, compiler metadata, polling defaults.
//! - **verification**: Submit source to an explorer, poll until it decides.
//!
//! ## Design Philosophy
//!
//! 1. Amounts are `U256` end to end. No floats and no wrapping arithmetic.
//! 2. Anything sent to an explorer is byte-for-byte what the explorer wants,
//!    typos in field names included.
//! 3. Async code never blocks the caller and can always be cancelled.

pub mod abi;
pub mod config;
pub mod token;
pub mod types;
pub mod verification;

pub use token::TokenParams;
pub use types::{Address, B256, U256};
