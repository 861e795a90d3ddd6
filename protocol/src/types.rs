//! # Primitive Types
//!
//! Ethereum primitives used across TokenForge come from `alloy-primitives`.
//! This module adds the input policy layered on top: strict address parsing,
//! `parseUnits` / `formatUnits` with the precision rules wallets apply, and a
//! serde helper that carries `U256` as a plain decimal string on JSON
//! surfaces.

use alloy_primitives::utils as units;
use serde::{de, Deserialize, Deserializer, Serializer};
use thiserror::Error;

pub use alloy_primitives::{Address, B256, U256};

/// Length of an address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced when parsing an address string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string does not start with `0x`.
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),

    /// Wrong number of hex digits after the prefix.
    #[error("address must have 40 hex digits, got {0}")]
    BadLength(usize),

    /// Non-hex characters in the body.
    #[error("address contains non-hex characters: {0}")]
    NotHex(String),

    /// Mixed-case input whose casing does not match the EIP-55 checksum.
    #[error("address checksum mismatch: {0}")]
    BadChecksum(String),
}

/// Errors produced when converting between decimal strings and base units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    /// Empty input.
    #[error("amount is empty")]
    Empty,

    /// The input is not a plain decimal number.
    #[error("invalid decimal amount: {0}")]
    Invalid(String),

    /// More fractional digits than the token has decimals.
    #[error("too many decimal places: token supports {decimals}")]
    TooManyDecimals {
        /// Decimals supported by the token.
        decimals: u8,
    },

    /// The scaled value does not fit in 256 bits.
    #[error("amount does not fit in 256 bits")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Parses a `0x`-prefixed hex address.
///
/// All-lowercase and all-uppercase bodies are accepted as-is. Mixed case is
/// treated as an EIP-55 checksum and must match exactly.
///
/// # Errors
///
/// See [`AddressError`] for the individual failure modes.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .ok_or_else(|| AddressError::MissingPrefix(trimmed.to_string()))?;

    if body.len() != ADDRESS_LENGTH * 2 {
        return Err(AddressError::BadLength(body.len()));
    }

    let bytes = hex::decode(body).map_err(|_| AddressError::NotHex(trimmed.to_string()))?;

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Address::parse_checksummed(trimmed, None)
            .map_err(|_| AddressError::BadChecksum(trimmed.to_string()));
    }

    Ok(Address::from_slice(&bytes))
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Converts a human-readable decimal amount into base units.
///
/// `parse_units("1.5", 18)` is `1_500_000_000_000_000_000`. Trailing zeros
/// in the fraction are ignored before the precision check, so `"1.50"` is
/// fine for a token with one decimal. Excess precision is an error rather
/// than being truncated.
///
/// # Errors
///
/// Returns [`UnitsError::TooManyDecimals`] when the fraction is more precise
/// than the token, [`UnitsError::Overflow`] when the result exceeds 256 bits,
/// and [`UnitsError::Invalid`] for anything that is not `digits[.digits]`.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256, UnitsError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
    {
        return Err(UnitsError::Invalid(text.to_string()));
    }

    if fraction.trim_end_matches('0').len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals { decimals });
    }

    units::parse_units(text, decimals)
        .map(units::ParseUnits::get_absolute)
        .map_err(|_| UnitsError::Overflow)
}

/// Renders base units as a decimal string with `decimals` places.
///
/// Always keeps at least one fractional digit (`"1000.0"`), matching what
/// wallets and explorers display. A scale no `U256` can hold (more than 77
/// decimals) renders the raw base units.
pub fn format_units(value: U256, decimals: u8) -> String {
    let Ok(rendered) = units::format_units(value, decimals) else {
        return value.to_string();
    };

    let (whole, fraction) = rendered.split_once('.').unwrap_or((&rendered, ""));
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Serializes a `U256` as a decimal string (`"1000000000000000000000"`).
///
/// Use with `#[serde(with = "tokenforge_protocol::types::u256_decimal")]`.
/// JSON numbers lose precision past 2^53, and alloy's own serde form is hex.
pub mod u256_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str_radix(raw.trim(), 10)
            .map_err(|_| de::Error::custom(format!("invalid decimal amount: {raw}")))
    }
}
