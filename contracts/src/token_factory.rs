//! # Token Factory Contract
//!
//! Creates [`TokenLedger`] instances. Any caller can create a token by
//! supplying its parameters; the factory keeps no list of what it created
//! and reports each creation through a [`TokenCreated`] event.
//!
//! ## Addressing
//!
//! Every new ledger gets the EVM `CREATE` address the factory contract would
//! produce: `keccak256(rlp([factory, account_nonce]))[12..]`. Contract
//! accounts start at account nonce 1, so the n-th token (counting from zero)
//! uses account nonce `n + 1`. The creation count is incremented only after a
//! successful creation, so addresses are deterministic, unique per factory
//! and never reused.
//!
//! ## Validation
//!
//! None on `name`, `symbol` or `decimals`. Range checks belong to whoever
//! collects the parameters. Creation fails only when the nonce space is
//! exhausted or the initial mint reverts (zero owner).

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use tokenforge_protocol::types::Address;
use tokenforge_protocol::TokenParams;

use crate::erc20::{LedgerError, TokenLedger};
use crate::events::{Log, TokenCreated};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while creating a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The factory has handed out every address it can derive.
    #[error("factory nonce exhausted")]
    NonceExhausted,

    /// The new ledger's construction reverted.
    #[error("token construction failed: {0}")]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Result of a successful [`TokenFactory::create_token`].
#[derive(Debug, Clone)]
pub struct CreatedToken {
    /// The new ledger, already holding the initial supply.
    pub ledger: TokenLedger,
    /// The creation record.
    pub event: TokenCreated,
    /// Receipt logs: the initial-mint `Transfer` from the ledger, then the
    /// factory's `TokenCreated`.
    pub logs: Vec<Log>,
}

/// The token factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenFactory {
    address: Address,
    nonce: u64,
}

impl TokenFactory {
    /// Creates a factory deployed at `address` that has not created anything.
    pub fn new(address: Address) -> Self {
        Self::with_nonce(address, 0)
    }

    /// Resumes a factory that has already created `nonce` tokens.
    pub fn with_nonce(address: Address, nonce: u64) -> Self {
        Self { address, nonce }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Number of tokens created so far.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Address the next successful creation will receive.
    pub fn next_address(&self) -> Address {
        derive_address(&self.address, self.nonce)
    }

    /// Creates a token and performs its initial mint in one step.
    ///
    /// # Errors
    ///
    /// [`FactoryError::Ledger`] if construction reverts,
    /// [`FactoryError::NonceExhausted`] if no more addresses can be derived.
    /// The nonce is unchanged on failure.
    pub fn create_token(&mut self, params: TokenParams) -> Result<CreatedToken, FactoryError> {
        let next_nonce = self
            .nonce
            .checked_add(1)
            .ok_or(FactoryError::NonceExhausted)?;
        let token = self.next_address();

        let (ledger, mint_events) = TokenLedger::new(token, params)?;
        self.nonce = next_nonce;

        let event = TokenCreated {
            token,
            owner: ledger.owner(),
            name: ledger.name().to_string(),
            symbol: ledger.symbol().to_string(),
            decimals: ledger.decimals(),
            initial_supply: ledger.total_supply(),
        };

        let mut logs: Vec<Log> = mint_events.iter().map(|e| e.to_log(token)).collect();
        logs.push(event.to_log(self.address));

        info!(
            token = ?token,
            owner = ?event.owner,
            symbol = %event.symbol,
            supply = %event.initial_supply,
            "token created"
        );

        Ok(CreatedToken { ledger, event, logs })
    }
}

/// `CREATE` address for the token created after `created` earlier ones.
fn derive_address(factory: &Address, created: u64) -> Address {
    factory.create(created.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::token_address_from_logs;
    use tokenforge_protocol::types::U256;

    fn params(symbol: &str) -> TokenParams {
        TokenParams {
            name: format!("{symbol} Token"),
            symbol: symbol.into(),
            decimals: 18,
            initial_supply: U256::from(10u64).pow(U256::from(21u64)),
            owner: Address::with_last_byte(0x0a),
            is_mintable: true,
            is_burnable: true,
        }
    }

    fn factory() -> TokenFactory {
        TokenFactory::new(Address::with_last_byte(0xf0))
    }

    #[test]
    fn create_token_assigns_unique_addresses() {
        let mut f = factory();
        let a = f.create_token(params("AAA")).unwrap();
        let b = f.create_token(params("AAA")).unwrap();
        assert_ne!(a.ledger.address(), b.ledger.address());
        assert_eq!(f.nonce(), 2);
    }

    #[test]
    fn addresses_are_deterministic() {
        let mut f1 = factory();
        let mut f2 = factory();
        assert_eq!(
            f1.create_token(params("X")).unwrap().ledger.address(),
            f2.create_token(params("Y")).unwrap().ledger.address()
        );
    }

    #[test]
    fn addresses_follow_contract_create_nonces() {
        let mut f = factory();
        assert_eq!(f.next_address(), f.address().create(1));
        f.create_token(params("ONE")).unwrap();
        assert_eq!(f.next_address(), f.address().create(2));
    }

    #[test]
    fn next_address_predicts_creation() {
        let mut f = factory();
        let predicted = f.next_address();
        assert_eq!(f.create_token(params("P")).unwrap().event.token, predicted);
    }

    #[test]
    fn failed_creation_keeps_nonce() {
        let mut f = factory();
        let bad = TokenParams {
            owner: Address::ZERO,
            ..params("BAD")
        };
        let err = f.create_token(bad).unwrap_err();
        assert!(matches!(err, FactoryError::Ledger(LedgerError::InvalidOperation(_))));
        assert_eq!(f.nonce(), 0);
    }

    #[test]
    fn exhausted_nonce_rejected() {
        let mut f = TokenFactory::with_nonce(Address::with_last_byte(1), u64::MAX);
        assert_eq!(
            f.create_token(params("Z")).unwrap_err(),
            FactoryError::NonceExhausted
        );
    }

    #[test]
    fn logs_lead_back_to_token() {
        let mut f = factory();
        let created = f.create_token(params("LOG")).unwrap();
        assert_eq!(created.logs.len(), 2);
        assert_eq!(created.logs[0].address, created.ledger.address());
        assert_eq!(created.logs[1].address, f.address());
        assert_eq!(
            token_address_from_logs(&created.logs),
            Some(created.ledger.address())
        );
    }

    #[test]
    fn decimals_are_not_range_checked() {
        let mut f = factory();
        let p = TokenParams {
            decimals: 77,
            ..params("ODD")
        };
        assert_eq!(f.create_token(p).unwrap().ledger.decimals(), 77);
    }

    #[test]
    fn event_mirrors_params() {
        let mut f = factory();
        let created = f.create_token(params("EVT")).unwrap();
        assert_eq!(created.event.name, "EVT Token");
        assert_eq!(created.event.symbol, "EVT");
        assert_eq!(created.event.decimals, 18);
        assert_eq!(created.event.initial_supply, params("EVT").initial_supply);
        assert_eq!(created.event.owner, Address::with_last_byte(0x0a));
    }
}
