//! # Chain State
//!
//! The node's in-process stand-in for the chain: one factory and every
//! ledger it has created. The API wraps it in a single
//! `parking_lot::RwLock`; taking the write lock is what serializes
//! operations on a ledger.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use tokenforge_contracts::{FactoryError, LedgerError, LedgerEvent, Log, TokenCreated, TokenFactory, TokenLedger};
use tokenforge_protocol::types::{Address, U256};
use tokenforge_protocol::TokenParams;

/// Errors from [`ChainState`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// No ledger lives at this address.
    #[error("unknown token: {0:?}")]
    UnknownToken(Address),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A state-changing call on one ledger. `caller` is the address the wallet
/// signs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOp {
    Transfer {
        caller: Address,
        to: Address,
        amount: U256,
    },
    Approve {
        caller: Address,
        spender: Address,
        amount: U256,
    },
    TransferFrom {
        caller: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    Mint {
        caller: Address,
        to: Address,
        amount: U256,
    },
    Burn {
        caller: Address,
        from: Address,
        amount: U256,
    },
}

impl LedgerOp {
    /// Short name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerOp::Transfer { .. } => "transfer",
            LedgerOp::Approve { .. } => "approve",
            LedgerOp::TransferFrom { .. } => "transfer_from",
            LedgerOp::Mint { .. } => "mint",
            LedgerOp::Burn { .. } => "burn",
        }
    }
}

/// What a creation returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct CreationReceipt {
    pub token: Address,
    pub event: TokenCreated,
    pub logs: Vec<Log>,
}

/// The factory plus every ledger it created.
#[derive(Debug)]
pub struct ChainState {
    factory: TokenFactory,
    tokens: HashMap<Address, TokenLedger>,
}

impl ChainState {
    pub fn new(factory_address: Address) -> Self {
        Self {
            factory: TokenFactory::new(factory_address),
            tokens: HashMap::new(),
        }
    }

    pub fn factory(&self) -> &TokenFactory {
        &self.factory
    }

    /// Number of hosted ledgers.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, address: &Address) -> Option<&TokenLedger> {
        self.tokens.get(address)
    }

    /// Creates a token through the factory and starts hosting its ledger.
    pub fn create_token(&mut self, params: TokenParams) -> Result<CreationReceipt, ChainError> {
        let created = self.factory.create_token(params)?;
        let token = created.ledger.address();
        self.tokens.insert(token, created.ledger);
        Ok(CreationReceipt {
            token,
            event: created.event,
            logs: created.logs,
        })
    }

    /// Applies one operation to the ledger at `token`.
    pub fn apply(&mut self, token: &Address, op: &LedgerOp) -> Result<Vec<LedgerEvent>, ChainError> {
        let ledger = self
            .tokens
            .get_mut(token)
            .ok_or(ChainError::UnknownToken(*token))?;

        let events = match *op {
            LedgerOp::Transfer { caller, to, amount } => ledger.transfer(caller, to, amount)?,
            LedgerOp::Approve {
                caller,
                spender,
                amount,
            } => ledger.approve(caller, spender, amount)?,
            LedgerOp::TransferFrom {
                caller,
                from,
                to,
                amount,
            } => ledger.transfer_from(caller, from, to, amount)?,
            LedgerOp::Mint { caller, to, amount } => ledger.mint(caller, to, amount)?,
            LedgerOp::Burn {
                caller,
                from,
                amount,
            } => ledger.burn(caller, from, amount)?,
        };
        Ok(events)
    }
}
