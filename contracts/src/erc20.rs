//! # ERC-20 Ledger
//!
//! The state of one deployed token: balances, allowances and total supply,
//! plus the immutable metadata fixed at construction (name, symbol,
//! decimals, owner and the mint/burn feature flags).
//!
//! ## Execution Model
//!
//! Calls are sequential. Whoever owns the ledger serializes access to it
//! (`&mut self`), and each mutating call is atomic: every check runs and
//! every new value is computed before anything is written, so a failed call
//! leaves the ledger exactly as it found it.
//!
//! ## Invariants
//!
//! - `total_supply == Σ balances`
//! - `owner`, `is_mintable` and `is_burnable` never change.
//! - Arithmetic never wraps. Overflow surfaces as
//!   [`LedgerError::ArithmeticError`].

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use tokenforge_protocol::types::{u256_decimal, Address, U256};
use tokenforge_protocol::TokenParams;

use crate::events::LedgerEvent;

// ---------------------------------------------------------------------------
// Revert Reasons
// ---------------------------------------------------------------------------

pub const ERR_TRANSFER_FROM_ZERO: &str = "ERC20: transfer from the zero address";
pub const ERR_TRANSFER_TO_ZERO: &str = "ERC20: transfer to the zero address";
pub const ERR_TRANSFER_EXCEEDS_BALANCE: &str = "ERC20: transfer amount exceeds balance";
pub const ERR_TRANSFER_EXCEEDS_ALLOWANCE: &str = "ERC20: transfer amount exceeds allowance";
pub const ERR_MINT_TO_ZERO: &str = "ERC20: mint to the zero address";
pub const ERR_BURN_FROM_ZERO: &str = "ERC20: burn from the zero address";
pub const ERR_BURN_EXCEEDS_BALANCE: &str = "ERC20: burn amount exceeds balance";
pub const ERR_APPROVE_FROM_ZERO: &str = "ERC20: approve from the zero address";
pub const ERR_APPROVE_TO_ZERO: &str = "ERC20: approve to the zero address";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a ledger operation was refused.
///
/// None of these are retryable: the same call against the same state fails
/// the same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Caller error: zero address, insufficient balance or allowance.
    #[error("{0}")]
    InvalidOperation(String),

    /// `mint`/`burn` called by someone other than the owner.
    #[error("Not owner")]
    NotOwner,

    /// `mint` on a token created with `is_mintable = false`.
    #[error("Minting is disabled")]
    MintingDisabled,

    /// `burn` on a token created with `is_burnable = false`.
    #[error("Burning is disabled")]
    BurningDisabled,

    /// A 256-bit counter would overflow or underflow.
    #[error("arithmetic overflow in {0}")]
    ArithmeticError(&'static str),
}

impl LedgerError {
    fn invalid(reason: &str) -> Self {
        LedgerError::InvalidOperation(reason.to_string())
    }

    /// Whether the caller lacks the right to do this at all, as opposed to
    /// passing bad arguments.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            LedgerError::NotOwner | LedgerError::MintingDisabled | LedgerError::BurningDisabled
        )
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// One token's ledger.
#[derive(Debug, Clone)]
pub struct TokenLedger {
    address: Address,
    params: TokenParams,
    total_supply: U256,
    /// Only non-zero balances are stored.
    balances: HashMap<Address, U256>,
    /// `(owner, spender) -> allowance`. Zero allowances are not stored.
    allowances: HashMap<(Address, Address), U256>,
}

/// Read-only view of a ledger's metadata and supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSummary {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub owner: Address,
    pub is_mintable: bool,
    pub is_burnable: bool,
    #[serde(with = "u256_decimal")]
    pub total_supply: U256,
    pub holders: usize,
}

impl TokenLedger {
    /// Constructs a ledger and mints `params.initial_supply` to
    /// `params.owner` in the same step.
    ///
    /// Returns the ledger together with the initial-mint `Transfer` event.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidOperation`] if the owner is the zero address,
    /// since the initial mint would revert.
    pub fn new(address: Address, params: TokenParams) -> Result<(Self, Vec<LedgerEvent>), LedgerError> {
        if params.owner.is_zero() {
            return Err(LedgerError::invalid(ERR_MINT_TO_ZERO));
        }

        let owner = params.owner;
        let supply = params.initial_supply;
        let mut balances = HashMap::new();
        if !supply.is_zero() {
            balances.insert(owner, supply);
        }

        let ledger = Self {
            address,
            params,
            total_supply: supply,
            balances,
            allowances: HashMap::new(),
        };

        debug!(token = ?address, owner = ?owner, %supply, "ledger constructed");

        Ok((
            ledger,
            vec![LedgerEvent::Transfer {
                from: Address::ZERO,
                to: owner,
                value: supply,
            }],
        ))
    }

    // -- reads -------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn params(&self) -> &TokenParams {
        &self.params
    }

    pub fn name(&self) -> &str {
        &self.params.name
    }

    pub fn symbol(&self) -> &str {
        &self.params.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.params.decimals
    }

    pub fn owner(&self) -> Address {
        self.params.owner
    }

    pub fn is_mintable(&self) -> bool {
        self.params.is_mintable
    }

    pub fn is_burnable(&self) -> bool {
        self.params.is_burnable
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    /// Balance of `account`; zero for unknown accounts.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Remaining amount `spender` may move on behalf of `owner`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    /// Number of accounts with a non-zero balance.
    pub fn holders(&self) -> usize {
        self.balances.len()
    }

    /// Snapshot of the metadata and supply.
    pub fn summary(&self) -> TokenSummary {
        TokenSummary {
            address: self.address,
            name: self.params.name.clone(),
            symbol: self.params.symbol.clone(),
            decimals: self.params.decimals,
            owner: self.params.owner,
            is_mintable: self.params.is_mintable,
            is_burnable: self.params.is_burnable,
            total_supply: self.total_supply,
            holders: self.holders(),
        }
    }

    // -- mutations ---------------------------------------------------------

    /// Moves `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidOperation`] for a zero address on either side
    /// or an insufficient balance.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let (new_from, new_to) = self.check_transfer(&from, &to, amount)?;
        self.set_balance(from, new_from);
        self.set_balance(to, new_to);

        debug!(token = ?self.address, ?from, ?to, %amount, "transfer");
        Ok(vec![LedgerEvent::Transfer {
            from,
            to,
            value: amount,
        }])
    }

    /// Sets the allowance of `spender` over `owner`'s tokens to exactly
    /// `amount`. Repeated calls overwrite.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidOperation`] if either address is zero.
    pub fn approve(
        &mut self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        check_approve(&owner, &spender)?;
        self.set_allowance(owner, spender, amount);

        debug!(token = ?self.address, ?owner, ?spender, %amount, "approve");
        Ok(vec![LedgerEvent::Approval {
            owner,
            spender,
            value: amount,
        }])
    }

    /// Moves `amount` from `from` to `to` on the strength of the allowance
    /// `from` granted to `caller`.
    ///
    /// Returns the allowance rewrite (`Approval`) followed by the `Transfer`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidOperation`] if the allowance is too small, or
    /// for any reason [`transfer`](Self::transfer) would fail. Nothing
    /// changes on failure, including the allowance.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        let current = self.allowance(&from, &caller);
        if current < amount {
            return Err(LedgerError::invalid(ERR_TRANSFER_EXCEEDS_ALLOWANCE));
        }
        let remaining = current
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticError("transfer_from"))?;
        check_approve(&from, &caller)?;
        let (new_from, new_to) = self.check_transfer(&from, &to, amount)?;

        self.set_allowance(from, caller, remaining);
        self.set_balance(from, new_from);
        self.set_balance(to, new_to);

        debug!(token = ?self.address, ?caller, ?from, ?to, %amount, "transfer_from");
        Ok(vec![
            LedgerEvent::Approval {
                owner: from,
                spender: caller,
                value: remaining,
            },
            LedgerEvent::Transfer {
                from,
                to,
                value: amount,
            },
        ])
    }

    /// Creates `amount` new tokens for `to`. Owner only, and only on
    /// mintable tokens.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`], then [`LedgerError::MintingDisabled`],
    /// then [`LedgerError::InvalidOperation`] for a zero recipient,
    /// [`LedgerError::ArithmeticError`] if the supply would overflow.
    pub fn mint(
        &mut self,
        caller: Address,
        to: Address,
        amount: U256,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if caller != self.params.owner {
            return Err(LedgerError::NotOwner);
        }
        if !self.params.is_mintable {
            return Err(LedgerError::MintingDisabled);
        }
        if to.is_zero() {
            return Err(LedgerError::invalid(ERR_MINT_TO_ZERO));
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticError("mint"))?;
        let new_balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticError("mint"))?;

        self.total_supply = new_supply;
        self.set_balance(to, new_balance);

        debug!(token = ?self.address, ?to, %amount, supply = %new_supply, "mint");
        Ok(vec![LedgerEvent::Transfer {
            from: Address::ZERO,
            to,
            value: amount,
        }])
    }

    /// Destroys `amount` of `from`'s tokens. Owner only, and only on
    /// burnable tokens. The owner may burn from any account.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotOwner`], then [`LedgerError::BurningDisabled`],
    /// then [`LedgerError::InvalidOperation`] for a zero address or an
    /// insufficient balance.
    pub fn burn(
        &mut self,
        caller: Address,
        from: Address,
        amount: U256,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if caller != self.params.owner {
            return Err(LedgerError::NotOwner);
        }
        if !self.params.is_burnable {
            return Err(LedgerError::BurningDisabled);
        }
        if from.is_zero() {
            return Err(LedgerError::invalid(ERR_BURN_FROM_ZERO));
        }

        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(LedgerError::invalid(ERR_BURN_EXCEEDS_BALANCE));
        }
        let new_balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticError("burn"))?;
        let new_supply = self
            .total_supply
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticError("burn"))?;

        self.set_balance(from, new_balance);
        self.total_supply = new_supply;

        debug!(token = ?self.address, ?from, %amount, supply = %new_supply, "burn");
        Ok(vec![LedgerEvent::Transfer {
            from,
            to: Address::ZERO,
            value: amount,
        }])
    }

    // -- internals ---------------------------------------------------------

    /// Validates a transfer and returns the post-transfer balances of
    /// `from` and `to`. A self-transfer yields the same value twice.
    fn check_transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(U256, U256), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::invalid(ERR_TRANSFER_FROM_ZERO));
        }
        if to.is_zero() {
            return Err(LedgerError::invalid(ERR_TRANSFER_TO_ZERO));
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::invalid(ERR_TRANSFER_EXCEEDS_BALANCE));
        }
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or(LedgerError::ArithmeticError("transfer"))?;

        let to_balance = if from == to {
            new_from
        } else {
            self.balance_of(to)
        };
        let new_to = to_balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticError("transfer"))?;

        Ok((new_from, new_to))
    }

    fn set_balance(&mut self, account: Address, value: U256) {
        if value.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, value);
        }
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, value: U256) {
        if value.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
    }
}

fn check_approve(owner: &Address, spender: &Address) -> Result<(), LedgerError> {
    if owner.is_zero() {
        return Err(LedgerError::invalid(ERR_APPROVE_FROM_ZERO));
    }
    if spender.is_zero() {
        return Err(LedgerError::invalid(ERR_APPROVE_TO_ZERO));
    }
    Ok(())
}
