//! # TokenForge Contracts
//!
//! The on-chain half of TokenForge, as plain Rust state machines:
//!
//! - **ERC-20 Ledger**: one [`TokenLedger`] per deployed token. Owns the
//!   balances, allowances and total supply, and guards `mint`/`burn` behind
//!   the owner and the feature flags fixed at creation.
//! - **Token Factory**: creates ledgers with caller-supplied parameters and
//!   reports each creation through a `TokenCreated` event.
//! - **Events**: the notifications every mutation returns, plus their
//!   EVM log rendering.
//!
//! ## Design Principles
//!
//! 1. Every operation is all-or-nothing. New values are computed with
//!    `checked_add`/`checked_sub` first and committed only when every check
//!    has passed.
//! 2. Events are return values. Nothing is broadcast implicitly; callers
//!    collect the `Vec<LedgerEvent>` or push it into an [`EventSink`].
//! 3. Each ledger is an independent aggregate. There is no shared state
//!    between instances, and no ambient global state.

pub mod erc20;
pub mod events;
pub mod token_factory;

pub use erc20::{LedgerError, TokenLedger};
pub use events::{EventSink, LedgerEvent, Log, TokenCreated};
pub use token_factory::{CreatedToken, FactoryError, TokenFactory};
