//! # Explorer Source Verification
//!
//! Registers a deployed token's source with a block explorer so the explorer
//! can show it as "verified". The flow is a small state machine:
//!
//! ```text
//! Submitted ──accepted──▶ Pending ──"Pass - Verified"──▶ Verified
//!     │                     │  ▲
//!     │ rejected            │  └── "Pending in queue" (wait, poll again)
//!     ▼                     ▼
//!   Failed ◀──── anything else / timeout / cancel / transport error
//! ```
//!
//! Verification is advisory: nothing here touches ledger state. A failed
//! verification leaves the deployment exactly as it was.
//!
//! - [`client`]: the explorer HTTP contract and a `reqwest` implementation.
//! - [`source`]: the standard-JSON source bundle the explorer compiles.
//! - [`orchestrator`]: submission, polling cadence, cancellation.

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod source;

pub use client::{ExplorerResponse, HttpVerifier, StatusQuery, VerifierApi, VerifySourceForm};
pub use error::VerificationError;
pub use orchestrator::{
    PollPolicy, VerificationHandle, VerificationJob, VerificationOrchestrator, VerificationStatus,
};
