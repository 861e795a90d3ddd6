//! Error types for explorer verification.

use thiserror::Error;

/// Hint attached to every [`VerificationError::VerifierUnavailable`] caused
/// by a missing key.
pub const MISSING_KEY_HINT: &str =
    "set BSCSCAN_API_KEY or ETHERSCAN_API_KEY for this network and retry";

/// Hint attached to transport failures.
pub const TRANSPORT_HINT: &str = "check connectivity to the explorer API and retry";

/// Everything that can end a verification job without a "verified" verdict.
///
/// None of these affect the deployed token. They only describe what the
/// explorer knows about it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The explorer could not be reached, or no API key is configured.
    #[error("verifier unavailable: {reason} ({hint})")]
    VerifierUnavailable {
        /// What went wrong.
        reason: String,
        /// What the operator can do about it.
        hint: String,
    },

    /// The explorer gave a terminal negative answer.
    #[error("verification rejected: {reason}")]
    VerificationRejected {
        /// The explorer's message, verbatim.
        reason: String,
    },

    /// The job was still pending after the maximum number of status checks.
    #[error("verification still pending after {attempts} status checks")]
    Timeout {
        /// Status checks performed before giving up.
        attempts: u32,
    },

    /// The caller cancelled the job.
    #[error("verification cancelled")]
    Cancelled,

    /// The request could not be built.
    #[error("failed to encode verification request: {0}")]
    Encoding(String),
}

impl VerificationError {
    /// Missing API key for the named network.
    pub fn missing_api_key(network: &str) -> Self {
        Self::VerifierUnavailable {
            reason: format!("API key not configured for {network}"),
            hint: MISSING_KEY_HINT.to_string(),
        }
    }

    /// Network or decoding failure talking to the explorer.
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        Self::VerifierUnavailable {
            reason: reason.to_string(),
            hint: TRANSPORT_HINT.to_string(),
        }
    }

    /// Whether a manual retry has a chance of a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VerifierUnavailable { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_carries_hint() {
        let err = VerificationError::missing_api_key("BSC Testnet");
        let text = err.to_string();
        assert!(text.contains("BSC Testnet"));
        assert!(text.contains("BSCSCAN_API_KEY"));
        assert!(err.is_retryable());
    }

    #[test]
    fn rejection_is_final() {
        let err = VerificationError::VerificationRejected {
            reason: "Fail - Unable to verify".into(),
        };
        assert!(!err.is_retryable());
        assert!(!VerificationError::Cancelled.is_retryable());
    }
}
