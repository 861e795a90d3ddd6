//! # Explorer API Client
//!
//! The Etherscan-family verification API, as a trait plus a `reqwest`
//! implementation. The orchestrator only ever talks to [`VerifierApi`], so
//! tests can swap in a scripted verifier without a network.
//!
//! | Call          | Method | Encoding              | Key fields                          |
//! |---------------|--------|-----------------------|-------------------------------------|
//! | submit        | POST   | form-urlencoded body  | `action=verifysourcecode`           |
//! | check status  | GET    | query string          | `action=checkverifystatus`, `guid`  |
//!
//! Both return `{"status": "1"|"0", "message": ..., "result": ...}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::VerificationError;

/// Value of `module` for every contract verification call.
pub const MODULE_CONTRACT: &str = "contract";

/// `action` for a source submission.
pub const ACTION_VERIFY: &str = "verifysourcecode";

/// `action` for a status check.
pub const ACTION_CHECK_STATUS: &str = "checkverifystatus";

/// Per-request timeout for explorer calls.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Form body of a `verifysourcecode` submission.
///
/// The wire names are fixed by the explorer API. `constructorArguements` is
/// misspelled upstream and must stay that way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifySourceForm {
    #[serde(rename = "apikey")]
    pub api_key: String,
    pub module: String,
    pub action: String,
    #[serde(rename = "contractaddress")]
    pub contract_address: String,
    #[serde(rename = "sourceCode")]
    pub source_code: String,
    #[serde(rename = "codeformat")]
    pub code_format: String,
    #[serde(rename = "contractname")]
    pub contract_name: String,
    #[serde(rename = "compilerversion")]
    pub compiler_version: String,
    #[serde(rename = "constructorArguements")]
    pub constructor_arguments: String,
}

/// Query string of a `checkverifystatus` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusQuery {
    #[serde(rename = "apikey")]
    pub api_key: String,
    pub module: String,
    pub action: String,
    pub guid: String,
}

impl StatusQuery {
    /// Status query for a tracking id.
    pub fn new(api_key: impl Into<String>, guid: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            module: MODULE_CONTRACT.to_string(),
            action: ACTION_CHECK_STATUS.to_string(),
            guid: guid.into(),
        }
    }
}

/// The explorer's JSON envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerResponse {
    /// `"1"` on success, `"0"` otherwise.
    #[serde(default)]
    pub status: String,
    /// Short status word (`"OK"`, `"NOTOK"`).
    #[serde(default)]
    pub message: String,
    /// Tracking id after a submission, status text after a check, or an
    /// error message.
    #[serde(default)]
    pub result: String,
}

impl ExplorerResponse {
    /// Whether the explorer reported success.
    pub fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// The two explorer calls the orchestrator needs.
#[async_trait]
pub trait VerifierApi: Send + Sync {
    /// Submits source for verification.
    async fn submit(&self, form: &VerifySourceForm) -> Result<ExplorerResponse, VerificationError>;

    /// Checks the status of a previously accepted submission.
    async fn check_status(&self, query: &StatusQuery)
        -> Result<ExplorerResponse, VerificationError>;
}

/// [`VerifierApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpVerifier {
    http: reqwest::Client,
    api_url: String,
}

impl HttpVerifier {
    /// Creates a client for the given explorer API endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::VerifierUnavailable`] if the TLS backend
    /// cannot be initialised.
    pub fn new(api_url: impl Into<String>) -> Result<Self, VerificationError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(VerificationError::transport)?;
        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }

    /// The endpoint this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl VerifierApi for HttpVerifier {
    async fn submit(&self, form: &VerifySourceForm) -> Result<ExplorerResponse, VerificationError> {
        let response = self
            .http
            .post(&self.api_url)
            .form(form)
            .send()
            .await
            .map_err(VerificationError::transport)?;

        tracing::debug!(status = %response.status(), "explorer submit responded");

        response
            .json::<ExplorerResponse>()
            .await
            .map_err(VerificationError::transport)
    }

    async fn check_status(
        &self,
        query: &StatusQuery,
    ) -> Result<ExplorerResponse, VerificationError> {
        let response = self
            .http
            .get(&self.api_url)
            .query(query)
            .send()
            .await
            .map_err(VerificationError::transport)?;

        response
            .json::<ExplorerResponse>()
            .await
            .map_err(VerificationError::transport)
    }
}
