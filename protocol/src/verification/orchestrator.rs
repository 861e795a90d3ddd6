//! # Verification Orchestrator
//!
//! Drives one verification job from submission to a terminal verdict.
//!
//! ## Cadence
//!
//! The first status check happens [`FIRST_POLL_DELAY`] after the explorer
//! accepts the submission, later checks every [`POLL_INTERVAL`] while the
//! explorer keeps answering "Pending in queue". After
//! [`MAX_STATUS_CHECKS`] checks the job fails with a timeout instead of
//! polling forever.
//!
//! ## Cancellation
//!
//! Every wait between polls, and every request in flight to the explorer,
//! races against a `tokio::sync::watch` channel. Sending `true`, or dropping
//! the sender, stops the job at once: a slow explorer cannot hold a cancelled
//! job open. [`VerificationHandle`] owns such a sender, so dropping the handle
//! tears the job down.
//!
//! Jobs share nothing with each other. Each job's polls are strictly
//! sequential: the next check is only scheduled after the previous one
//! returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::{StatusQuery, VerifierApi, VerifySourceForm, ACTION_VERIFY, MODULE_CONTRACT};
use super::error::VerificationError;
use super::source::StandardJsonInput;
use crate::config::{
    ExplorerConfig, CODE_FORMAT, COMPILER_VERSION, CONTRACT_NAME, FIRST_POLL_DELAY,
    MAX_STATUS_CHECKS, POLL_INTERVAL, STATUS_PENDING, STATUS_VERIFIED,
};
use crate::token::TokenParams;
use crate::types::Address;

// ---------------------------------------------------------------------------
// Job State
// ---------------------------------------------------------------------------

/// Where a verification job currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Request built, explorer has not accepted it yet.
    Submitted,
    /// Explorer accepted the submission and is compiling.
    Pending,
    /// Explorer confirmed the source matches the bytecode.
    Verified,
    /// Terminal failure; `reason` is the explorer's text or ours.
    Failed { reason: String },
}

impl VerificationStatus {
    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Verified | Self::Failed { .. })
    }
}

/// One verification attempt for one deployed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationJob {
    /// Address of the deployed token.
    pub contract_address: Address,
    /// Constructor arguments the token was deployed with.
    pub params: TokenParams,
    /// Explorer tracking id (`guid`), once accepted.
    pub tracking_id: Option<String>,
    /// Current status.
    pub status: VerificationStatus,
    /// Status checks performed so far.
    pub status_checks: u32,
    /// When the job was created.
    pub submitted_at: DateTime<Utc>,
    /// When the job reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
}

impl VerificationJob {
    /// A fresh job in [`VerificationStatus::Submitted`].
    pub fn new(contract_address: Address, params: TokenParams) -> Self {
        Self {
            contract_address,
            params,
            tracking_id: None,
            status: VerificationStatus::Submitted,
            status_checks: 0,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    fn finish(&mut self, status: VerificationStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.finish(VerificationStatus::Failed {
            reason: reason.into(),
        });
    }
}

/// Timing and retry ceiling for status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between acceptance and the first status check.
    pub first_delay: Duration,
    /// Wait between subsequent status checks.
    pub interval: Duration,
    /// Maximum status checks before the job times out.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            first_delay: FIRST_POLL_DELAY,
            interval: POLL_INTERVAL,
            max_attempts: MAX_STATUS_CHECKS,
        }
    }
}

/// How the explorer's status text maps onto the state machine.
#[derive(Debug, PartialEq, Eq)]
enum PollVerdict {
    Verified,
    Pending,
    Failed,
}

fn classify(result: &str) -> PollVerdict {
    match result {
        STATUS_VERIFIED => PollVerdict::Verified,
        STATUS_PENDING => PollVerdict::Pending,
        _ => PollVerdict::Failed,
    }
}

type Observer<'a> = &'a (dyn Fn(&VerificationJob) + Send + Sync);

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Submits token sources to one explorer and follows them to a verdict.
///
/// Cheap to share: wrap in an `Arc` and call [`spawn`](Self::spawn) for each
/// token that needs verifying.
pub struct VerificationOrchestrator {
    api: Arc<dyn VerifierApi>,
    explorer: ExplorerConfig,
    policy: PollPolicy,
}

impl VerificationOrchestrator {
    /// Creates an orchestrator with the default [`PollPolicy`].
    pub fn new(api: Arc<dyn VerifierApi>, explorer: ExplorerConfig) -> Self {
        Self {
            api,
            explorer,
            policy: PollPolicy::default(),
        }
    }

    /// Overrides the polling policy.
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The explorer this orchestrator submits to.
    pub fn explorer(&self) -> &ExplorerConfig {
        &self.explorer
    }

    /// The active polling policy.
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Builds the `verifysourcecode` form for a token.
    ///
    /// # Errors
    ///
    /// [`VerificationError::VerifierUnavailable`] without an API key,
    /// [`VerificationError::Encoding`] if the source bundle fails to
    /// serialize.
    pub fn build_form(
        &self,
        contract_address: &Address,
        params: &TokenParams,
    ) -> Result<VerifySourceForm, VerificationError> {
        let api_key = self
            .explorer
            .api_key
            .clone()
            .ok_or_else(|| VerificationError::missing_api_key(&self.explorer.name))?;

        let source_code = StandardJsonInput::token_contract()
            .to_json_string()
            .map_err(|e| VerificationError::Encoding(e.to_string()))?;

        Ok(VerifySourceForm {
            api_key,
            module: MODULE_CONTRACT.to_string(),
            action: ACTION_VERIFY.to_string(),
            contract_address: contract_address.to_checksum(None),
            source_code,
            code_format: CODE_FORMAT.to_string(),
            contract_name: CONTRACT_NAME.to_string(),
            compiler_version: COMPILER_VERSION.to_string(),
            constructor_arguments: params.constructor_args_hex(),
        })
    }

    /// Submits a token and returns the job in [`VerificationStatus::Pending`].
    ///
    /// No request is made when the API key is missing.
    ///
    /// # Errors
    ///
    /// [`VerificationError::VerifierUnavailable`] for a missing key or
    /// transport failure, [`VerificationError::VerificationRejected`] when the
    /// explorer refuses the submission.
    pub async fn submit(
        &self,
        contract_address: Address,
        params: TokenParams,
    ) -> Result<VerificationJob, VerificationError> {
        let mut job = VerificationJob::new(contract_address, params);
        let (_keep_open, mut cancel) = watch::channel(false);
        self.submit_job(&mut job, &mut cancel, &|_| {}).await?;
        Ok(job)
    }

    /// Polls a pending job until it reaches a terminal status.
    ///
    /// On return the job's status is terminal: `Verified` on `Ok`, `Failed`
    /// otherwise.
    ///
    /// # Errors
    ///
    /// [`VerificationError::VerificationRejected`] for a negative verdict,
    /// [`VerificationError::Timeout`] when the check ceiling is hit,
    /// [`VerificationError::Cancelled`] when `cancel` fires, and
    /// [`VerificationError::VerifierUnavailable`] on transport failure.
    pub async fn poll(
        &self,
        job: &mut VerificationJob,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), VerificationError> {
        self.poll_job(job, cancel, &|_| {}).await
    }

    /// Submits and polls in one call. Returns the verified job.
    ///
    /// Dropping the sender behind `cancel` counts as cancellation.
    pub async fn verify(
        &self,
        contract_address: Address,
        params: TokenParams,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<VerificationJob, VerificationError> {
        let mut job = VerificationJob::new(contract_address, params);
        self.drive(&mut job, &mut cancel, &|_| {}).await?;
        Ok(job)
    }

    /// Runs a job on the tokio runtime and returns a handle to observe or
    /// cancel it.
    pub fn spawn(self: &Arc<Self>, contract_address: Address, params: TokenParams) -> VerificationHandle {
        let job = VerificationJob::new(contract_address, params);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(job.clone());
        let this = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut job = job;
            let notify = move |snapshot: &VerificationJob| {
                status_tx.send_replace(snapshot.clone());
            };
            this.drive(&mut job, &mut cancel_rx, &notify).await?;
            Ok::<_, VerificationError>(job)
        });

        VerificationHandle {
            cancel: cancel_tx,
            status: status_rx,
            task: Some(task),
        }
    }

    async fn drive(
        &self,
        job: &mut VerificationJob,
        cancel: &mut watch::Receiver<bool>,
        observer: Observer<'_>,
    ) -> Result<(), VerificationError> {
        self.submit_job(job, cancel, observer).await?;
        self.poll_job(job, cancel, observer).await
    }

    async fn submit_job(
        &self,
        job: &mut VerificationJob,
        cancel: &mut watch::Receiver<bool>,
        observer: Observer<'_>,
    ) -> Result<(), VerificationError> {
        let contract = job.contract_address.to_checksum(None);

        let form = match self.build_form(&job.contract_address, &job.params) {
            Ok(form) => form,
            Err(e) => {
                warn!(%contract, network = %self.explorer.name, error = %e, "verification not submitted");
                job.fail(e.to_string());
                observer(job);
                return Err(e);
            }
        };

        let response = match or_cancel(self.api.submit(&form), cancel).await {
            None => return Err(cancelled(job, observer, &contract)),
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                warn!(%contract, error = %e, "verification submit failed");
                job.fail(e.to_string());
                observer(job);
                return Err(e);
            }
        };

        if !response.is_ok() {
            warn!(%contract, reason = %response.result, "explorer rejected submission");
            job.fail(response.result.clone());
            observer(job);
            return Err(VerificationError::VerificationRejected {
                reason: response.result,
            });
        }

        info!(%contract, guid = %response.result, network = %self.explorer.name, "verification submitted");
        job.tracking_id = Some(response.result);
        job.status = VerificationStatus::Pending;
        observer(job);
        Ok(())
    }

    async fn poll_job(
        &self,
        job: &mut VerificationJob,
        cancel: &mut watch::Receiver<bool>,
        observer: Observer<'_>,
    ) -> Result<(), VerificationError> {
        let guid = match (&job.status, &job.tracking_id) {
            (VerificationStatus::Pending, Some(guid)) => guid.clone(),
            (VerificationStatus::Verified, _) => return Ok(()),
            (VerificationStatus::Failed { reason }, _) => {
                return Err(VerificationError::VerificationRejected {
                    reason: reason.clone(),
                })
            }
            _ => {
                return Err(VerificationError::Encoding(
                    "job has not been accepted by the explorer".to_string(),
                ))
            }
        };
        let api_key = self
            .explorer
            .api_key
            .clone()
            .ok_or_else(|| VerificationError::missing_api_key(&self.explorer.name))?;
        let query = StatusQuery::new(api_key, guid.as_str());
        let contract = job.contract_address.to_checksum(None);

        let mut delay = self.policy.first_delay;
        loop {
            if job.status_checks >= self.policy.max_attempts {
                let err = VerificationError::Timeout {
                    attempts: job.status_checks,
                };
                warn!(%contract, %guid, attempts = job.status_checks, "verification timed out");
                job.fail(err.to_string());
                observer(job);
                return Err(err);
            }

            if or_cancel(tokio::time::sleep(delay), cancel).await.is_none() {
                return Err(cancelled(job, observer, &contract));
            }

            job.status_checks += 1;
            let response = match or_cancel(self.api.check_status(&query), cancel).await {
                None => return Err(cancelled(job, observer, &contract)),
                Some(Ok(response)) => response,
                Some(Err(e)) => {
                    warn!(%contract, %guid, error = %e, "status check failed");
                    job.fail(e.to_string());
                    observer(job);
                    return Err(e);
                }
            };

            match classify(&response.result) {
                PollVerdict::Verified => {
                    info!(%contract, %guid, checks = job.status_checks, "contract verified");
                    job.finish(VerificationStatus::Verified);
                    observer(job);
                    return Ok(());
                }
                PollVerdict::Pending => {
                    debug!(%contract, %guid, checks = job.status_checks, "verification pending");
                    observer(job);
                    delay = self.policy.interval;
                }
                PollVerdict::Failed => {
                    warn!(%contract, %guid, reason = %response.result, "verification failed");
                    job.fail(response.result.clone());
                    observer(job);
                    return Err(VerificationError::VerificationRejected {
                        reason: response.result,
                    });
                }
            }
        }
    }
}

/// Runs `work` to completion unless cancelled first. `None` means cancelled;
/// the unfinished future is dropped.
///
/// Any change on the channel, or the sender going away, counts as a cancel.
async fn or_cancel<T>(
    work: impl Future<Output = T>,
    cancel: &mut watch::Receiver<bool>,
) -> Option<T> {
    if *cancel.borrow() {
        return None;
    }

    tokio::select! {
        out = work => Some(out),
        _ = cancel.changed() => None,
    }
}

fn cancelled(job: &mut VerificationJob, observer: Observer<'_>, contract: &str) -> VerificationError {
    info!(%contract, guid = ?job.tracking_id, "verification cancelled");
    job.fail(VerificationError::Cancelled.to_string());
    observer(job);
    VerificationError::Cancelled
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owner's view of a spawned verification job.
///
/// Dropping the handle cancels the job.
pub struct VerificationHandle {
    cancel: watch::Sender<bool>,
    status: watch::Receiver<VerificationJob>,
    task: Option<JoinHandle<Result<VerificationJob, VerificationError>>>,
}

impl VerificationHandle {
    /// Latest snapshot of the job.
    pub fn snapshot(&self) -> VerificationJob {
        self.status.borrow().clone()
    }

    /// A receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<VerificationJob> {
        self.status.clone()
    }

    /// Stops the job, abandoning any explorer request in flight.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    /// Whether the background task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the job to finish and returns its final state.
    ///
    /// # Errors
    ///
    /// The job's own error, or [`VerificationError::Cancelled`] if the task
    /// was aborted.
    pub async fn wait(mut self) -> Result<VerificationJob, VerificationError> {
        let Some(task) = self.task.take() else {
            return Err(VerificationError::Cancelled);
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(VerificationError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

impl Drop for VerificationHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.cancel.send(true);
            task.abort();
        }
    }
}
