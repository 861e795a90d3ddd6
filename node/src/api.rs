//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the node's HTTP interface. This is
//! the wallet/UI side of the system: every state-changing request names the
//! caller address it acts as, and the node applies it to the hosted ledger.
//!
//! ## Endpoints
//!
//! | Method | Path                                          | Description                     |
//! |--------|-----------------------------------------------|---------------------------------|
//! | GET    | `/health`                                     | Liveness check                  |
//! | GET    | `/status`                                     | Node status summary             |
//! | POST   | `/tokens`                                     | Create a token via the factory  |
//! | GET    | `/tokens/:address`                            | Token metadata and supply       |
//! | GET    | `/tokens/:address/balances/:holder`           | Balance of one holder           |
//! | GET    | `/tokens/:address/allowances/:owner/:spender` | Allowance                       |
//! | POST   | `/tokens/:address/transfer`                   | Transfer from the caller        |
//! | POST   | `/tokens/:address/approve`                    | Set an allowance                |
//! | POST   | `/tokens/:address/transfer-from`              | Spend an allowance              |
//! | POST   | `/tokens/:address/mint`                       | Mint (owner only)               |
//! | POST   | `/tokens/:address/burn`                       | Burn (owner only)               |
//! | POST   | `/tokens/:address/verify`                     | Start explorer verification     |
//! | GET    | `/verifications/:id`                          | Verification job status         |
//! | GET    | `/ws`                                         | Live ledger/verification events |
//!
//! Amounts in request bodies are decimal strings in whole-token units
//! (`"1.5"`), converted with the token's `decimals`. Amounts in responses
//! are base-unit integers, with a formatted copy alongside.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use tokenforge_contracts::erc20::TokenSummary;
use tokenforge_contracts::{LedgerError, LedgerEvent, Log, TokenCreated};
use tokenforge_protocol::config::ExplorerConfig;
use tokenforge_protocol::token::MAX_DECIMALS;
use tokenforge_protocol::types::{
    format_units, parse_address, parse_units, u256_decimal, Address, U256,
};
use tokenforge_protocol::verification::{
    VerificationError, VerificationHandle, VerificationJob, VerificationOrchestrator,
    VerificationStatus,
};
use tokenforge_protocol::TokenParams;

use crate::chain::{ChainError, ChainState, CreationReceipt, LedgerOp};
use crate::metrics::SharedMetrics;

/// Broadcast channel capacity for live event streaming.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long a finished verification job stays queryable by default.
pub const DEFAULT_VERIFICATION_RETENTION: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Explorer of the configured chain.
    pub explorer: ExplorerConfig,
    /// Factory and hosted ledgers. The write lock serializes ledger calls.
    pub chain: Arc<RwLock<ChainState>>,
    /// Submits tokens for verification.
    pub verifier: Arc<VerificationOrchestrator>,
    /// Running and recently finished verification jobs. Dropping a handle
    /// cancels its job.
    pub verifications: Arc<DashMap<Uuid, VerificationHandle>>,
    /// How long a job stays in `verifications` after reaching a terminal
    /// state.
    pub verification_retention: Duration,
    /// Broadcast channel for live event notifications.
    pub event_tx: broadcast::Sender<NodeEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        version: String,
        factory_address: Address,
        verifier: Arc<VerificationOrchestrator>,
        metrics: SharedMetrics,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            version,
            explorer: verifier.explorer().clone(),
            chain: Arc::new(RwLock::new(ChainState::new(factory_address))),
            verifier,
            verifications: Arc::new(DashMap::new()),
            verification_retention: DEFAULT_VERIFICATION_RETENTION,
            event_tx,
            metrics,
        }
    }

    /// Overrides how long finished verification jobs are kept.
    pub fn with_verification_retention(mut self, retention: Duration) -> Self {
        self.verification_retention = retention;
        self
    }
}

/// Events pushed to WebSocket subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeEvent {
    /// The factory created a token.
    TokenCreated(TokenCreated),
    /// A ledger emitted an event.
    Ledger { token: Address, event: LedgerEvent },
    /// A verification job changed state.
    Verification { id: Uuid, job: VerificationJob },
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/tokens", post(create_token_handler))
        .route("/tokens/:address", get(token_handler))
        .route("/tokens/:address/balances/:holder", get(balance_handler))
        .route(
            "/tokens/:address/allowances/:owner/:spender",
            get(allowance_handler),
        )
        .route("/tokens/:address/transfer", post(transfer_handler))
        .route("/tokens/:address/approve", post(approve_handler))
        .route("/tokens/:address/transfer-from", post(transfer_from_handler))
        .route("/tokens/:address/mint", post(mint_handler))
        .route("/tokens/:address/burn", post(burn_handler))
        .route("/tokens/:address/verify", post(verify_handler))
        .route("/verifications/:id", get(verification_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Chain(ChainError),
    Verification(VerificationError),
}

impl From<ChainError> for ApiError {
    fn from(e: ChainError) -> Self {
        ApiError::Chain(e)
    }
}

fn ledger_status(e: &LedgerError) -> StatusCode {
    if e.is_authorization() {
        return StatusCode::FORBIDDEN;
    }
    match e {
        LedgerError::ArithmeticError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use tokenforge_contracts::FactoryError;

        let (status, error, hint) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Chain(e) => {
                let status = match &e {
                    ChainError::UnknownToken(_) => StatusCode::NOT_FOUND,
                    ChainError::Ledger(inner) | ChainError::Factory(FactoryError::Ledger(inner)) => {
                        ledger_status(inner)
                    }
                    ChainError::Factory(FactoryError::NonceExhausted) => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                };
                (status, e.to_string(), None)
            }
            ApiError::Verification(e) => match e {
                VerificationError::VerifierUnavailable { reason, hint } => {
                    (StatusCode::SERVICE_UNAVAILABLE, reason, Some(hint))
                }
                other => (StatusCode::BAD_GATEWAY, other.to_string(), None),
            },
        };

        (status, Json(ErrorResponse { error, hint })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn address_param(raw: &str) -> ApiResult<Address> {
    parse_address(raw).map_err(|e| ApiError::BadRequest(format!("invalid address {raw:?}: {e}")))
}

fn amount_param(raw: &str, decimals: u8) -> ApiResult<U256> {
    parse_units(raw, decimals).map_err(|e| ApiError::BadRequest(format!("invalid amount {raw:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /tokens`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Whole tokens; scaled by `decimals`.
    pub initial_supply: String,
    pub owner: String,
    pub is_mintable: bool,
    pub is_burnable: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    #[serde(flatten)]
    pub receipt: CreationReceipt,
    pub explorer_url: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub summary: TokenSummary,
    pub total_supply_formatted: String,
    pub explorer_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub token: Address,
    pub holder: Address,
    #[serde(with = "u256_decimal")]
    pub balance: U256,
    pub formatted: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllowanceResponse {
    pub token: Address,
    pub owner: Address,
    pub spender: Address,
    #[serde(with = "u256_decimal")]
    pub allowance: U256,
    pub formatted: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub caller: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub caller: String,
    pub spender: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferFromRequest {
    pub caller: String,
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct MintRequest {
    pub caller: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct BurnRequest {
    pub caller: String,
    pub from: String,
    pub amount: String,
}

/// Result of a ledger operation.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub token: Address,
    pub events: Vec<LedgerEvent>,
    pub logs: Vec<Log>,
}

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub id: Uuid,
    pub job: VerificationJob,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub chain_id: u64,
    pub network: String,
    pub factory: String,
    pub tokens_created: u64,
    pub tokens_hosted: usize,
    pub verification_enabled: bool,
    pub verifications: usize,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: returns node status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (factory, tokens_created, tokens_hosted) = {
        let chain = state.chain.read();
        (
            chain.factory().address().to_checksum(None),
            chain.factory().nonce(),
            chain.token_count(),
        )
    };

    Json(StatusResponse {
        version: state.version.clone(),
        chain_id: state.explorer.chain_id,
        network: state.explorer.name.clone(),
        factory,
        tokens_created,
        tokens_hosted,
        verification_enabled: state.explorer.has_api_key(),
        verifications: state.verifications.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /tokens`: creates a token through the factory.
///
/// `decimals` above 18 is refused here; the factory itself accepts any
/// `uint8`.
async fn create_token_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateTokenRequest>,
) -> ApiResult<(StatusCode, Json<CreateTokenResponse>)> {
    if req.decimals > MAX_DECIMALS {
        return Err(ApiError::BadRequest(format!(
            "decimals must be between 0 and {MAX_DECIMALS}"
        )));
    }
    let params = TokenParams {
        name: req.name,
        symbol: req.symbol,
        decimals: req.decimals,
        initial_supply: amount_param(&req.initial_supply, req.decimals)?,
        owner: address_param(&req.owner)?,
        is_mintable: req.is_mintable,
        is_burnable: req.is_burnable,
    };

    let receipt = state.chain.write().create_token(params)?;

    state.metrics.tokens_created_total.inc();
    state.metrics.tokens_hosted.inc();
    let _ = state
        .event_tx
        .send(NodeEvent::TokenCreated(receipt.event.clone()));

    let explorer_url = state.explorer.address_url(&receipt.token);
    Ok((
        StatusCode::CREATED,
        Json(CreateTokenResponse {
            receipt,
            explorer_url,
        }),
    ))
}

/// `GET /tokens/:address`
async fn token_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<TokenResponse>> {
    let token = address_param(&address)?;
    let summary = state
        .chain
        .read()
        .token(&token)
        .map(|ledger| ledger.summary())
        .ok_or(ChainError::UnknownToken(token))?;

    Ok(Json(TokenResponse {
        total_supply_formatted: format_units(summary.total_supply, summary.decimals),
        explorer_url: state.explorer.address_url(&token),
        summary,
    }))
}

/// `GET /tokens/:address/balances/:holder`
async fn balance_handler(
    Path((address, holder)): Path<(String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<BalanceResponse>> {
    let token = address_param(&address)?;
    let holder = address_param(&holder)?;
    let chain = state.chain.read();
    let ledger = chain.token(&token).ok_or(ChainError::UnknownToken(token))?;
    let balance = ledger.balance_of(&holder);

    Ok(Json(BalanceResponse {
        token,
        holder,
        balance,
        formatted: format_units(balance, ledger.decimals()),
    }))
}

/// `GET /tokens/:address/allowances/:owner/:spender`
async fn allowance_handler(
    Path((address, owner, spender)): Path<(String, String, String)>,
    State(state): State<AppState>,
) -> ApiResult<Json<AllowanceResponse>> {
    let token = address_param(&address)?;
    let owner = address_param(&owner)?;
    let spender = address_param(&spender)?;
    let chain = state.chain.read();
    let ledger = chain.token(&token).ok_or(ChainError::UnknownToken(token))?;
    let allowance = ledger.allowance(&owner, &spender);

    Ok(Json(AllowanceResponse {
        token,
        owner,
        spender,
        allowance,
        formatted: format_units(allowance, ledger.decimals()),
    }))
}

async fn transfer_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let token = address_param(&address)?;
    let decimals = token_decimals(&state, &token)?;
    let op = LedgerOp::Transfer {
        caller: address_param(&req.caller)?,
        to: address_param(&req.to)?,
        amount: amount_param(&req.amount, decimals)?,
    };
    execute(&state, token, op)
}

async fn approve_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let token = address_param(&address)?;
    let decimals = token_decimals(&state, &token)?;
    let op = LedgerOp::Approve {
        caller: address_param(&req.caller)?,
        spender: address_param(&req.spender)?,
        amount: amount_param(&req.amount, decimals)?,
    };
    execute(&state, token, op)
}

async fn transfer_from_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<TransferFromRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let token = address_param(&address)?;
    let decimals = token_decimals(&state, &token)?;
    let op = LedgerOp::TransferFrom {
        caller: address_param(&req.caller)?,
        from: address_param(&req.from)?,
        to: address_param(&req.to)?,
        amount: amount_param(&req.amount, decimals)?,
    };
    execute(&state, token, op)
}

async fn mint_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<MintRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let token = address_param(&address)?;
    let decimals = token_decimals(&state, &token)?;
    let op = LedgerOp::Mint {
        caller: address_param(&req.caller)?,
        to: address_param(&req.to)?,
        amount: amount_param(&req.amount, decimals)?,
    };
    execute(&state, token, op)
}

async fn burn_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<BurnRequest>,
) -> ApiResult<Json<OperationResponse>> {
    let token = address_param(&address)?;
    let decimals = token_decimals(&state, &token)?;
    let op = LedgerOp::Burn {
        caller: address_param(&req.caller)?,
        from: address_param(&req.from)?,
        amount: amount_param(&req.amount, decimals)?,
    };
    execute(&state, token, op)
}

fn token_decimals(state: &AppState, token: &Address) -> ApiResult<u8> {
    state
        .chain
        .read()
        .token(token)
        .map(|ledger| ledger.decimals())
        .ok_or(ApiError::Chain(ChainError::UnknownToken(*token)))
}

/// Applies `op` under the write lock, then records and broadcasts the outcome.
fn execute(state: &AppState, token: Address, op: LedgerOp) -> ApiResult<Json<OperationResponse>> {
    let result = state.chain.write().apply(&token, &op);

    match result {
        Ok(events) => {
            state.metrics.record_ledger_op(op.name(), true);
            tracing::debug!(token = ?token, op = op.name(), events = events.len(), "ledger operation applied");

            let logs = events.iter().map(|e| e.to_log(token)).collect();
            for event in &events {
                let _ = state.event_tx.send(NodeEvent::Ledger {
                    token,
                    event: event.clone(),
                });
            }
            Ok(Json(OperationResponse {
                token,
                events,
                logs,
            }))
        }
        Err(e) => {
            state.metrics.record_ledger_op(op.name(), false);
            tracing::warn!(token = ?token, op = op.name(), error = %e, "ledger operation rejected");
            Err(e.into())
        }
    }
}

/// `POST /tokens/:address/verify`: starts a verification job.
///
/// Returns `202 Accepted` with the job id; progress is available at
/// `/verifications/:id` and on the WebSocket. Without an explorer API key
/// the request fails up front with `503`.
async fn verify_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<VerificationResponse>)> {
    let token = address_param(&address)?;
    let params = state
        .chain
        .read()
        .token(&token)
        .map(|ledger| ledger.params().clone())
        .ok_or(ChainError::UnknownToken(token))?;

    if !state.explorer.has_api_key() {
        return Err(ApiError::Verification(VerificationError::missing_api_key(
            &state.explorer.name,
        )));
    }

    let handle = state.verifier.spawn(token, params);
    let id = Uuid::new_v4();
    let job = handle.snapshot();
    let updates = handle.subscribe();
    state.verifications.insert(id, handle);
    track_verification(&state, id, updates);

    tracing::info!(%id, token = ?token, network = %state.explorer.name, "verification started");
    Ok((StatusCode::ACCEPTED, Json(VerificationResponse { id, job })))
}

/// Forwards a job's status changes to WebSocket subscribers, records its
/// outcome once terminal, and evicts it from `verifications` after the
/// retention window.
fn track_verification(state: &AppState, id: Uuid, mut updates: watch::Receiver<VerificationJob>) {
    let event_tx = state.event_tx.clone();
    let metrics = Arc::clone(&state.metrics);
    let verifications = Arc::clone(&state.verifications);
    let retention = state.verification_retention;
    metrics.verifications_started_total.inc();
    metrics.verifications_active.inc();

    tokio::spawn(async move {
        loop {
            let job = updates.borrow_and_update().clone();
            let terminal = job.status.is_terminal();
            if terminal {
                match job.status {
                    VerificationStatus::Verified => metrics.verifications_verified_total.inc(),
                    _ => metrics.verifications_failed_total.inc(),
                }
                metrics
                    .verification_status_checks_total
                    .inc_by(u64::from(job.status_checks));
                if let Some(finished) = job.finished_at {
                    let elapsed = (finished - job.submitted_at).num_milliseconds() as f64 / 1000.0;
                    metrics.verification_duration_seconds.observe(elapsed);
                }
            }
            let _ = event_tx.send(NodeEvent::Verification { id, job });

            if terminal {
                break;
            }
            if updates.changed().await.is_err() {
                // Job aborted without reaching a terminal state.
                metrics.verifications_failed_total.inc();
                break;
            }
        }
        metrics.verifications_active.dec();

        tokio::time::sleep(retention).await;
        if verifications.remove(&id).is_some() {
            tracing::debug!(%id, "finished verification evicted");
        }
    });
}

/// `GET /verifications/:id`
async fn verification_handler(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> ApiResult<Json<VerificationResponse>> {
    let job = state
        .verifications
        .get(&id)
        .map(|handle| handle.snapshot())
        .ok_or_else(|| ApiError::NotFound(format!("verification not found: {id}")))?;
    Ok(Json(VerificationResponse { id, job }))
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`NodeEvent`] messages. The connection is
/// read-only from the server's perspective; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokenforge_protocol::verification::{
        ExplorerResponse, PollPolicy, StatusQuery, VerifierApi, VerifySourceForm,
    };
    use tower::ServiceExt;

    const OWNER: &str = "0x000000000000000000000000000000000000000A";
    const ALICE: &str = "0x00000000000000000000000000000000000000A1";
    const BOB: &str = "0x00000000000000000000000000000000000000b2";

    /// Explorer double that accepts everything and verifies on first check.
    struct InstantExplorer;

    #[async_trait]
    impl VerifierApi for InstantExplorer {
        async fn submit(
            &self,
            _form: &VerifySourceForm,
        ) -> Result<ExplorerResponse, VerificationError> {
            Ok(ExplorerResponse {
                status: "1".into(),
                message: "OK".into(),
                result: "guid-test".into(),
            })
        }

        async fn check_status(
            &self,
            _query: &StatusQuery,
        ) -> Result<ExplorerResponse, VerificationError> {
            Ok(ExplorerResponse {
                status: "1".into(),
                message: "OK".into(),
                result: "Pass - Verified".into(),
            })
        }
    }

    fn test_app_state(api_key: Option<&str>) -> AppState {
        let explorer = ExplorerConfig::for_chain(97, api_key, None).unwrap();
        let verifier = VerificationOrchestrator::new(Arc::new(InstantExplorer), explorer)
            .with_policy(PollPolicy {
                first_delay: Duration::from_millis(1),
                interval: Duration::from_millis(1),
                max_attempts: 3,
            });
        AppState::new(
            "0.1.0-test".into(),
            Address::with_last_byte(0xf0),
            Arc::new(verifier),
            Arc::new(crate::metrics::NodeMetrics::new()),
        )
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    fn json(body: &[u8]) -> serde_json::Value {
        serde_json::from_slice(body).unwrap()
    }

    /// Creates the standard 1000-token test token and returns its address.
    async fn create_token(router: &Router, mintable: bool) -> String {
        let (status, body) = post_json(
            router,
            "/tokens",
            serde_json::json!({
                "name": "Test Token",
                "symbol": "TTK",
                "decimals": 18,
                "initialSupply": "1000",
                "owner": OWNER,
                "isMintable": mintable,
                "isBurnable": true,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));
        json(&body)["token"].as_str().unwrap().to_string()
    }

    async fn balance(router: &Router, token: &str, holder: &str) -> BalanceResponse {
        let (status, body) = get(router, &format!("/tokens/{token}/balances/{holder}")).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    // -- health & status ----------------------------------------------------

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state(None));
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_network_and_counts() {
        let router = create_router(test_app_state(Some("key")));
        create_token(&router, true).await;

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.chain_id, 97);
        assert_eq!(resp.network, "BSC Testnet");
        assert_eq!(resp.tokens_created, 1);
        assert_eq!(resp.tokens_hosted, 1);
        assert!(resp.verification_enabled);
    }

    // -- token lifecycle ----------------------------------------------------

    #[tokio::test]
    async fn create_token_returns_address_and_logs() {
        let router = create_router(test_app_state(None));
        let (status, body) = post_json(
            &router,
            "/tokens",
            serde_json::json!({
                "name": "Test Token",
                "symbol": "TTK",
                "decimals": 18,
                "initialSupply": "1000",
                "owner": OWNER,
                "isMintable": true,
                "isBurnable": true,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let resp = json(&body);
        assert_eq!(resp["event"]["initial_supply"], "1000000000000000000000");
        assert_eq!(resp["logs"].as_array().unwrap().len(), 2);
        assert!(resp["explorer_url"]
            .as_str()
            .unwrap()
            .starts_with("https://testnet.bscscan.com/address/0x"));

        let token = resp["token"].as_str().unwrap();
        let (status, body) = get(&router, &format!("/tokens/{token}")).await;
        assert_eq!(status, StatusCode::OK);
        let info = json(&body);
        assert_eq!(info["symbol"], "TTK");
        assert_eq!(info["total_supply_formatted"], "1000.0");
        assert_eq!(info["holders"], 1);
    }

    #[tokio::test]
    async fn create_token_rejects_decimals_above_18() {
        let router = create_router(test_app_state(None));
        let (status, body) = post_json(
            &router,
            "/tokens",
            serde_json::json!({
                "name": "T", "symbol": "T", "decimals": 19, "initialSupply": "1",
                "owner": OWNER, "isMintable": true, "isBurnable": true,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.error.contains("decimals"));
    }

    #[tokio::test]
    async fn create_token_rejects_bad_owner() {
        let router = create_router(test_app_state(None));
        let (status, _) = post_json(
            &router,
            "/tokens",
            serde_json::json!({
                "name": "T", "symbol": "T", "decimals": 18, "initialSupply": "1",
                "owner": "0x1234", "isMintable": true, "isBurnable": true,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mint_transfer_burn_flow() {
        let router = create_router(test_app_state(None));
        let token = create_token(&router, true).await;

        let (status, body) = post_json(
            &router,
            &format!("/tokens/{token}/mint"),
            serde_json::json!({ "caller": OWNER, "to": ALICE, "amount": "100" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["events"][0]["event"], "transfer");

        let (status, _) = post_json(
            &router,
            &format!("/tokens/{token}/transfer"),
            serde_json::json!({ "caller": ALICE, "to": BOB, "amount": "25.5" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = post_json(
            &router,
            &format!("/tokens/{token}/burn"),
            serde_json::json!({ "caller": OWNER, "from": ALICE, "amount": "50" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(balance(&router, &token, ALICE).await.formatted, "24.5");
        assert_eq!(balance(&router, &token, BOB).await.formatted, "25.5");

        let (_, body) = get(&router, &format!("/tokens/{token}")).await;
        assert_eq!(json(&body)["total_supply_formatted"], "1050.0");
    }

    #[tokio::test]
    async fn approve_and_transfer_from() {
        let router = create_router(test_app_state(None));
        let token = create_token(&router, true).await;

        let (status, _) = post_json(
            &router,
            &format!("/tokens/{token}/approve"),
            serde_json::json!({ "caller": OWNER, "spender": ALICE, "amount": "30" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = post_json(
            &router,
            &format!("/tokens/{token}/transfer-from"),
            serde_json::json!({ "caller": ALICE, "from": OWNER, "to": BOB, "amount": "20" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let events = json(&body)["events"].as_array().unwrap().clone();
        assert_eq!(events[0]["event"], "approval");
        assert_eq!(events[1]["event"], "transfer");

        let (status, body) =
            get(&router, &format!("/tokens/{token}/allowances/{OWNER}/{ALICE}")).await;
        assert_eq!(status, StatusCode::OK);
        let allowance: AllowanceResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(allowance.formatted, "10.0");
    }

    // -- rejections ---------------------------------------------------------

    #[tokio::test]
    async fn non_owner_mint_is_forbidden() {
        let router = create_router(test_app_state(None));
        let token = create_token(&router, true).await;

        let (status, body) = post_json(
            &router,
            &format!("/tokens/{token}/mint"),
            serde_json::json!({ "caller": ALICE, "to": ALICE, "amount": "1" }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "Not owner");
    }

    #[tokio::test]
    async fn minting_disabled_is_forbidden() {
        let router = create_router(test_app_state(None));
        let token = create_token(&router, false).await;

        let (status, body) = post_json(
            &router,
            &format!("/tokens/{token}/mint"),
            serde_json::json!({ "caller": OWNER, "to": ALICE, "amount": "1" }),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "Minting is disabled");
    }

    #[tokio::test]
    async fn overdraft_is_bad_request_with_revert_text() {
        let router = create_router(test_app_state(None));
        let token = create_token(&router, true).await;

        let (status, body) = post_json(
            &router,
            &format!("/tokens/{token}/transfer"),
            serde_json::json!({ "caller": ALICE, "to": BOB, "amount": "1" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(err.error, "ERC20: transfer amount exceeds balance");
    }

    #[tokio::test]
    async fn unknown_token_is_404() {
        let router = create_router(test_app_state(None));
        let (status, _) = get(
            &router,
            "/tokens/0x000000000000000000000000000000000000dead",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn too_many_fraction_digits_rejected() {
        let router = create_router(test_app_state(None));
        let (status, _) = post_json(
            &router,
            "/tokens",
            serde_json::json!({
                "name": "T", "symbol": "T", "decimals": 2, "initialSupply": "1.001",
                "owner": OWNER, "isMintable": true, "isBurnable": true,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    // -- verification -------------------------------------------------------

    #[tokio::test]
    async fn verify_without_api_key_is_503_with_hint() {
        let router = create_router(test_app_state(None));
        let token = create_token(&router, true).await;

        let (status, body) =
            post_json(&router, &format!("/tokens/{token}/verify"), serde_json::json!({})).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let err: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(err.hint.is_some());
    }

    #[tokio::test]
    async fn verify_runs_job_to_verified() {
        let state = test_app_state(Some("key"));
        let router = create_router(state.clone());
        let token = create_token(&router, true).await;

        let (status, body) =
            post_json(&router, &format!("/tokens/{token}/verify"), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let id: Uuid = serde_json::from_value(json(&body)["id"].clone()).unwrap();

        let mut updates = state.verifications.get(&id).unwrap().subscribe();
        updates
            .wait_for(|job| job.status.is_terminal())
            .await
            .unwrap();

        let (status, body) = get(&router, &format!("/verifications/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        let resp = json(&body);
        assert_eq!(resp["job"]["status"]["state"], "verified");
        assert_eq!(resp["job"]["tracking_id"], "guid-test");
    }

    #[tokio::test]
    async fn finished_verification_is_evicted_after_retention() {
        let state = test_app_state(Some("key"))
            .with_verification_retention(Duration::from_millis(20));
        let mut events = state.event_tx.subscribe();
        let router = create_router(state.clone());
        let token = create_token(&router, true).await;

        let (status, body) =
            post_json(&router, &format!("/tokens/{token}/verify"), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let id: Uuid = serde_json::from_value(json(&body)["id"].clone()).unwrap();

        loop {
            match events.recv().await.unwrap() {
                NodeEvent::Verification { job, .. } if job.status.is_terminal() => break,
                _ => {}
            }
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while state.verifications.contains_key(&id) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("finished job should be evicted");

        assert!(state.verifications.is_empty());
        let (status, _) = get(&router, &format!("/verifications/{id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_verification_is_404() {
        let router = create_router(test_app_state(None));
        let (status, _) = get(&router, &format!("/verifications/{}", Uuid::new_v4())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ledger_events_are_broadcast() {
        let state = test_app_state(None);
        let mut rx = state.event_tx.subscribe();
        let router = create_router(state);
        let token = create_token(&router, true).await;

        post_json(
            &router,
            &format!("/tokens/{token}/transfer"),
            serde_json::json!({ "caller": OWNER, "to": BOB, "amount": "1" }),
        )
        .await;

        assert!(matches!(rx.recv().await.unwrap(), NodeEvent::TokenCreated(_)));
        match rx.recv().await.unwrap() {
            NodeEvent::Ledger { event, .. } => {
                assert!(matches!(event, LedgerEvent::Transfer { .. }));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
