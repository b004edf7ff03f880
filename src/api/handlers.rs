//! REST API handlers for ledger operations
//!
//! Amounts travel as decimal strings: token amounts in subunits, native
//! amounts in wei.

use crate::core::{Address, TokenError};
use crate::storage::Storage;
use crate::token::{EventRecord, MicroEth, TokenMetadata};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers.
///
/// The write lock serializes every mutating operation.
#[derive(Clone)]
pub struct ApiState {
    pub token: Arc<RwLock<MicroEth>>,
    pub storage: Arc<Storage>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub kind: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
            kind: "BadRequest".to_string(),
        }),
    )
}

fn token_error(e: TokenError) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: e.to_string(),
            kind: e.kind().to_string(),
        }),
    )
}

fn parse_address(text: &str) -> Result<Address, (StatusCode, Json<ApiError>)> {
    text.parse()
        .map_err(|e| bad_request(format!("Invalid address {:?}: {}", text, e)))
}

fn parse_amount(text: &str) -> Result<u128, (StatusCode, Json<ApiError>)> {
    let digits = text.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_request("Invalid amount: must be a non-negative integer"));
    }
    digits
        .parse()
        .map_err(|_| bad_request("Invalid amount: too large"))
}

/// Save after a committed mutation, restoring `snapshot` in memory if the
/// write fails. The write lock is still held.
fn persist(
    state: &ApiState,
    token: &mut MicroEth,
    snapshot: MicroEth,
) -> Result<(), (StatusCode, Json<ApiError>)> {
    match state.storage.save(token) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Failed to save ledger, rolling back: {}", e);
            *token = snapshot;
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    error: format!("Failed to save ledger: {}", e),
                    kind: "StorageError".to_string(),
                }),
            ))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TokenInfo {
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    pub exchange_rate: String,
    /// Smallest withdrawable amount; withdrawals must be multiples of it
    pub withdraw_step: Option<String>,
    pub total_supply: String,
    pub reserve: String,
    pub holder_count: usize,
    pub event_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SupplyResponse {
    pub total_supply: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub address: String,
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct AllowanceResponse {
    pub owner: String,
    pub spender: String,
    pub allowance: String,
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub holder: String,
    pub minted: String,
    pub cost: String,
    pub refund: String,
    pub sequence: u64,
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub holder: String,
    pub burned: String,
    pub paid: String,
    pub sequence: u64,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub sequence: u64,
}

#[derive(Debug, Serialize)]
pub struct ApprovalResponse {
    pub owner: String,
    pub spender: String,
    pub amount: String,
    pub sequence: u64,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub healthy: bool,
    pub conserved: bool,
    pub backed: bool,
    pub total_supply: String,
    pub reserve: String,
    pub holder_count: usize,
    pub event_count: usize,
}

// ============================================================================
// Request Types
// ============================================================================

/// Deposit or plain payment
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub from: String,
    /// Wei attached to the call
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawRequest {
    pub from: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub owner: String,
    pub spender: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferFromRequest {
    pub spender: String,
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct AllowanceQuery {
    pub owner: String,
    pub spender: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub since: Option<u64>,
    pub limit: Option<usize>,
}

/// Default page size for event listing
const DEFAULT_EVENT_LIMIT: usize = 100;

// ============================================================================
// Query Endpoints
// ============================================================================

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/token - Metadata and totals
pub async fn get_token_info(State(state): State<ApiState>) -> Json<TokenInfo> {
    let token = state.token.read().await;

    Json(TokenInfo {
        metadata: token.metadata(),
        exchange_rate: token.exchange_rate().to_string(),
        withdraw_step: token
            .converter()
            .withdraw_step()
            .ok()
            .map(|step| step.to_string()),
        total_supply: token.total_supply().to_string(),
        reserve: token.reserve().to_string(),
        holder_count: token.holders().len(),
        event_count: token.events().len(),
    })
}

/// GET /api/supply
pub async fn get_supply(State(state): State<ApiState>) -> Json<SupplyResponse> {
    let token = state.token.read().await;
    Json(SupplyResponse {
        total_supply: token.total_supply().to_string(),
    })
}

/// GET /api/balances/{address}
pub async fn get_balance(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<BalanceResponse> {
    let holder = parse_address(&address)?;
    let token = state.token.read().await;

    Ok(Json(BalanceResponse {
        address: holder.to_string(),
        balance: token.balance_of(&holder).to_string(),
    }))
}

/// GET /api/allowance?owner=..&spender=..
pub async fn get_allowance(
    State(state): State<ApiState>,
    Query(query): Query<AllowanceQuery>,
) -> ApiResult<AllowanceResponse> {
    let owner = parse_address(&query.owner)?;
    let spender = parse_address(&query.spender)?;
    let token = state.token.read().await;

    Ok(Json(AllowanceResponse {
        owner: owner.to_string(),
        spender: spender.to_string(),
        allowance: token.allowance(&owner, &spender).to_string(),
    }))
}

/// GET /api/events?since=..&limit=..
pub async fn get_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventRecord>> {
    let token = state.token.read().await;
    let limit = query.limit.unwrap_or(DEFAULT_EVENT_LIMIT);

    let records = token
        .events()
        .since(query.since.unwrap_or(0))
        .iter()
        .take(limit)
        .cloned()
        .collect();
    Json(records)
}

/// GET /api/events/{sequence}
pub async fn get_event(
    State(state): State<ApiState>,
    Path(sequence): Path<u64>,
) -> ApiResult<EventRecord> {
    let token = state.token.read().await;

    match token.events().get(sequence) {
        Some(record) => Ok(Json(record.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: format!("Event {} not found", sequence),
                kind: "NotFound".to_string(),
            }),
        )),
    }
}

/// GET /api/audit
pub async fn get_audit(State(state): State<ApiState>) -> Json<AuditResponse> {
    let report = state.token.read().await.audit();

    Json(AuditResponse {
        healthy: report.is_healthy(),
        conserved: report.conserved(),
        backed: report.backed(),
        total_supply: report.total_supply.to_string(),
        reserve: report.reserve.to_string(),
        holder_count: report.holder_count,
        event_count: report.event_count,
    })
}

// ============================================================================
// Mutating Endpoints
// ============================================================================

/// POST /api/deposit
pub async fn deposit(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<DepositResponse> {
    deposit_with(state, req, false).await
}

/// POST /api/receive - Plain payment, same as a deposit
pub async fn receive(
    State(state): State<ApiState>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<DepositResponse> {
    deposit_with(state, req, true).await
}

async fn deposit_with(
    state: ApiState,
    req: DepositRequest,
    plain_payment: bool,
) -> ApiResult<DepositResponse> {
    let caller = parse_address(&req.from)?;
    let value = parse_amount(&req.value)?;

    let mut token = state.token.write().await;
    let snapshot = token.clone();
    let result = if plain_payment {
        token.receive(&caller, value)
    } else {
        token.deposit(&caller, value)
    };
    let receipt = result.map_err(token_error)?;
    persist(&state, &mut token, snapshot)?;

    Ok(Json(DepositResponse {
        holder: receipt.holder.to_string(),
        minted: receipt.minted.to_string(),
        cost: receipt.cost.to_string(),
        refund: receipt.refund.to_string(),
        sequence: receipt.sequence,
    }))
}

/// POST /api/withdraw
pub async fn withdraw(
    State(state): State<ApiState>,
    Json(req): Json<WithdrawRequest>,
) -> ApiResult<WithdrawResponse> {
    let caller = parse_address(&req.from)?;
    let amount = parse_amount(&req.amount)?;

    let mut token = state.token.write().await;
    let snapshot = token.clone();
    let receipt = token.withdraw(&caller, amount).map_err(token_error)?;
    persist(&state, &mut token, snapshot)?;

    Ok(Json(WithdrawResponse {
        holder: receipt.holder.to_string(),
        burned: receipt.burned.to_string(),
        paid: receipt.paid.to_string(),
        sequence: receipt.sequence,
    }))
}

/// POST /api/transfer
pub async fn transfer(
    State(state): State<ApiState>,
    Json(req): Json<TransferRequest>,
) -> ApiResult<TransferResponse> {
    let from = parse_address(&req.from)?;
    let to = parse_address(&req.to)?;
    let amount = parse_amount(&req.amount)?;

    let mut token = state.token.write().await;
    let snapshot = token.clone();
    let sequence = token.transfer(&from, &to, amount).map_err(token_error)?;
    persist(&state, &mut token, snapshot)?;

    Ok(Json(TransferResponse {
        from: from.to_string(),
        to: to.to_string(),
        amount: amount.to_string(),
        sequence,
    }))
}

/// POST /api/approve
pub async fn approve(
    State(state): State<ApiState>,
    Json(req): Json<ApproveRequest>,
) -> ApiResult<ApprovalResponse> {
    let owner = parse_address(&req.owner)?;
    let spender = parse_address(&req.spender)?;
    let amount = parse_amount(&req.amount)?;

    let mut token = state.token.write().await;
    let snapshot = token.clone();
    let sequence = token
        .approve(&owner, &spender, amount)
        .map_err(token_error)?;
    persist(&state, &mut token, snapshot)?;

    Ok(Json(ApprovalResponse {
        owner: owner.to_string(),
        spender: spender.to_string(),
        amount: amount.to_string(),
        sequence,
    }))
}

/// POST /api/transferFrom
pub async fn transfer_from(
    State(state): State<ApiState>,
    Json(req): Json<TransferFromRequest>,
) -> ApiResult<TransferResponse> {
    let spender = parse_address(&req.spender)?;
    let from = parse_address(&req.from)?;
    let to = parse_address(&req.to)?;
    let amount = parse_amount(&req.amount)?;

    let mut token = state.token.write().await;
    let snapshot = token.clone();
    let sequence = token
        .transfer_from(&spender, &from, &to, amount)
        .map_err(token_error)?;
    persist(&state, &mut token, snapshot)?;

    Ok(Json(TransferResponse {
        from: from.to_string(),
        to: to.to_string(),
        amount: amount.to_string(),
        sequence,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;

    const ALICE: &str = "0x0101010101010101010101010101010101010101";
    const BOB: &str = "0x0202020202020202020202020202020202020202";
    const NULL: &str = "0x0000000000000000000000000000000000000000";

    fn test_state() -> (tempfile::TempDir, ApiState) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        let state = ApiState {
            token: Arc::new(RwLock::new(MicroEth::default())),
            storage: Arc::new(storage),
        };
        (dir, state)
    }

    async fn deposit_micro(state: &ApiState, from: &str, micro: u128) -> DepositResponse {
        let Json(resp) = deposit(
            State(state.clone()),
            Json(DepositRequest {
                from: from.to_string(),
                value: (micro * 1_000_000_000_000).to_string(),
            }),
        )
        .await
        .unwrap();
        resp
    }

    #[tokio::test]
    async fn test_deposit_and_balance() {
        let (_dir, state) = test_state();
        let resp = deposit_micro(&state, ALICE, 100).await;

        assert_eq!(resp.minted, (100 * 10u128.pow(18)).to_string());
        assert_eq!(resp.refund, "0");
        assert_eq!(resp.sequence, 0);

        let Json(balance) = get_balance(State(state.clone()), Path(ALICE.to_string()))
            .await
            .unwrap();
        assert_eq!(balance.balance, resp.minted);

        // Every mutation is saved
        assert!(state.storage.exists());
    }

    #[tokio::test]
    async fn test_deposit_below_minimum_kind() {
        let (_dir, state) = test_state();
        let err = deposit(
            State(state.clone()),
            Json(DepositRequest {
                from: ALICE.to_string(),
                value: "999".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::BAD_REQUEST);
        assert_eq!(err.1.kind, "BelowMinimum");
    }

    #[tokio::test]
    async fn test_receive_mints() {
        let (_dir, state) = test_state();
        let Json(resp) = receive(
            State(state.clone()),
            Json(DepositRequest {
                from: BOB.to_string(),
                value: "1500000000000".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.refund, "500000000000");
        assert_eq!(state.token.read().await.total_supply(), 10u128.pow(18));
    }

    #[tokio::test]
    async fn test_transfer_to_null_rejected() {
        let (_dir, state) = test_state();
        deposit_micro(&state, ALICE, 10).await;

        let err = transfer(
            State(state.clone()),
            Json(TransferRequest {
                from: ALICE.to_string(),
                to: NULL.to_string(),
                amount: "1".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1.kind, "InvalidRecipient");
    }

    #[tokio::test]
    async fn test_approve_transfer_from_withdraw() {
        let (_dir, state) = test_state();
        deposit_micro(&state, ALICE, 10).await;
        let micro = 10u128.pow(18).to_string();

        approve(
            State(state.clone()),
            Json(ApproveRequest {
                owner: ALICE.to_string(),
                spender: BOB.to_string(),
                amount: micro.clone(),
            }),
        )
        .await
        .unwrap();

        let Json(moved) = transfer_from(
            State(state.clone()),
            Json(TransferFromRequest {
                spender: BOB.to_string(),
                from: ALICE.to_string(),
                to: BOB.to_string(),
                amount: micro.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(moved.sequence, 2);

        let Json(allowance) = get_allowance(
            State(state.clone()),
            Query(AllowanceQuery {
                owner: ALICE.to_string(),
                spender: BOB.to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(allowance.allowance, "0");

        let Json(paid) = withdraw(
            State(state.clone()),
            Json(WithdrawRequest {
                from: BOB.to_string(),
                amount: micro,
            }),
        )
        .await
        .unwrap();
        assert_eq!(paid.paid, "1000000000000");

        let Json(audit) = get_audit(State(state.clone())).await;
        assert!(audit.healthy);
    }

    #[tokio::test]
    async fn test_events_paging() {
        let (_dir, state) = test_state();
        for _ in 0..3 {
            deposit_micro(&state, ALICE, 1).await;
        }

        let Json(events) = get_events(
            State(state.clone()),
            Query(EventsQuery {
                since: Some(1),
                limit: Some(1),
            }),
        )
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 1);
    }

    #[tokio::test]
    async fn test_token_info_reports_withdraw_step() {
        let (_dir, state) = test_state();
        let Json(info) = get_token_info(State(state.clone())).await;

        assert_eq!(info.metadata.symbol, "uETH");
        assert_eq!(info.metadata.decimals, 18);
        assert_eq!(info.withdraw_step.as_deref(), Some("1000000"));

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["name"], "microETH");
        assert_eq!(json["withdraw_step"], "1000000");
    }

    #[tokio::test]
    async fn test_get_event_by_sequence() {
        let (_dir, state) = test_state();
        deposit_micro(&state, ALICE, 1).await;

        let Json(record) = get_event(State(state.clone()), Path(0)).await.unwrap();
        assert_eq!(record.sequence, 0);

        let err = get_event(State(state.clone()), Path(1)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
        assert_eq!(err.1.kind, "NotFound");
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("ledger");
        let storage = Storage::new(StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        })
        .unwrap();
        let state = ApiState {
            token: Arc::new(RwLock::new(MicroEth::default())),
            storage: Arc::new(storage),
        };

        // Nothing can be written once the data directory is a plain file
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, b"not a directory").unwrap();

        let err = deposit(
            State(state.clone()),
            Json(DepositRequest {
                from: ALICE.to_string(),
                value: "1000000000000".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.1.kind, "StorageError");

        let token = state.token.read().await;
        assert_eq!(token.total_supply(), 0);
        assert_eq!(token.reserve(), 0);
        assert!(token.events().is_empty());
    }

    #[tokio::test]
    async fn test_null_owner_cannot_approve() {
        let (_dir, state) = test_state();
        let err = approve(
            State(state.clone()),
            Json(ApproveRequest {
                owner: NULL.to_string(),
                spender: BOB.to_string(),
                amount: "1".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.1.kind, "InvalidSender");
        assert!(state.token.read().await.events().is_empty());
    }

    #[test]
    fn test_parse_amount_digits_only() {
        assert_eq!(parse_amount("42").unwrap(), 42);
        assert_eq!(parse_amount(" 7 ").unwrap(), 7);
        for bad in ["+5", "-5", "", "1.5", "0x10", "1_000"] {
            let err = parse_amount(bad).unwrap_err();
            assert_eq!(err.1.kind, "BadRequest", "accepted {:?}", bad);
        }
        assert!(parse_amount(&format!("{}0", u128::MAX)).is_err());
    }

    #[tokio::test]
    async fn test_malformed_input() {
        let (_dir, state) = test_state();

        let err = get_balance(State(state.clone()), Path("0x12".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.1.kind, "BadRequest");

        let err = withdraw(
            State(state.clone()),
            Json(WithdrawRequest {
                from: ALICE.to_string(),
                amount: "-5".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.1.kind, "BadRequest");
    }
}
