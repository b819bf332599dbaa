//! Admin API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`;
//! domain errors map onto HTTP statuses in one place (`error_response`).

use axum::{
    extract::{Path, Query as UrlQuery, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::tier_ladder;
use crate::engine::{
    investments::Investments,
    reconciler::Reconciler,
    shares::Shares,
    tiers,
};
use crate::store::Ledger;
use crate::types::{Investment, LedgerError, Tier, Transaction, TxStatus};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub service_name: String,
    pub ledger: Ledger,
    pub reconciler: Reconciler,
    pub investments: Investments,
    pub shares: Shares,
}

impl DashboardState {
    pub fn new(service_name: &str, ledger: Ledger) -> Self {
        Self {
            service_name: service_name.to_string(),
            ledger: ledger.clone(),
            reconciler: Reconciler::new(ledger.clone()),
            investments: Investments::new(ledger.clone()),
            shares: Shares::new(ledger),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct OverviewResponse {
    pub service: String,
    pub backend: String,
    pub total_users: u64,
    pub pending_transactions: u64,
    pub total_balance: Decimal,
    pub total_deposits: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionResponse {
    pub tx_id: String,
    pub old_status: TxStatus,
    pub new_status: TxStatus,
    pub balance: Decimal,
    pub total_deposit: Decimal,
    pub notified: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierResponse {
    pub active: Tier,
    pub next: Option<Tier>,
    pub progress_percent: u32,
    pub deposit_total: Decimal,
    pub referral_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingResponse {
    pub total_shares: Decimal,
    pub cost_basis: Decimal,
    pub market_value: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceParams {
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Map a handler failure onto an HTTP status plus a JSON error body.
fn error_response(err: anyhow::Error) -> (StatusCode, Json<ErrorBody>) {
    let status = match err.downcast_ref::<LedgerError>() {
        Some(LedgerError::ProfileNotFound(_)) | Some(LedgerError::TransactionNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        Some(LedgerError::InvalidAmount(_))
        | Some(LedgerError::InsufficientBalance { .. })
        | Some(LedgerError::KycNotApproved)
        | Some(LedgerError::WithdrawalPasswordNotSet)
        | Some(LedgerError::WithdrawalPasswordMismatch)
        | Some(LedgerError::InvalidAddress { .. })
        | Some(LedgerError::WithdrawalLimitExceeded(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody { error: err.to_string() }))
}

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/overview
pub async fn get_overview(State(state): State<AppState>) -> HandlerResult<OverviewResponse> {
    let (total_users, profiles) = state.ledger.list_profiles().await.map_err(error_response)?;
    let pending = state
        .ledger
        .pending_transaction_count()
        .await
        .map_err(error_response)?;

    Ok(Json(OverviewResponse {
        service: state.service_name.clone(),
        backend: state.ledger.backend_name().to_string(),
        total_users,
        pending_transactions: pending,
        total_balance: profiles.iter().map(|p| p.balance).sum(),
        total_deposits: profiles.iter().map(|p| p.total_deposit).sum(),
    }))
}

/// GET /api/users/:user_id/transactions
pub async fn get_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> HandlerResult<Vec<Transaction>> {
    let txs = state
        .ledger
        .transactions_for(&user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(txs))
}

/// POST /api/transactions/:id/status
///
/// The admin review action: moves a transaction to the requested status and
/// reconciles the owner's funds accordingly.
pub async fn post_transaction_status(
    State(state): State<AppState>,
    Path(tx_id): Path<String>,
    Json(change): Json<StatusChange>,
) -> HandlerResult<TransitionResponse> {
    let new_status: TxStatus = change.status.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: format!("Unknown transaction status: {}", change.status),
            }),
        )
    })?;

    let tx = state
        .ledger
        .transaction_by_id(&tx_id)
        .await
        .map_err(error_response)?;
    let outcome = state
        .reconciler
        .transition(&tx, new_status)
        .await
        .map_err(error_response)?;

    Ok(Json(TransitionResponse {
        tx_id: outcome.tx_id,
        old_status: outcome.old_status,
        new_status: outcome.new_status,
        balance: outcome.balance,
        total_deposit: outcome.total_deposit,
        notified: outcome.notified,
    }))
}

/// GET /api/users/:user_id/tier
pub async fn get_user_tier(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> HandlerResult<TierResponse> {
    let profile = state
        .ledger
        .profile_by_user(&user_id)
        .await
        .map_err(error_response)?;
    let deposit_total = state
        .ledger
        .approved_deposit_total(&user_id)
        .await
        .map_err(error_response)?;
    let referrals = state
        .ledger
        .referral_count(&profile.referee_id)
        .await
        .map_err(error_response)?;

    let standing = tiers::standing(deposit_total, referrals, &tier_ladder());
    Ok(Json(TierResponse {
        active: standing.active,
        next: standing.next,
        progress_percent: standing.progress_percent,
        deposit_total,
        referral_count: referrals,
    }))
}

/// GET /api/users/:user_id/investments
pub async fn get_user_investments(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> HandlerResult<Vec<Investment>> {
    let investments = state
        .investments
        .list_for(&user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(investments))
}

/// GET /api/users/:user_id/shares?price=...
pub async fn get_user_shares(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    UrlQuery(params): UrlQuery<PriceParams>,
) -> HandlerResult<HoldingResponse> {
    let holding = state
        .shares
        .holding_for(&user_id, params.price)
        .await
        .map_err(error_response)?;
    Ok(Json(HoldingResponse {
        total_shares: holding.total_shares,
        cost_basis: holding.cost_basis,
        market_value: holding.market_value,
        unit_price: params.price,
    }))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
