use alloy::primitives::{Address, B256};
use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tranche_chain::TokenDispenser;
use tranche_core::MilestoneFailurePolicy;
use tranche_rounds::{
    ClaimStatus, Faucet, FaucetError, RoundMetadata, faucet::lookup_status,
    persist::RoundCreatedData,
};
use tranche_storage::{
    RoundStore, WalletStore,
    models::{Milestone, Round},
};

use crate::projects::{self, Project};

/// Shared application state.
pub struct AppState<S, D> {
    pub store: S,
    pub faucet: Option<Faucet<S, D>>,
    pub policy: MilestoneFailurePolicy,
    pub cooldown: Duration,
    pub projects: RwLock<Vec<Project>>,
}

impl<S, D> AppState<S, D> {
    pub fn new(
        store: S,
        faucet: Option<Faucet<S, D>>,
        policy: MilestoneFailurePolicy,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            faucet,
            policy,
            cooldown,
            projects: RwLock::new(projects::fixtures()),
        }
    }
}

pub fn router<S, D>(state: Arc<AppState<S, D>>) -> Router
where
    S: RoundStore + WalletStore + 'static,
    D: TokenDispenser + 'static,
{
    Router::new()
        .route(
            "/api/rounds",
            get(list_rounds::<S, D>).post(create_round::<S, D>),
        )
        .route("/api/rounds/:id", get(get_round::<S, D>))
        .route("/api/investments", post(record_investment::<S, D>))
        .route(
            "/api/faucet",
            get(faucet_status::<S, D>).post(claim_faucet::<S, D>),
        )
        .route(
            "/api/projects",
            get(projects::list::<S, D>).post(projects::create::<S, D>),
        )
        .route("/health", get(health))
        .with_state(state)
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
}

pub fn json_ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Failure reply: `{success: false, message}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": false, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Malformed or mistyped JSON bodies get the same failure shape as every
/// other rejected request.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ─── Query Params ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PaginationParams {
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FaucetQuery {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FaucetClaimBody {
    wallet_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvestmentBody {
    round_id: Option<i64>,
    investor_address: Option<String>,
    amount: Option<String>,
}

#[derive(Serialize)]
struct RoundDetail {
    round: Round,
    milestones: Vec<Milestone>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FaucetStatusReply {
    success: bool,
    #[serde(flatten)]
    status: ClaimStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FaucetClaimReply {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_hashes: Option<Vec<B256>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_claim_time: Option<DateTime<Utc>>,
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// POST /api/rounds — store metadata for a round created on-chain.
async fn create_round<S: RoundStore, D>(
    State(state): State<Arc<AppState<S, D>>>,
    payload: Result<Json<RoundMetadata>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload?;
    let (round, milestones) = body
        .into_records()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let created = state.store.insert_round(&round).await.map_err(|e| {
        tracing::error!(round_id = round.round_id, error = %e, "Round insert failed");
        ApiError::internal(format!("Failed to create round: {e}"))
    })?;

    if !milestones.is_empty() {
        if let Err(e) = state.store.insert_milestones(&milestones).await {
            tracing::error!(round_id = created.round_id, error = %e, "Milestone insert failed");
            match state.policy {
                MilestoneFailurePolicy::Keep => {
                    tracing::warn!(
                        round_id = created.round_id,
                        "Round row kept without milestones"
                    );
                }
                MilestoneFailurePolicy::Compensate => {
                    match state.store.delete_round(created.round_id).await {
                        Ok(()) => tracing::warn!(
                            round_id = created.round_id,
                            "Round row removed after milestone failure"
                        ),
                        Err(de) => tracing::error!(
                            round_id = created.round_id,
                            error = %de,
                            "Could not remove round row after milestone failure"
                        ),
                    }
                }
            }
            return Err(ApiError::internal(format!("Failed to create milestones: {e}")));
        }
    }

    tracing::info!(
        round_id = created.round_id,
        milestones = milestones.len(),
        "Round metadata stored"
    );
    Ok(json_ok(RoundCreatedData {
        round_id: created.round_id,
    }))
}

/// GET /api/rounds — most recent rounds first.
async fn list_rounds<S: RoundStore, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let rounds = state
        .store
        .list_rounds(limit)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(json_ok(rounds))
}

/// GET /api/rounds/:id — a round and its milestones.
async fn get_round<S: RoundStore, D>(
    State(state): State<Arc<AppState<S, D>>>,
    Path(round_id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let round = state
        .store
        .get_round(round_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Round not found"))?;
    let milestones = state
        .store
        .get_milestones(round_id)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(json_ok(RoundDetail { round, milestones }))
}

/// POST /api/investments — add to an investor's cumulative total.
async fn record_investment<S: RoundStore, D>(
    State(state): State<Arc<AppState<S, D>>>,
    payload: Result<Json<InvestmentBody>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload?;
    let (Some(round_id), Some(investor), Some(amount)) =
        (body.round_id, body.investor_address, body.amount)
    else {
        return Err(ApiError::bad_request(
            "roundId, investorAddress and amount are required",
        ));
    };
    let investor: Address = investor
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid investor address"))?;
    let amount = amount.trim();
    if !amount.parse::<f64>().is_ok_and(|a| a.is_finite() && a > 0.0) {
        return Err(ApiError::bad_request("Amount must be a positive number"));
    }

    let investment = state
        .store
        .upsert_investment(round_id, &format!("{investor:#x}"), amount)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to record investment: {e}")))?;
    Ok(json_ok(investment))
}

fn parse_wallet(raw: Option<&str>) -> ApiResult<Address> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Wallet address is required"))?;
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid wallet address"))
}

/// GET /api/faucet?address= — cooldown status for a wallet.
async fn faucet_status<S: WalletStore, D: TokenDispenser>(
    State(state): State<Arc<AppState<S, D>>>,
    Query(query): Query<FaucetQuery>,
) -> ApiResult<impl IntoResponse> {
    let address = parse_wallet(query.address.as_deref())?;
    let status = lookup_status(&state.store, address, Utc::now(), state.cooldown)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(FaucetStatusReply {
        success: true,
        status,
    }))
}

/// POST /api/faucet — send native gas and test tokens to a wallet.
async fn claim_faucet<S: WalletStore, D: TokenDispenser>(
    State(state): State<Arc<AppState<S, D>>>,
    payload: Result<Json<FaucetClaimBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let address = parse_wallet(body.wallet_address.as_deref())?;
    let Some(faucet) = state.faucet.as_ref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Faucet is not configured",
        ));
    };

    match faucet.claim(address, Utc::now()).await {
        Ok(receipt) => {
            tracing::info!(wallet = %address, "Faucet claim succeeded");
            Ok(Json(FaucetClaimReply {
                success: true,
                message: "Tokens sent".to_string(),
                transaction_hashes: Some(receipt.transaction_hashes),
                next_claim_time: Some(receipt.next_claim_time),
            })
            .into_response())
        }
        Err(FaucetError::CoolingDown {
            next_claim_time,
            hours_left,
        }) => Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(FaucetClaimReply {
                success: false,
                message: format!("Please wait {hours_left} more hour(s) before claiming again"),
                transaction_hashes: None,
                next_claim_time: Some(next_claim_time),
            }),
        )
            .into_response()),
        Err(FaucetError::ClaimInProgress) => Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            FaucetError::ClaimInProgress.to_string(),
        )),
        Err(e) => {
            tracing::error!(wallet = %address, error = %e, "Faucet claim failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}
