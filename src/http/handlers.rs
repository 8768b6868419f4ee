//! Endpoint handlers for the Relayer's HTTP surface.

use super::rate_limit::RateLimitTier;
use super::AppState;
use crate::error::{RelayerError, RelayerResult};
use crate::types::{Addr, BigAmount, MarketStatus, Outcome};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

pub fn routes(state: Arc<AppState>) -> Router {
    let write_limited = Router::new()
        .route("/api/markets/{address}/sync", post(sync_market))
        .route("/api/attestations", post(submit_attestation))
        .route_layer(middleware::from_fn_with_state(state.clone(), write_rate_limit));

    let default_limited = Router::new()
        .route("/health/detailed", get(health_detailed))
        .route("/health/metrics", get(health_metrics))
        .route("/health/queue", get(health_queue))
        .route("/api/markets", get(list_markets))
        .route("/api/markets/{address}", get(get_market))
        .route("/api/markets/{address}/participants", get(get_participants))
        .route("/api/markets/{address}/proposal", get(get_proposal))
        .route("/api/markets/predict-address", post(predict_address))
        .route("/api/markets/{address}/status", get(get_status))
        .route("/api/attestations", get(list_attestations))
        .route("/api/attestations/{market}", get(attestations_by_market))
        .route("/api/attestations/{market}/count", get(attestations_count))
        .route("/api/attestations/{market}", delete(delete_attestations))
        .route_layer(middleware::from_fn_with_state(state.clone(), default_rate_limit));

    Router::new()
        .route("/health", get(health))
        .merge(write_limited)
        .merge(default_limited)
        .with_state(state)
}

async fn default_rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    rate_limit(&state, RateLimitTier::Default, addr, request, next).await
}

async fn write_rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    rate_limit(&state, RateLimitTier::Write, addr, request, next).await
}

async fn rate_limit(
    state: &AppState,
    tier: RateLimitTier,
    addr: SocketAddr,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    if state.rate_limiter.check(tier, addr.ip()) {
        next.run(request).await
    } else {
        RelayerError::RateLimitExceeded.into_response()
    }
}

fn envelope(data: impl Serialize) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

fn parse_addr(raw: &str) -> RelayerResult<Addr> {
    raw.parse::<Addr>()
        .map_err(|_| RelayerError::Validation(format!("invalid address: {raw}")))
}

fn parse_outcome(raw: &str) -> RelayerResult<Outcome> {
    raw.parse::<Outcome>()
        .map_err(|_| RelayerError::Validation("outcome must be \"0\" or \"1\"".to_string()))
}

// --- /health -----------------------------------------------------------

#[tracing::instrument(skip_all)]
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    envelope(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}

#[tracing::instrument(skip_all)]
async fn health_detailed(State(state): State<Arc<AppState>>) -> Response {
    let db_ok = state.store.ping().await.is_ok();
    let market_counts = state.store.market_counts_by_status().await.ok();
    let attestations = state.store.total_attestation_count().await.ok();
    let participants = state.store.total_participant_count().await.ok();
    let pending = state.store.pending_finalization_count().await.ok();
    let retrying = match state.store.list_pending_queue_entries().await {
        Ok(entries) => Some(entries.iter().filter(|e| e.last_error.is_some()).count()),
        Err(_) => None,
    };

    let (chain_ok, live_chain_id) = match state.chain.check_connectivity().await {
        Ok(id) => (true, Some(id)),
        Err(_) => (false, None),
    };

    envelope(json!({
        "database": {
            "connected": db_ok,
            "marketsByStatus": market_counts.map(|counts| {
                counts
                    .into_iter()
                    .map(|(status, count)| (status.to_string(), json!(count)))
                    .collect::<serde_json::Map<String, serde_json::Value>>()
            }),
            "attestationCount": attestations,
            "participantCount": participants,
        },
        "chain": {
            "connected": chain_ok,
            "chainId": state.config.chain_id,
            "liveChainId": live_chain_id,
            "relayerAddress": state.relayer_address.to_string(),
        },
        "finalization": {
            "pending": pending,
            "retryingAfterError": retrying,
        },
    }))
    .into_response()
}

#[tracing::instrument(skip_all)]
async fn health_metrics(State(state): State<Arc<AppState>>) -> Response {
    let result: RelayerResult<_> = async {
        let by_status = state.store.market_counts_by_status().await?;
        let attestations = state.store.total_attestation_count().await?;
        let participants = state.store.total_participant_count().await?;
        let pending = state.store.pending_finalization_count().await?;
        let recent_log = state.store.recent_sync_log(10).await?;
        Ok((by_status, attestations, participants, pending, recent_log))
    }
    .await;
    match result {
        Ok((by_status, attestations, participants, pending, recent_log)) => {
            let markets_by_status: serde_json::Map<String, serde_json::Value> = by_status
                .into_iter()
                .map(|(status, count)| (status.to_string(), json!(count)))
                .collect();
            envelope(json!({
                "marketsByStatus": markets_by_status,
                "attestationCount": attestations,
                "participantCount": participants,
                "pendingFinalizationCount": pending,
                "recentSyncLog": recent_log,
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn health_queue(State(state): State<Arc<AppState>>) -> Response {
    match state.store.list_queue_entries(50).await {
        Ok(entries) => envelope(entries).into_response(),
        Err(e) => e.into_response(),
    }
}

// --- /api/markets --------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListMarketsQuery {
    status: Option<u8>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[tracing::instrument(skip_all)]
async fn list_markets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListMarketsQuery>,
) -> Response {
    let status = match query.status {
        Some(code) => match MarketStatus::from_code(code) {
            Some(s) => Some(s),
            None => {
                return RelayerError::Validation("status must be 0..4".to_string()).into_response()
            }
        },
        None => None,
    };
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let offset = query.offset.unwrap_or(0).max(0);

    let filter = crate::store::MarketFilter { status, limit, offset };
    let markets = match state.store.list_markets(filter).await {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };

    let mut rows = Vec::with_capacity(markets.len());
    for market in markets {
        let proposal = match state.store.get_active_proposal(market.address).await {
            Ok(p) => p,
            Err(e) => return e.into_response(),
        };
        rows.push(json!({ "market": market, "proposal": proposal }));
    }
    envelope(rows).into_response()
}

#[tracing::instrument(skip_all)]
async fn get_market(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    let address = match parse_addr(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };

    let mut market = match state.store.get_market(address).await {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };
    if market.is_none() {
        if let Err(e) = state.sync.sync_market(address).await {
            return e.into_response();
        }
        market = match state.store.get_market(address).await {
            Ok(m) => m,
            Err(e) => return e.into_response(),
        };
    }
    let Some(market) = market else {
        return RelayerError::NotFound(format!("market {address} not found")).into_response();
    };

    let proposal = match state.store.get_active_proposal(address).await {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    let (yes_count, no_count) = match (
        state.store.count_valid_attestations(address, Outcome(1)).await,
        state.store.count_valid_attestations(address, Outcome(0)).await,
    ) {
        (Ok(yes), Ok(no)) => (yes, no),
        (Err(e), _) | (_, Err(e)) => return e.into_response(),
    };

    envelope(json!({
        "market": market,
        "proposal": proposal,
        "attestationCounts": { "yes": yes_count, "no": no_count },
    }))
    .into_response()
}

#[tracing::instrument(skip_all)]
async fn sync_market(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    let address = match parse_addr(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    match state.sync.sync_market(address).await {
        Ok(()) => envelope(json!({ "market": address.to_string(), "synced": true })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn get_participants(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Response {
    let address = match parse_addr(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    match state.store.list_participants(address).await {
        Ok(participants) => envelope(participants).into_response(),
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn get_proposal(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    let address = match parse_addr(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let proposal = match state.store.get_active_proposal(address).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return RelayerError::NotFound(format!("market {address} has no active proposal"))
                .into_response()
        }
        Err(e) => return e.into_response(),
    };
    let attestations = match state.store.list_attestations(address, None).await {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    envelope(json!({ "proposal": proposal, "attestations": attestations })).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictAddressRequest {
    topic: String,
    threshold_percent: i32,
    token: String,
    min_stake: String,
    salt: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn predict_address(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PredictAddressRequest>,
) -> Response {
    if !(51..=99).contains(&body.threshold_percent) {
        return RelayerError::Validation("thresholdPercent must be 51..99".to_string())
            .into_response();
    }
    let token = match parse_addr(&body.token) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let min_stake = match body.min_stake.parse::<BigAmount>() {
        Ok(v) => v,
        Err(_) => return RelayerError::Validation("minStake must be a decimal integer".to_string()).into_response(),
    };
    let salt = match body.salt.as_deref().unwrap_or("0").parse::<BigAmount>() {
        Ok(v) => v,
        Err(_) => return RelayerError::Validation("salt must be a decimal integer".to_string()).into_response(),
    };

    match state
        .chain
        .predict_market_address(&body.topic, body.threshold_percent, token, min_stake, salt)
        .await
    {
        Ok(address) => envelope(json!({ "address": address.to_string() })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn get_status(State(state): State<Arc<AppState>>, Path(address): Path<String>) -> Response {
    let address = match parse_addr(&address) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let info = match state.chain.get_market_info(address).await {
        Ok(info) => info,
        Err(e) => return e.into_response(),
    };
    let proposal = match state.chain.get_proposal(address).await {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    envelope(json!({
        "status": info.status,
        "proposal": proposal.map(|p| json!({
            "proposer": p.proposer.to_string(),
            "outcome": p.outcome.to_string(),
            "disputeUntil": p.dispute_until,
            "evidenceHash": p.evidence_hash,
            "attestationCount": p.attestation_count,
            "isDisputed": p.is_disputed,
        })),
    }))
    .into_response()
}

// --- /api/attestations -----------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAttestationRequest {
    market: String,
    signer: String,
    outcome: String,
    nonce: String,
    signature: String,
}

#[tracing::instrument(skip_all)]
async fn submit_attestation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitAttestationRequest>,
) -> Response {
    let market = match parse_addr(&body.market) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let signer = match parse_addr(&body.signer) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let outcome = match parse_outcome(&body.outcome) {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };
    let nonce = match body.nonce.parse::<BigAmount>() {
        Ok(n) => n,
        Err(_) => {
            return RelayerError::Validation("nonce must be a decimal integer".to_string())
                .into_response()
        }
    };
    let signature = match body.signature.parse() {
        Ok(sig) => sig,
        Err(_) => {
            return RelayerError::Validation(
                "signature must be 0x-prefixed 130 hex characters".to_string(),
            )
            .into_response()
        }
    };

    match state
        .signatures
        .submit(market, signer, outcome, nonce, signature)
        .await
    {
        Ok(result) => envelope(json!({
            "attestation": result.attestation,
            "count": result.count_for_outcome,
            "enqueuedForFinalization": result.enqueued,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ListAttestationsQuery {
    market: String,
    outcome: Option<String>,
}

#[tracing::instrument(skip_all)]
async fn list_attestations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListAttestationsQuery>,
) -> Response {
    let market = match parse_addr(&query.market) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let outcome = match query.outcome.as_deref().map(parse_outcome).transpose() {
        Ok(o) => o,
        Err(e) => return e.into_response(),
    };
    match state.signatures.get_attestations(market, outcome).await {
        Ok(rows) => envelope(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn attestations_by_market(
    State(state): State<Arc<AppState>>,
    Path(market): Path<String>,
) -> Response {
    let market = match parse_addr(&market) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    match state.signatures.get_attestations(market, None).await {
        Ok(rows) => envelope(rows).into_response(),
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip_all)]
async fn attestations_count(
    State(state): State<Arc<AppState>>,
    Path(market): Path<String>,
) -> Response {
    let market = match parse_addr(&market) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    let (yes, no) = match (
        state.signatures.count_attestations(market, Outcome(1)).await,
        state.signatures.count_attestations(market, Outcome(0)).await,
    ) {
        (Ok(yes), Ok(no)) => (yes, no),
        (Err(e), _) | (_, Err(e)) => return e.into_response(),
    };
    let market_row = match state.store.get_market(market).await {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };
    let required = match &market_row {
        Some(m) => {
            let eligible = match state.store.count_eligible_participants(market, Outcome(1)).await {
                Ok(n) => n,
                Err(e) => return e.into_response(),
            };
            Some(crate::types::required_signatures(
                eligible,
                m.threshold,
                state.config.min_signatures_threshold,
            ))
        }
        None => None,
    };
    envelope(json!({
        "yes": yes,
        "no": no,
        "thresholdPercent": market_row.map(|m| m.threshold),
        "requiredForYes": required,
    }))
    .into_response()
}

#[tracing::instrument(skip_all)]
async fn delete_attestations(
    State(state): State<Arc<AppState>>,
    Path(market): Path<String>,
) -> Response {
    if !state.config.is_development() {
        return (StatusCode::FORBIDDEN, Json(json!({
            "success": false,
            "error": { "message": "only available in development", "code": "VALIDATION" }
        })))
        .into_response();
    }
    let market = match parse_addr(&market) {
        Ok(a) => a,
        Err(e) => return e.into_response(),
    };
    match state.store.delete_attestations(market).await {
        Ok(deleted) => envelope(json!({ "deleted": deleted })).into_response(),
        Err(e) => e.into_response(),
    }
}
