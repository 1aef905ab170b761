//! Transaction start and status endpoints

use axum::extract::State;
use axum::Json;
use commitd_types::{Decision, Protocol, Transaction, TxId, Vote};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::state::AppState;
use crate::ApiResult;

/// Request to start a transaction
#[derive(Debug, Deserialize)]
pub struct StartTransactionRequest {
    #[serde(default)]
    pub txid: String,
    /// Opaque operation payload, must be a JSON object
    #[serde(default)]
    pub op: Option<Value>,
    /// `"2PC"` or `"3PC"`; defaults to 2PC when absent
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Response after a completed protocol run
#[derive(Debug, Serialize)]
pub struct StartTransactionResponse {
    pub ok: bool,
    pub txid: TxId,
    pub protocol: Protocol,
    pub decision: Decision,
    pub votes: HashMap<String, Vote>,
}

/// Full-table observability response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub node: String,
    pub participants: Vec<String>,
    pub tx: HashMap<TxId, Transaction>,
}

/// POST /tx/start - Run a transaction to completion
///
/// Blocks until the protocol reaches DONE and returns the decision and the
/// full vote map.
pub async fn start_transaction(
    State(state): State<AppState>,
    Json(payload): Json<StartTransactionRequest>,
) -> ApiResult<Json<StartTransactionResponse>> {
    let txid = payload.txid.trim();
    if txid.is_empty() {
        return Err(ApiError::BadRequest("txid is required".to_string()));
    }

    let op = match payload.op {
        Some(op) if op.is_object() => op,
        _ => return Err(ApiError::BadRequest("op must be a JSON object".to_string())),
    };

    let protocol = match payload.protocol.as_deref() {
        None => Protocol::TwoPc,
        Some(raw) => Protocol::parse(raw)
            .ok_or_else(|| ApiError::BadRequest("protocol must be 2PC or 3PC".to_string()))?,
    };

    let outcome = state
        .coordinator
        .run(protocol, TxId::from(txid), op)
        .await?;

    Ok(Json(StartTransactionResponse {
        ok: true,
        txid: outcome.txid,
        protocol: outcome.protocol,
        decision: outcome.decision,
        votes: outcome.votes,
    }))
}

/// GET /status - Node identity, participant list, and the whole table
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ok: true,
        node: state.node_id.clone(),
        participants: state.participants.clone(),
        tx: state.store.snapshot().await,
    })
}

/// GET /health - liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
