//! `GET /api/health`

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{SecondsFormat, Utc};
use clawpoly::networks::POLYGON_NAME;
use serde_json::json;

use crate::state::SharedState;

/// Reports the chain head, or 503 when the RPC is unreachable.
pub async fn health(State(state): State<SharedState>) -> Response {
    match state.chain.block_number().await {
        Ok(block_number) => Json(json!({
            "status": "ok",
            "chain": POLYGON_NAME,
            "chainId": state.chain_id,
            "blockNumber": block_number.to_string(),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }))
        .into_response(),
        Err(error) => {
            tracing::warn!(%error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "message": "RPC connection failed" })),
            )
                .into_response()
        }
    }
}
