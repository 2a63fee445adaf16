//! The response wrapper shared by the paid search endpoints.
//!
//! Every search answer carries its data, a proof bundle over that data and
//! the receipt recorded for the query.

use axum::Json;
use clawpoly::proof::{DataPointer, Evidence, ProofBundle, build_bundle, query_hash};
use clawpoly::receipt::Receipt;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// `{success, data, proof, receipt}`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    /// Always `true`; failures use the error body instead.
    pub success: bool,
    /// Endpoint-specific payload.
    pub data: T,
    /// Hashes binding `data` to its evidence.
    pub proof: ProofBundle,
    /// Receipt for this query.
    pub receipt: Receipt,
}

/// What a handler gathered before sealing.
#[derive(Debug, Clone)]
pub struct Findings<T> {
    /// Response payload.
    pub data: T,
    /// Ordered on-chain evidence.
    pub evidence: Vec<Evidence>,
    /// Calls the payload was derived from.
    pub data_pointers: Vec<DataPointer>,
}

impl AppState {
    /// Builds the proof, records the receipt and wraps the response.
    ///
    /// `endpoint_id` doubles as the query type hashed with `params`, and
    /// names the path recorded in the receipt URI.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Proof`] if `data` or `params` cannot be hashed.
    pub async fn seal<T: Serialize>(
        &self,
        endpoint_id: &str,
        params: &Value,
        findings: Findings<T>,
    ) -> Result<Json<Envelope<T>>, ApiError> {
        let Findings {
            data,
            evidence,
            data_pointers,
        } = findings;

        let proof = build_bundle(&data, &evidence, &data_pointers)?;
        let query_hash = query_hash(endpoint_id, params)?;
        let uri = self.receipt_uri_for(&format!("/api/{endpoint_id}"));
        let receipt = self
            .recorder
            .record(query_hash, proof.response_hash, &evidence, &uri)
            .await;

        tracing::debug!(
            endpoint_id,
            %query_hash,
            response_hash = %proof.response_hash,
            onchain = receipt.onchain,
            "search served"
        );

        Ok(Json(Envelope {
            success: true,
            data,
            proof,
            receipt,
        }))
    }
}
