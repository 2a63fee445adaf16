//! `GET /api/x402/endpoints`

use axum::Json;
use axum::extract::State;
use clawpoly::catalog::{CatalogSource, EndpointInfo};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

/// The endpoint catalogue with prices.
#[derive(Debug, Serialize)]
pub struct EndpointsResponse {
    success: bool,
    source: CatalogSource,
    endpoints: Vec<EndpointInfo>,
}

/// Lists purchasable endpoints, from the registries when configured. Free.
///
/// # Errors
///
/// 500 when the registries cannot be read.
pub async fn list_endpoints(State(state): State<SharedState>) -> Result<Json<EndpointsResponse>, ApiError> {
    let listing = state.catalog.list().await?;
    Ok(Json(EndpointsResponse {
        success: true,
        source: listing.source,
        endpoints: listing.endpoints,
    }))
}
