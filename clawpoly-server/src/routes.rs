//! Router assembly.
//!
//! Routes:
//! - `GET /api/search/{tx,address,contract,logs}` - rate limited (paid budget), then paygated
//! - `GET /api/search/docs` - rate limited (free budget)
//! - `GET /api/x402/endpoints` - rate limited (free budget)
//! - `GET /api/health`
//!
//! Each route counts callers in its own table. Other methods on these paths
//! answer 405 without touching the rate limiter or the paygate.

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, Method};
use axum::routing::{MethodRouter, get};
use clawpoly::rate_limit::{RateLimitPolicy, RateLimiter};
use clawpoly_http::constants::EXPOSED_HEADERS;
use clawpoly_http::server::{PaygateLayer, RateLimitLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{self, method_not_allowed};
use crate::state::SharedState;

fn limited(route: MethodRouter<SharedState>, policy: RateLimitPolicy) -> MethodRouter<SharedState> {
    route
        .route_layer(RateLimitLayer::new(RateLimiter::new(), policy))
        .fallback(method_not_allowed)
}

fn paid(route: MethodRouter<SharedState>, state: &SharedState, endpoint_id: &'static str) -> MethodRouter<SharedState> {
    limited(
        route.route_layer(PaygateLayer::new(Arc::clone(&state.gate), endpoint_id)),
        state.rate_limits.paid,
    )
}

fn cors() -> CorsLayer {
    let exposed: Vec<HeaderName> = EXPOSED_HEADERS
        .iter()
        .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers(exposed)
}

/// Builds the full application router.
pub fn router(state: SharedState) -> Router {
    let free = state.rate_limits.free;

    Router::new()
        .route(
            "/api/search/tx",
            paid(get(handlers::search_tx), &state, handlers::tx::ENDPOINT_ID),
        )
        .route(
            "/api/search/address",
            paid(get(handlers::search_address), &state, handlers::address::ENDPOINT_ID),
        )
        .route(
            "/api/search/contract",
            paid(get(handlers::search_contract), &state, handlers::contract::ENDPOINT_ID),
        )
        .route(
            "/api/search/logs",
            paid(get(handlers::search_logs), &state, handlers::logs::ENDPOINT_ID),
        )
        .route("/api/search/docs", limited(get(handlers::search_docs), free))
        .route("/api/x402/endpoints", limited(get(handlers::list_endpoints), free))
        .route("/api/health", get(handlers::health).fallback(method_not_allowed))
        .fallback(|| async { ApiError::NotFound("Not found") })
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}
