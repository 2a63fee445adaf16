//! Axum route handlers.
//!
//! Paid search handlers run behind the rate-limit and paygate layers, so by
//! the time one executes the caller is within budget and has paid. Input is
//! validated here, after payment.

pub mod address;
pub mod contract;
pub mod docs;
pub mod endpoints;
pub mod health;
pub mod logs;
pub mod tx;

use alloy_primitives::{Address, B256};

use crate::error::ApiError;

pub use address::search_address;
pub use contract::search_contract;
pub use docs::search_docs;
pub use endpoints::list_endpoints;
pub use health::health;
pub use logs::search_logs;
pub use tx::search_tx;

/// Fallback for non-GET requests on known routes.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// A `0x`-prefixed 20-byte address, or `rejection`.
pub(crate) fn parse_address(raw: Option<&str>, rejection: &'static str) -> Result<Address, ApiError> {
    raw.map(str::trim)
        .filter(|s| s.starts_with("0x"))
        .and_then(|s| s.parse().ok())
        .ok_or(ApiError::BadRequest(rejection))
}

/// A `0x`-prefixed 32-byte word, or `rejection`.
pub(crate) fn parse_word(raw: Option<&str>, rejection: &'static str) -> Result<B256, ApiError> {
    raw.map(str::trim)
        .filter(|s| s.starts_with("0x"))
        .and_then(|s| s.parse().ok())
        .ok_or(ApiError::BadRequest(rejection))
}
