//! Tower middleware for the read API.
//!
//! Layers are applied per route, outermost first:
//!
//! 1. [`RateLimitLayer`] counts the request and stamps the budget headers on
//!    every response, answering 429 once the budget is spent.
//! 2. [`PaygateLayer`] answers 402 until a valid payment authorization is
//!    presented, then attaches `PAYMENT-RESPONSE` to the handler's response.

use http::HeaderName;

pub mod paygate;
pub mod rate_limit;

pub use paygate::{PaygateLayer, PaygateService};
pub use rate_limit::{RateLimitLayer, RateLimitService, client_ip, caller_key};

pub(crate) const PAYMENT_REQUIRED: HeaderName = HeaderName::from_static("payment-required");
pub(crate) const PAYMENT_RESPONSE: HeaderName = HeaderName::from_static("payment-response");
pub(crate) const PAYMENT_SIGNATURE: HeaderName = HeaderName::from_static("payment-signature");
pub(crate) const X_PAYMENT_SIGNATURE: HeaderName = HeaderName::from_static("x-payment-signature");
pub(crate) const X_WALLET_ADDRESS: HeaderName = HeaderName::from_static("x-wallet-address");
pub(crate) const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub(crate) const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub(crate) const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub(crate) const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
