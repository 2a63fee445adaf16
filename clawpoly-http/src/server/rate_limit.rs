//! Fixed-window rate limiting as a tower layer.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::Json;
use axum::extract::{ConnectInfo, Request};
use axum::response::{IntoResponse, Response};
use chrono::DateTime;
use clawpoly::rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimiter, rate_limit_key};
use clawpoly::timestamp::{iso_millis, now_millis};
use http::header::RETRY_AFTER;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use super::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, X_FORWARDED_FOR, X_WALLET_ADDRESS};

/// The client IP: first `X-Forwarded-For` entry, else the socket peer,
/// else `unknown`.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_owned())
}

/// The limiter key for a request: `addr:<wallet>` when `X-Wallet-Address`
/// is present, else `ip:<client ip>`.
#[must_use]
pub fn caller_key(req: &Request) -> String {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(req.headers(), peer);
    let wallet = req
        .headers()
        .get(X_WALLET_ADDRESS)
        .and_then(|v| v.to_str().ok());
    rate_limit_key(&ip, wallet)
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_at_secs()));
}

fn too_many_requests(decision: &RateLimitDecision, now_ms: u64) -> Response {
    let reset_at = i64::try_from(decision.reset_at_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| iso_millis::format(&dt))
        .unwrap_or_default();
    let retry_after = decision.retry_after_secs(now_ms);
    let body = json!({
        "error": "Too Many Requests",
        "message": format!("Rate limit exceeded. Try again at {reset_at}"),
        "retryAfter": retry_after,
    });
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// Applies a [`RateLimitPolicy`] against a shared [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
    policy: RateLimitPolicy,
}

impl RateLimitLayer {
    /// Creates a layer counting into `limiter`.
    #[must_use]
    pub const fn new(limiter: RateLimiter, policy: RateLimitPolicy) -> Self {
        Self { limiter, policy }
    }
}

impl<S> Layer<S> for RateLimitLayer
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Service = RateLimitService;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            limiter: self.limiter.clone(),
            policy: self.policy,
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Service produced by [`RateLimitLayer`].
#[derive(Clone)]
#[allow(missing_debug_implementations)] // boxed inner service is not Debug
pub struct RateLimitService {
    limiter: RateLimiter,
    policy: RateLimitPolicy,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl Service<Request> for RateLimitService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let key = caller_key(&req);
        let now_ms = now_millis();
        let decision = self.limiter.check_at(&key, self.policy, now_ms);

        if !decision.allowed {
            #[cfg(feature = "telemetry")]
            tracing::debug!(key = %key, path = %req.uri().path(), "request rate limited");
            let mut response = too_many_requests(&decision, now_ms);
            apply_headers(response.headers_mut(), &decision);
            return Box::pin(async move { Ok(response) });
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move {
            let mut response = inner.call(req).await?;
            apply_headers(response.headers_mut(), &decision);
            Ok(response)
        })
    }
}
