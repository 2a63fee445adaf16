//! Per-endpoint x402 payment enforcement.
//!
//! A request reaching a paid route is resolved by the shared
//! [`PaymentGate`]:
//!
//! - no `PAYMENT-SIGNATURE` (or `X-PAYMENT-SIGNATURE`) header, or one that
//!   does not decode: `402` with the challenge in `PAYMENT-REQUIRED` and in
//!   the body
//! - an authorization the verifier refuses: `402` with the refusal reason
//! - an accepted authorization: the request proceeds, the
//!   [`SettlementAck`] is inserted into its extensions and echoed in the
//!   `PAYMENT-RESPONSE` header of whatever the handler returns

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use clawpoly::amount::TokenAmount;
use clawpoly::error::PaymentVerificationError;
use clawpoly::payment::{GateOutcome, PaymentAuthorization, PaymentGate, PaymentRequiredInfo, SettlementAck};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};

use super::{PAYMENT_REQUIRED, PAYMENT_RESPONSE, PAYMENT_SIGNATURE, X_PAYMENT_SIGNATURE};
use crate::headers::{decode_payment_signature, encode_payment_required, encode_payment_response};

/// Reads and decodes the caller's payment authorization, if any.
///
/// An undecodable header is treated as absent.
#[must_use]
pub fn extract_authorization(headers: &HeaderMap) -> Option<PaymentAuthorization> {
    let raw = headers
        .get(PAYMENT_SIGNATURE)
        .or_else(|| headers.get(X_PAYMENT_SIGNATURE))?
        .to_str()
        .ok()?;
    match decode_payment_signature(raw) {
        Ok(authorization) => Some(authorization),
        #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
        Err(err) => {
            #[cfg(feature = "telemetry")]
            tracing::debug!(error = %err, "ignoring undecodable payment header");
            None
        }
    }
}

fn payment_required_response(info: &PaymentRequiredInfo) -> Response {
    let body = json!({
        "error": "Payment Required",
        "message": info.message(),
        "paymentInfo": info,
    });
    let mut response = (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response();
    match encode_payment_required(info).map(HeaderValue::try_from) {
        Ok(Ok(header)) => {
            response.headers_mut().insert(PAYMENT_REQUIRED, header);
        }
        _ => {
            #[cfg(feature = "telemetry")]
            tracing::error!(endpoint_id = %info.endpoint_id, "failed to encode PAYMENT-REQUIRED header");
        }
    }
    response
}

fn payment_invalid_response(err: &PaymentVerificationError) -> Response {
    let body = json!({
        "error": "Payment Invalid",
        "message": err.to_string(),
        "reason": err.reason(),
    });
    (StatusCode::PAYMENT_REQUIRED, Json(body)).into_response()
}

fn settlement_header(ack: &SettlementAck) -> Option<HeaderValue> {
    encode_payment_response(ack)
        .ok()
        .and_then(|encoded| HeaderValue::try_from(encoded).ok())
}

/// Gates a route behind payment for one endpoint id.
#[derive(Debug, Clone)]
pub struct PaygateLayer {
    gate: Arc<PaymentGate>,
    endpoint_id: Arc<str>,
    price_override: Option<TokenAmount>,
}

impl PaygateLayer {
    /// Gates `endpoint_id` at its configured price.
    #[must_use]
    pub fn new(gate: Arc<PaymentGate>, endpoint_id: impl Into<Arc<str>>) -> Self {
        Self {
            gate,
            endpoint_id: endpoint_id.into(),
            price_override: None,
        }
    }

    /// Charges `price` instead of the configured price.
    #[must_use]
    pub const fn with_price(mut self, price: TokenAmount) -> Self {
        self.price_override = Some(price);
        self
    }
}

impl<S> Layer<S> for PaygateLayer
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    type Service = PaygateService;

    fn layer(&self, inner: S) -> Self::Service {
        PaygateService {
            gate: Arc::clone(&self.gate),
            endpoint_id: Arc::clone(&self.endpoint_id),
            price_override: self.price_override,
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Service produced by [`PaygateLayer`].
#[derive(Clone)]
#[allow(missing_debug_implementations)] // boxed inner service is not Debug
pub struct PaygateService {
    gate: Arc<PaymentGate>,
    endpoint_id: Arc<str>,
    price_override: Option<TokenAmount>,
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl Service<Request> for PaygateService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let gate = Arc::clone(&self.gate);
        let endpoint_id = Arc::clone(&self.endpoint_id);
        let price_override = self.price_override;
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let authorization = extract_authorization(req.headers());
            let outcome = gate
                .evaluate(authorization.as_ref(), &endpoint_id, price_override)
                .await;
            match outcome {
                GateOutcome::PaymentRequired(info) => Ok(payment_required_response(&info)),
                GateOutcome::Rejected(err) => Ok(payment_invalid_response(&err)),
                GateOutcome::Paid(ack) => {
                    let header = settlement_header(&ack);
                    req.extensions_mut().insert(ack);
                    let mut response = inner.call(req).await?;
                    if let Some(header) = header {
                        response.headers_mut().insert(PAYMENT_RESPONSE, header);
                    }
                    Ok(response)
                }
            }
        })
    }
}
