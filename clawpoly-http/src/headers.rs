//! Header encoding and decoding for x402 messages.
//!
//! Every payment header is base64 (standard alphabet) of a JSON document.

use clawpoly::encoding::Base64Bytes;
use clawpoly::payment::{PaymentAuthorization, PaymentRequiredInfo, SettlementAck};

use crate::error::HttpError;

fn encode<T: serde::Serialize>(value: &T) -> Result<String, HttpError> {
    Ok(Base64Bytes::encode_json(value)?.to_string())
}

/// Encodes a challenge for the `PAYMENT-REQUIRED` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_required(info: &PaymentRequiredInfo) -> Result<String, HttpError> {
    encode(info)
}

/// Decodes a `PAYMENT-REQUIRED` header value.
///
/// # Errors
///
/// Returns [`HttpError::Decode`] on base64 or JSON failure.
pub fn decode_payment_required(header_value: &str) -> Result<PaymentRequiredInfo, HttpError> {
    Ok(Base64Bytes::from(header_value).decode_json()?)
}

/// Encodes an authorization for the `PAYMENT-SIGNATURE` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_signature(authorization: &PaymentAuthorization) -> Result<String, HttpError> {
    encode(authorization)
}

/// Decodes a `PAYMENT-SIGNATURE` header value.
///
/// # Errors
///
/// Returns [`HttpError::Decode`] on base64 or JSON failure.
pub fn decode_payment_signature(header_value: &str) -> Result<PaymentAuthorization, HttpError> {
    Ok(Base64Bytes::from(header_value).decode_json()?)
}

/// Encodes a settlement acknowledgement for the `PAYMENT-RESPONSE` header.
///
/// # Errors
///
/// Returns [`HttpError::Serialize`] if JSON serialization fails.
pub fn encode_payment_response(ack: &SettlementAck) -> Result<String, HttpError> {
    encode(ack)
}

/// Decodes a `PAYMENT-RESPONSE` header value.
///
/// # Errors
///
/// Returns [`HttpError::Decode`] on base64 or JSON failure.
pub fn decode_payment_response(header_value: &str) -> Result<SettlementAck, HttpError> {
    Ok(Base64Bytes::from(header_value).decode_json()?)
}
