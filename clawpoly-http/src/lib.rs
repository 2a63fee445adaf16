#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the clawpoly read API.
//!
//! - [`headers`] encodes and decodes the base64 JSON payloads carried in
//!   `PAYMENT-REQUIRED`, `PAYMENT-SIGNATURE` and `PAYMENT-RESPONSE`.
//! - `server` provides tower layers: a fixed-window rate limiter that stamps
//!   every response with its budget, and a per-endpoint paygate answering
//!   402 until a valid authorization is presented.
//! - `explorer` is a reqwest client for the `PolygonScan`-style explorer API.
//!
//! # Feature Flags
//!
//! - `server` - tower/axum middleware
//! - `client` - block-explorer HTTP client
//! - `telemetry` - tracing instrumentation

pub mod constants;
pub mod error;
pub mod headers;

#[cfg(feature = "client")]
pub mod explorer;

#[cfg(feature = "server")]
pub mod server;

pub use error::HttpError;
