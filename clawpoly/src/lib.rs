#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the clawpoly pay-per-query read API.
//!
//! Every paid request flows through the same pipeline: a fixed-window
//! [`rate_limit`] check, the x402 [`payment`] gate (challenge, verification
//! and replay protection), the business handler, a [`proof`] bundle over the
//! response and its on-chain evidence, and finally a [`receipt`] anchored
//! on-chain or recorded off-chain.
//!
//! This crate is transport-agnostic. HTTP middleware lives in
//! `clawpoly-http`, chain access and anchoring in `clawpoly-evm`.
//!
//! # Modules
//!
//! - [`amount`] - Token amounts in smallest units and their display forms
//! - [`catalog`] - Endpoint catalogue and the default price table
//! - [`encoding`] - Base64 wrapper used for header payloads
//! - [`error`] - Error types shared across the pipeline
//! - [`networks`] - Polygon and USDC constants
//! - [`payment`] - x402 challenge, verification and gate
//! - [`proof`] - Canonical hashing and proof bundles
//! - [`rate_limit`] - Fixed-window per-caller rate limiting
//! - [`receipt`] - Receipt anchoring with off-chain fallback
//! - [`source`] - Chain-data and block-explorer collaborator traits
//! - [`timestamp`] - Unix timestamps for authorization windows
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod amount;
pub mod catalog;
pub mod encoding;
pub mod error;
pub mod networks;
pub mod payment;
pub mod proof;
pub mod rate_limit;
pub mod receipt;
pub mod source;
pub mod timestamp;
