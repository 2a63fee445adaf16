//! The x402 payment handshake.
//!
//! A request without a usable authorization receives a
//! [`PaymentRequiredInfo`] challenge. A request carrying one is checked by
//! the [`PaymentVerifier`]; on success the caller receives a
//! [`SettlementAck`] and the request proceeds. [`PaymentGate`] combines both
//! halves into one decision.

pub mod challenge;
pub mod gate;
pub mod ledger;
pub mod price;
pub mod types;
pub mod verifier;

pub use challenge::{PaymentChallenge, PaymentConfig};
pub use gate::{GateOutcome, PaymentGate};
pub use ledger::NonceLedger;
pub use price::{PriceSource, Pricing, StaticPrices};
pub use types::{PaymentAuthorization, PaymentRequiredInfo, SettlementAck, X402V1};
pub use verifier::PaymentVerifier;
