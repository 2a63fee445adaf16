#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Polygon (EVM) collaborators for clawpoly.
//!
//! The core crate describes what the search pipeline needs from the chain
//! as traits; this crate implements them over an alloy provider:
//!
//! - [`chain::RpcChainData`] - JSON-RPC reads ([`clawpoly::source::ChainData`])
//! - [`anchor::SearchReceiptAnchor`] - `SearchReceipt.recordReceipt` submission
//!   ([`clawpoly::receipt::ReceiptAnchor`])
//! - [`registry::OnchainRegistry`] - endpoint catalogue and prices read from
//!   the `EndpointRegistry` and `PricingRegistry` contracts
//!
//! # Feature Flags
//!
//! - `telemetry` - tracing spans around RPC calls

/// Awaits a future, optionally instrumenting it with a tracing span.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            $fut.instrument($span).await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut.await
        }
    }};
}

pub mod anchor;
pub mod chain;
pub mod contract;
pub mod provider;
pub mod registry;

pub use anchor::SearchReceiptAnchor;
pub use chain::RpcChainData;
pub use provider::{ProviderError, read_provider, signing_provider};
pub use registry::{OnchainRegistry, RegistryError};
