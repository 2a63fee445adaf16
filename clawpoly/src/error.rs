//! Error types for the request pipeline.
//!
//! Payment verification failures are protocol outcomes rather than faults:
//! they surface to the caller as a 402 with [`PaymentVerificationError::reason`]
//! as the machine-readable code. Collaborator failures ([`ChainDataError`],
//! [`ExplorerError`], [`AnchorError`]) are faults.

use crate::amount::TokenAmount;

/// Why a payment authorization was refused.
///
/// Variants are listed in the order the verifier checks them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentVerificationError {
    /// The nonce was accepted before.
    #[error("Nonce already used")]
    Replay,
    /// The authorization pays someone other than the configured payee.
    #[error("Invalid payment recipient")]
    WrongRecipient,
    /// The authorized value is below the endpoint price.
    #[error("Insufficient payment. Required: {required}, received: {received}")]
    InsufficientAmount {
        /// Price of the endpoint.
        required: TokenAmount,
        /// Value carried by the authorization.
        received: TokenAmount,
    },
    /// `validBefore` is in the past.
    #[error("Payment authorization expired")]
    Expired,
    /// `validAfter` is in the future.
    #[error("Payment authorization not yet valid")]
    NotYetValid,
}

impl PaymentVerificationError {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Replay => "replay",
            Self::WrongRecipient => "wrong_recipient",
            Self::InsufficientAmount { .. } => "insufficient_amount",
            Self::Expired => "expired",
            Self::NotYetValid => "not_yet_valid",
        }
    }
}

/// Failure while hashing a response or query.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// The value could not be turned into JSON.
    #[error("failed to serialize value for hashing: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failure to anchor a receipt on-chain.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    /// Transaction submission was rejected by the node or the signer.
    #[error("receipt transaction submission failed: {0}")]
    Submit(String),
    /// The anchor is misconfigured.
    #[error("receipt anchor misconfigured: {0}")]
    Config(String),
}

/// Failure reading from the chain RPC.
#[derive(Debug, thiserror::Error)]
pub enum ChainDataError {
    /// Transport or JSON-RPC level error.
    #[error("RPC request {method} failed: {message}")]
    Rpc {
        /// JSON-RPC method that failed.
        method: &'static str,
        /// Upstream error message.
        message: String,
    },
    /// The node answered with data that does not decode.
    #[error("unexpected RPC response for {method}: {message}")]
    Decode {
        /// JSON-RPC method whose response was malformed.
        method: &'static str,
        /// Decoder error message.
        message: String,
    },
}

impl ChainDataError {
    /// Shorthand for an RPC failure.
    pub fn rpc(method: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Rpc {
            method,
            message: err.to_string(),
        }
    }
}

/// Failure reading from the block-explorer API.
#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    /// HTTP transport failure.
    #[error("explorer request {action} failed: {message}")]
    Http {
        /// Explorer action, e.g. `txlist`.
        action: &'static str,
        /// Transport error message.
        message: String,
    },
    /// Non-success HTTP status.
    #[error("explorer request {action} returned HTTP {status}")]
    Status {
        /// Explorer action.
        action: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// Body did not match the expected shape.
    #[error("explorer response for {action} did not decode: {message}")]
    Decode {
        /// Explorer action.
        action: &'static str,
        /// Decoder error message.
        message: String,
    },
}
