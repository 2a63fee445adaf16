//! Receipts: a durable record that a query produced a response.
//!
//! When an anchor is configured, the commitment
//! `(queryHash, responseHash, evidenceRoot, uri)` is submitted on-chain and
//! the receipt carries the transaction hash. Without an anchor, or when
//! submission fails, the receipt is recorded off-chain. Recording never
//! fails the request.

use std::sync::Arc;

use alloy_primitives::{B256, TxHash};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::error::AnchorError;
use crate::proof::{Evidence, evidence_root};
use crate::timestamp::iso_millis;

/// What gets anchored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptCommitment {
    /// Hash of the query.
    pub query_hash: B256,
    /// Hash of the response payload.
    pub response_hash: B256,
    /// Ordered commitment over the evidence.
    pub evidence_root: B256,
    /// Resource the response was served from.
    pub uri: String,
}

/// Submits receipt commitments somewhere durable.
#[async_trait]
pub trait ReceiptAnchor: Send + Sync {
    /// Submits `commitment`, returning the transaction hash.
    async fn anchor(&self, commitment: &ReceiptCommitment) -> Result<TxHash, AnchorError>;
}

/// Result of an anchoring attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorOutcome {
    /// Submitted on-chain.
    Anchored {
        /// Submission transaction.
        tx_hash: TxHash,
    },
    /// Recorded off-chain only, because anchoring is disabled or failed.
    OffchainOnly,
}

/// A receipt as returned to callers.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Hash of the query.
    pub query_hash: B256,
    /// Hash of the response payload.
    pub response_hash: B256,
    /// Ordered commitment over the evidence.
    pub evidence_root: B256,
    /// Record time.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Whether the receipt was anchored on-chain.
    pub onchain: bool,
    /// Anchoring transaction, when on-chain.
    pub tx_hash: Option<TxHash>,
}

impl Receipt {
    fn from_outcome(commitment: &ReceiptCommitment, outcome: AnchorOutcome) -> Self {
        let (onchain, tx_hash) = match outcome {
            AnchorOutcome::Anchored { tx_hash } => (true, Some(tx_hash)),
            AnchorOutcome::OffchainOnly => (false, None),
        };
        Self {
            query_hash: commitment.query_hash,
            response_hash: commitment.response_hash,
            evidence_root: commitment.evidence_root,
            timestamp: Utc::now(),
            onchain,
            tx_hash,
        }
    }
}

/// Records receipts, anchoring them when an anchor is configured.
#[derive(Clone, Default)]
pub struct ReceiptRecorder {
    anchor: Option<Arc<dyn ReceiptAnchor>>,
}

impl std::fmt::Debug for ReceiptRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiptRecorder")
            .field("anchoring", &self.anchor.is_some())
            .finish()
    }
}

impl ReceiptRecorder {
    /// A recorder that only produces off-chain receipts.
    #[must_use]
    pub const fn offchain() -> Self {
        Self { anchor: None }
    }

    /// A recorder that anchors through `anchor`.
    #[must_use]
    pub fn with_anchor(anchor: Arc<dyn ReceiptAnchor>) -> Self {
        Self {
            anchor: Some(anchor),
        }
    }

    /// Whether an anchor is configured.
    #[must_use]
    pub const fn is_anchoring(&self) -> bool {
        self.anchor.is_some()
    }

    /// Tries to anchor `commitment`, falling back to off-chain on any failure.
    pub async fn anchor(&self, commitment: &ReceiptCommitment) -> AnchorOutcome {
        let Some(anchor) = &self.anchor else {
            return AnchorOutcome::OffchainOnly;
        };
        match anchor.anchor(commitment).await {
            Ok(tx_hash) => {
                #[cfg(feature = "telemetry")]
                tracing::info!(%tx_hash, query_hash = %commitment.query_hash, "receipt anchored");
                AnchorOutcome::Anchored { tx_hash }
            }
            #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, query_hash = %commitment.query_hash, "failed to anchor receipt, recording off-chain");
                AnchorOutcome::OffchainOnly
            }
        }
    }

    /// Records a receipt for a served query.
    pub async fn record(
        &self,
        query_hash: B256,
        response_hash: B256,
        evidence: &[Evidence],
        uri: &str,
    ) -> Receipt {
        let commitment = ReceiptCommitment {
            query_hash,
            response_hash,
            evidence_root: evidence_root(evidence),
            uri: uri.to_owned(),
        };
        let outcome = self.anchor(&commitment).await;
        Receipt::from_outcome(&commitment, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingAnchor;

    #[async_trait]
    impl ReceiptAnchor for FailingAnchor {
        async fn anchor(&self, _: &ReceiptCommitment) -> Result<TxHash, AnchorError> {
            Err(AnchorError::Submit("nonce too low".into()))
        }
    }

    #[derive(Default)]
    struct RecordingAnchor {
        seen: Mutex<Vec<ReceiptCommitment>>,
    }

    #[async_trait]
    impl ReceiptAnchor for RecordingAnchor {
        async fn anchor(&self, commitment: &ReceiptCommitment) -> Result<TxHash, AnchorError> {
            self.seen.lock().unwrap().push(commitment.clone());
            Ok(TxHash::repeat_byte(0xee))
        }
    }

    fn evidence() -> Vec<Evidence> {
        vec![Evidence::at_block(137, 42).with_tx_hash(B256::repeat_byte(1))]
    }

    #[tokio::test]
    async fn test_offchain_recorder() {
        let receipt = ReceiptRecorder::offchain()
            .record(B256::repeat_byte(2), B256::repeat_byte(3), &evidence(), "/api/search/tx")
            .await;
        assert!(!receipt.onchain);
        assert_eq!(receipt.tx_hash, None);
        assert_eq!(receipt.evidence_root, evidence_root(&evidence()));

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["onchain"], false);
        assert!(json.get("txHash").is_none());
    }

    #[tokio::test]
    async fn test_anchor_failure_falls_back() {
        let recorder = ReceiptRecorder::with_anchor(Arc::new(FailingAnchor));
        let receipt = recorder
            .record(B256::repeat_byte(2), B256::repeat_byte(3), &evidence(), "/api/search/tx")
            .await;
        assert!(!receipt.onchain);
        assert_eq!(receipt.query_hash, B256::repeat_byte(2));
    }

    #[tokio::test]
    async fn test_anchored_receipt_carries_tx_hash() {
        let anchor = Arc::new(RecordingAnchor::default());
        let recorder = ReceiptRecorder::with_anchor(anchor.clone());
        let receipt = recorder
            .record(B256::repeat_byte(2), B256::repeat_byte(3), &evidence(), "/api/search/logs")
            .await;
        assert!(receipt.onchain);
        assert_eq!(receipt.tx_hash, Some(TxHash::repeat_byte(0xee)));

        let seen = anchor.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].uri, "/api/search/logs");
        assert_eq!(seen[0].evidence_root, receipt.evidence_root);
    }
}
