//! Receipt anchoring through the `SearchReceipt` contract.

use std::time::Duration;

use alloy_primitives::{Address, TxHash};
use alloy_provider::DynProvider;
use async_trait::async_trait;
use clawpoly::error::AnchorError;
use clawpoly::receipt::{ReceiptAnchor, ReceiptCommitment};
#[cfg(feature = "telemetry")]
use tracing::instrument;
use url::Url;

use crate::chain::DEFAULT_TIMEOUT;
use crate::contract::ISearchReceipt;
use crate::provider::signing_provider;

/// Submits `recordReceipt(queryHash, responseHash, evidenceRoot, uri)`.
///
/// The submission returns as soon as the node accepts the transaction; it
/// does not wait for inclusion. The whole submission, including nonce and
/// gas filling, is bounded by a timeout.
#[derive(Debug, Clone)]
pub struct SearchReceiptAnchor {
    contract: ISearchReceipt::ISearchReceiptInstance<DynProvider>,
    signer: Address,
    timeout: Duration,
}

impl SearchReceiptAnchor {
    /// Builds a signing provider for `private_key` and anchors through it.
    ///
    /// # Errors
    ///
    /// Returns [`AnchorError::Config`] if the key does not parse.
    pub fn connect(rpc_url: Url, contract: Address, private_key: &str) -> Result<Self, AnchorError> {
        let (provider, signer) =
            signing_provider(rpc_url, private_key).map_err(|e| AnchorError::Config(e.to_string()))?;
        Ok(Self {
            contract: ISearchReceipt::new(contract, provider),
            signer,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Overrides the submission timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The contract receipts are written to.
    #[must_use]
    pub fn contract_address(&self) -> &Address {
        self.contract.address()
    }

    /// The address receipts are sent from.
    #[must_use]
    pub const fn signer(&self) -> Address {
        self.signer
    }
}

#[async_trait]
impl ReceiptAnchor for SearchReceiptAnchor {
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(
        contract = %self.contract.address(),
        query_hash = %commitment.query_hash
    )))]
    async fn anchor(&self, commitment: &ReceiptCommitment) -> Result<TxHash, AnchorError> {
        let call = self.contract.recordReceipt(
            commitment.query_hash,
            commitment.response_hash,
            commitment.evidence_root,
            commitment.uri.clone(),
        );
        let pending = traced!(
            tokio::time::timeout(self.timeout, call.send()),
            tracing::info_span!("send_record_receipt", otel.kind = "client")
        )
        .map_err(|_| AnchorError::Submit(format!("no answer within {:?}", self.timeout)))?
        .map_err(|e| AnchorError::Submit(e.to_string()))?;
        Ok(*pending.tx_hash())
    }
}
