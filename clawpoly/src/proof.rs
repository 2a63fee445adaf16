//! Deterministic hashing of responses, queries and on-chain evidence.
//!
//! All hashes are SHA-256 rendered as `0x` followed by 64 lowercase hex
//! characters.
//!
//! Response and query hashes are taken over a canonical JSON rendering:
//! object keys sorted recursively, no whitespace. Two values that are equal
//! as JSON always hash the same, however their maps were built.
//!
//! The evidence root is an ordered commitment, not a Merkle tree: each
//! evidence item becomes the leaf string
//! `chainId:blockNumber:txHash:address:topic0` (absent parts empty), each
//! leaf is hashed, the leaf hex digests are concatenated in order and the
//! concatenation is hashed again. Reordering evidence changes the root.

use std::fmt::Write as _;

use alloy_primitives::{Address, B256, hex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use sha2::{Digest, Sha256};

use crate::error::ProofError;
use crate::timestamp::iso_millis;

/// A pointer to an on-chain fact supporting a response.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Block the fact was observed at; zero when not block-specific.
    pub block_number: u64,
    /// Transaction hash.
    pub tx_hash: Option<B256>,
    /// Account or contract address.
    pub address: Option<Address>,
    /// First log topic.
    pub topic0: Option<B256>,
}

impl Evidence {
    /// Evidence at `block_number` with no optional parts.
    #[must_use]
    pub const fn at_block(chain_id: u64, block_number: u64) -> Self {
        Self {
            chain_id,
            block_number,
            tx_hash: None,
            address: None,
            topic0: None,
        }
    }

    /// Sets the transaction hash.
    #[must_use]
    pub const fn with_tx_hash(mut self, tx_hash: B256) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    /// Sets the address.
    #[must_use]
    pub const fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets the first topic.
    #[must_use]
    pub const fn with_topic0(mut self, topic0: Option<B256>) -> Self {
        self.topic0 = topic0;
        self
    }

    /// The leaf string hashed into the evidence root.
    ///
    /// Addresses are rendered in lowercase so checksum casing cannot change
    /// the root.
    #[must_use]
    pub fn leaf(&self) -> String {
        let tx_hash = self.tx_hash.map(|h| h.to_string()).unwrap_or_default();
        let address = self
            .address
            .map(|a| a.to_string().to_lowercase())
            .unwrap_or_default();
        let topic0 = self.topic0.map(|t| t.to_string()).unwrap_or_default();
        format!(
            "{}:{}:{tx_hash}:{address}:{topic0}",
            self.chain_id, self.block_number
        )
    }
}

/// The RPC or explorer call a response was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPointer {
    /// Method name, e.g. `eth_getTransactionByHash`.
    pub method: String,
    /// Call parameters by name.
    pub params: Value,
}

impl DataPointer {
    /// Creates a pointer.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Hashes binding a response to its evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBundle {
    /// Hash of the canonical response payload.
    pub response_hash: B256,
    /// Ordered evidence.
    pub evidence: Vec<Evidence>,
    /// Calls the payload was derived from.
    pub data_pointers: Vec<DataPointer>,
    /// Build time.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

/// Renders `value` as canonical JSON: keys sorted at every depth, no
/// insignificant whitespace.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            // Scalars serialize infallibly.
            let _ = write!(out, "{value}");
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", Value::String(key.clone()));
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

/// SHA-256 of `bytes` as a [`B256`].
#[must_use]
pub fn sha256(bytes: impl AsRef<[u8]>) -> B256 {
    let digest: [u8; 32] = Sha256::digest(bytes.as_ref()).into();
    B256::from(digest)
}

/// Hash of the canonical JSON of `data`.
///
/// # Errors
///
/// Fails if `data` cannot be represented as JSON.
pub fn response_hash<T: Serialize + ?Sized>(data: &T) -> Result<B256, ProofError> {
    let value = serde_json::to_value(data)?;
    Ok(sha256(canonical_json(&value)))
}

/// Ordered commitment over `evidence`.
#[must_use]
pub fn evidence_root(evidence: &[Evidence]) -> B256 {
    let concatenated: String = evidence
        .iter()
        .map(|e| hex::encode(sha256(e.leaf())))
        .collect();
    sha256(concatenated)
}

/// Hash identifying a query: `sha256("<query_type>:<canonical params>")`.
///
/// # Errors
///
/// Fails if `params` cannot be represented as JSON.
pub fn query_hash<P: Serialize + ?Sized>(query_type: &str, params: &P) -> Result<B256, ProofError> {
    let value = serde_json::to_value(params)?;
    Ok(sha256(format!("{query_type}:{}", canonical_json(&value))))
}

/// Builds the proof bundle for a response. Inputs are copied, not consumed.
///
/// # Errors
///
/// Fails if `data` cannot be represented as JSON.
pub fn build_bundle<T: Serialize + ?Sized>(
    data: &T,
    evidence: &[Evidence],
    data_pointers: &[DataPointer],
) -> Result<ProofBundle, ProofError> {
    Ok(ProofBundle {
        response_hash: response_hash(data)?,
        evidence: evidence.to_vec(),
        data_pointers: data_pointers.to_vec(),
        timestamp: Utc::now(),
    })
}
