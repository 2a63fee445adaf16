//! `GET /api/search/tx?hash=0x...`

use alloy_primitives::{Address, B256, Bytes};
use axum::Json;
use axum::extract::{Query, State};
use clawpoly::proof::{DataPointer, Evidence};
use clawpoly::source::{ChainLog, ChainReceipt, ChainTransaction};
use futures_util::TryFutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::parse_word;
use crate::envelope::{Envelope, Findings};
use crate::error::ApiError;
use crate::state::SharedState;

/// Endpoint id and query type.
pub const ENDPOINT_ID: &str = "search/tx";

/// Query string.
#[derive(Debug, Deserialize)]
pub struct TxQuery {
    /// Transaction hash.
    pub hash: Option<String>,
}

/// A transaction joined with its receipt.
///
/// Receipt fields are omitted while the transaction is pending.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxData {
    hash: B256,
    #[serde(skip_serializing_if = "Option::is_none")]
    block_number: Option<String>,
    from: Address,
    to: Option<Address>,
    value: String,
    gas: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_price: Option<String>,
    nonce: u64,
    input: Bytes,
    #[serde(rename = "type")]
    tx_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gas_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contract_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logs: Option<Vec<TxLog>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TxLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<String>,
    log_index: Option<u64>,
}

impl From<&ChainLog> for TxLog {
    fn from(log: &ChainLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics.clone(),
            data: log.data.clone(),
            block_number: log.block_number.map(|b| b.to_string()),
            log_index: log.log_index,
        }
    }
}

impl TxData {
    fn new(tx: &ChainTransaction, receipt: Option<&ChainReceipt>) -> Self {
        Self {
            hash: tx.hash,
            block_number: tx.block_number.map(|b| b.to_string()),
            from: tx.from,
            to: tx.to,
            value: tx.value.to_string(),
            gas: tx.gas.to_string(),
            gas_price: tx.gas_price.map(|p| p.to_string()),
            nonce: tx.nonce,
            input: tx.input.clone(),
            tx_type: tx.tx_type,
            chain_id: tx.chain_id,
            status: receipt.map(|r| if r.status { "success" } else { "reverted" }),
            gas_used: receipt.map(|r| r.gas_used.to_string()),
            effective_gas_price: receipt.and_then(|r| r.effective_gas_price).map(|p| p.to_string()),
            contract_address: receipt.and_then(|r| r.contract_address),
            logs: receipt.map(|r| r.logs.iter().map(TxLog::from).collect()),
        }
    }
}

fn evidence(chain_id: u64, tx: &ChainTransaction, receipt: Option<&ChainReceipt>) -> Vec<Evidence> {
    let head = Evidence {
        address: tx.to,
        ..Evidence::at_block(chain_id, tx.block_number.unwrap_or_default()).with_tx_hash(tx.hash)
    };
    let logs = receipt.into_iter().flat_map(|r| &r.logs).map(|log| {
        Evidence::at_block(chain_id, log.block_number.unwrap_or_default())
            .with_tx_hash(tx.hash)
            .with_address(log.address)
            .with_topic0(log.topic0())
    });
    std::iter::once(head).chain(logs).collect()
}

/// Looks up a transaction and its receipt.
///
/// # Errors
///
/// 400 for a malformed hash, 404 for an unknown transaction, 500 on RPC
/// failure.
pub async fn search_tx(
    State(state): State<SharedState>,
    Query(query): Query<TxQuery>,
) -> Result<Json<Envelope<TxData>>, ApiError> {
    let hash = parse_word(
        query.hash.as_deref(),
        "Invalid transaction hash. Provide ?hash=0x...",
    )?;

    let (tx, receipt) = futures_util::try_join!(
        state.chain.transaction(hash).map_err(ApiError::from),
        state.chain.transaction_receipt(hash).map_err(ApiError::from),
    )?;
    let tx = tx.ok_or(ApiError::NotFound("Transaction not found"))?;

    let findings = Findings {
        data: TxData::new(&tx, receipt.as_ref()),
        evidence: evidence(state.chain_id, &tx, receipt.as_ref()),
        data_pointers: vec![
            DataPointer::new("eth_getTransactionByHash", json!({ "hash": hash })),
            DataPointer::new("eth_getTransactionReceipt", json!({ "hash": hash })),
        ],
    };
    state.seal(ENDPOINT_ID, &json!({ "hash": hash }), findings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{U256, address};

    fn tx() -> ChainTransaction {
        ChainTransaction {
            hash: B256::repeat_byte(0x11),
            block_number: Some(42),
            from: address!("00000000000000000000000000000000000000a1"),
            to: Some(address!("00000000000000000000000000000000000000b2")),
            value: U256::from(5),
            gas: 21_000,
            gas_price: Some(30),
            nonce: 7,
            input: Bytes::new(),
            tx_type: 2,
            chain_id: Some(137),
        }
    }

    fn receipt() -> ChainReceipt {
        ChainReceipt {
            status: true,
            block_number: Some(42),
            gas_used: 21_000,
            effective_gas_price: Some(31),
            contract_address: None,
            logs: vec![ChainLog {
                address: address!("00000000000000000000000000000000000000c3"),
                topics: vec![B256::repeat_byte(0xdd)],
                data: Bytes::new(),
                block_number: Some(42),
                transaction_hash: Some(B256::repeat_byte(0x11)),
                log_index: Some(0),
                transaction_index: Some(3),
            }],
        }
    }

    #[test]
    fn test_data_shape() {
        let receipt = receipt();
        let data = serde_json::to_value(TxData::new(&tx(), Some(&receipt))).unwrap();
        assert_eq!(data["blockNumber"], "42");
        assert_eq!(data["value"], "5");
        assert_eq!(data["gasPrice"], "30");
        assert_eq!(data["type"], 2);
        assert_eq!(data["status"], "success");
        assert_eq!(data["effectiveGasPrice"], "31");
        assert_eq!(data["logs"][0]["blockNumber"], "42");
        assert_eq!(data["logs"][0]["logIndex"], 0);

        let pending = serde_json::to_value(TxData::new(&tx(), None)).unwrap();
        assert!(pending.get("status").is_none());
        assert!(pending.get("logs").is_none());
    }

    #[test]
    fn test_evidence_per_log() {
        let receipt = receipt();
        let ev = evidence(137, &tx(), Some(&receipt));
        assert_eq!(ev.len(), 2);
        assert_eq!(ev[0].block_number, 42);
        assert_eq!(ev[0].address, tx().to);
        assert_eq!(ev[0].topic0, None);
        assert_eq!(ev[1].address, Some(address!("00000000000000000000000000000000000000c3")));
        assert_eq!(ev[1].topic0, Some(B256::repeat_byte(0xdd)));
        assert_eq!(ev[1].tx_hash, Some(B256::repeat_byte(0x11)));

        let pending = ChainTransaction {
            block_number: None,
            ..tx()
        };
        assert_eq!(evidence(137, &pending, None)[0].block_number, 0);
    }
}
