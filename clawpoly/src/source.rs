//! Collaborator traits for the data the search endpoints read.
//!
//! [`ChainData`] is the JSON-RPC node; [`BlockExplorer`] is the indexed
//! explorer API (transaction lists, verified sources). Both return plain
//! records so handlers stay independent of any client library.

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::error::{ChainDataError, ExplorerError};

/// A transaction as returned by `eth_getTransactionByHash`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Containing block, `None` while pending.
    pub block_number: Option<u64>,
    /// Sender.
    pub from: Address,
    /// Recipient, `None` for contract creation.
    pub to: Option<Address>,
    /// Native value in wei.
    pub value: U256,
    /// Gas limit.
    pub gas: u64,
    /// Legacy gas price or effective price.
    pub gas_price: Option<u128>,
    /// Sender nonce.
    pub nonce: u64,
    /// Calldata.
    pub input: Bytes,
    /// EIP-2718 type.
    #[serde(rename = "type")]
    pub tx_type: u8,
    /// Chain id, absent on pre-EIP-155 transactions.
    pub chain_id: Option<u64>,
}

/// A receipt as returned by `eth_getTransactionReceipt`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReceipt {
    /// Whether execution succeeded.
    pub status: bool,
    /// Block the receipt belongs to.
    pub block_number: Option<u64>,
    /// Gas used by this transaction.
    pub gas_used: u64,
    /// Price paid per gas.
    pub effective_gas_price: Option<u128>,
    /// Created contract, if any.
    pub contract_address: Option<Address>,
    /// Emitted logs.
    pub logs: Vec<ChainLog>,
}

/// An event log.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics; the first is the event signature.
    pub topics: Vec<B256>,
    /// Unindexed data.
    pub data: Bytes,
    /// Containing block.
    pub block_number: Option<u64>,
    /// Containing transaction.
    pub transaction_hash: Option<B256>,
    /// Position in the block.
    pub log_index: Option<u64>,
    /// Transaction position in the block.
    pub transaction_index: Option<u64>,
}

impl ChainLog {
    /// The event signature topic.
    #[must_use]
    pub fn topic0(&self) -> Option<B256> {
        self.topics.first().copied()
    }
}

/// Block bound of a log query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockBound {
    /// A specific block.
    Number(u64),
    /// The chain head.
    #[default]
    Latest,
}

/// Filter for `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogQuery {
    /// Emitting contract.
    pub address: Option<Address>,
    /// Topic filters by position; `None` matches anything.
    pub topics: Vec<Option<B256>>,
    /// First block, inclusive.
    pub from_block: BlockBound,
    /// Last block, inclusive.
    pub to_block: BlockBound,
}

/// Read access to a chain node.
#[async_trait]
pub trait ChainData: Send + Sync {
    /// Latest block number.
    async fn block_number(&self) -> Result<u64, ChainDataError>;

    /// Native balance at the head.
    async fn balance(&self, address: Address) -> Result<U256, ChainDataError>;

    /// A transaction by hash, `None` when unknown.
    async fn transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, ChainDataError>;

    /// A receipt by transaction hash, `None` while pending or unknown.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, ChainDataError>;

    /// Logs matching `query`.
    async fn logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainDataError>;

    /// Deployed bytecode; empty for accounts without code.
    async fn code(&self, address: Address) -> Result<Bytes, ChainDataError>;

    /// A raw storage word.
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainDataError>;
}

/// A transaction from the explorer's `txlist` action.
///
/// Numeric fields stay strings, as the explorer sends them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorerTx {
    /// Transaction hash.
    pub hash: String,
    /// Block number.
    pub block_number: String,
    /// Block time, epoch seconds.
    pub time_stamp: String,
    /// Sender.
    pub from: String,
    /// Recipient; empty for contract creation.
    pub to: String,
    /// Value in wei.
    pub value: String,
    /// Gas used.
    pub gas_used: String,
    /// Gas price.
    pub gas_price: String,
    /// `"1"` when execution failed.
    pub is_error: String,
    /// Decoded function signature, if known.
    pub function_name: String,
    /// Four-byte selector.
    pub method_id: String,
}

/// A token transfer from the explorer's `tokentx` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorerTokenTx {
    /// Transaction hash.
    pub hash: String,
    /// Block number.
    pub block_number: String,
    /// Block time, epoch seconds.
    pub time_stamp: String,
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Raw token amount.
    pub value: String,
    /// Token contract.
    pub contract_address: String,
    /// Token name.
    pub token_name: String,
    /// Token symbol.
    pub token_symbol: String,
    /// Token decimals.
    pub token_decimal: String,
}

/// Verified-source metadata from the explorer's `getsourcecode` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExplorerSource {
    /// Flattened source; empty when unverified.
    pub source_code: String,
    /// Contract name.
    pub contract_name: String,
    /// Compiler version.
    pub compiler_version: String,
    /// `"1"` when optimized.
    pub optimization_used: String,
    /// Optimizer runs.
    pub runs: String,
    /// EVM version.
    #[serde(rename = "EVMVersion")]
    pub evm_version: String,
    /// SPDX license.
    pub license_type: String,
}

impl ExplorerSource {
    /// Whether the explorer holds verified source for the contract.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        !self.source_code.is_empty()
    }
}

/// Read access to a block-explorer API.
#[async_trait]
pub trait BlockExplorer: Send + Sync {
    /// Most recent transactions of `address`, newest first.
    async fn tx_list(&self, address: Address) -> Result<Vec<ExplorerTx>, ExplorerError>;

    /// Most recent ERC-20 transfers involving `address`, newest first.
    async fn token_transfers(&self, address: Address) -> Result<Vec<ExplorerTokenTx>, ExplorerError>;

    /// Verified ABI, `None` when the contract is not verified.
    async fn abi(&self, address: Address) -> Result<Option<serde_json::Value>, ExplorerError>;

    /// Verified source metadata, `None` when unavailable.
    async fn source(&self, address: Address) -> Result<Option<ExplorerSource>, ExplorerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explorer_records_parse_upstream_shape() {
        let tx: ExplorerTx = serde_json::from_value(json!({
            "blockNumber": "100",
            "timeStamp": "1700000000",
            "hash": "0xaa",
            "from": "0x01",
            "to": "0x02",
            "value": "5",
            "isError": "0",
            "confirmations": "12"
        }))
        .unwrap();
        assert_eq!(tx.block_number, "100");
        assert_eq!(tx.function_name, "");

        let source: ExplorerSource = serde_json::from_value(json!({
            "SourceCode": "",
            "ContractName": "",
            "EVMVersion": "Default"
        }))
        .unwrap();
        assert!(!source.is_verified());
        assert_eq!(source.evm_version, "Default");
    }
}
