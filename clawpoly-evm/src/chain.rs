//! [`ChainData`] over an alloy provider.
//!
//! Transactions and receipts are fetched with raw JSON-RPC requests and
//! decoded into the plain records of [`clawpoly::source`], so callers never
//! see alloy's consensus types. Every call is bounded by a request timeout;
//! there are no retries.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, B256, Bytes, U64, U128, U256};
use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter};
use async_trait::async_trait;
use clawpoly::error::ChainDataError;
use clawpoly::source::{BlockBound, ChainData, ChainLog, ChainReceipt, ChainTransaction, LogQuery};
use serde::Deserialize;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: B256,
    block_number: Option<U64>,
    from: Address,
    to: Option<Address>,
    value: U256,
    gas: U64,
    gas_price: Option<U128>,
    nonce: U64,
    #[serde(default)]
    input: Bytes,
    #[serde(rename = "type")]
    tx_type: Option<U64>,
    chain_id: Option<U64>,
}

impl From<RpcTransaction> for ChainTransaction {
    fn from(tx: RpcTransaction) -> Self {
        Self {
            hash: tx.hash,
            block_number: tx.block_number.map(|n| n.saturating_to()),
            from: tx.from,
            to: tx.to,
            value: tx.value,
            gas: tx.gas.saturating_to(),
            gas_price: tx.gas_price.map(|p| p.saturating_to()),
            nonce: tx.nonce.saturating_to(),
            input: tx.input,
            tx_type: tx.tx_type.map(|t| t.saturating_to()).unwrap_or_default(),
            chain_id: tx.chain_id.map(|c| c.saturating_to()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<U64>,
    transaction_hash: Option<B256>,
    log_index: Option<U64>,
    transaction_index: Option<U64>,
}

impl From<RpcLog> for ChainLog {
    fn from(log: RpcLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics,
            data: log.data,
            block_number: log.block_number.map(|n| n.saturating_to()),
            transaction_hash: log.transaction_hash,
            log_index: log.log_index.map(|n| n.saturating_to()),
            transaction_index: log.transaction_index.map(|n| n.saturating_to()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    status: Option<U64>,
    block_number: Option<U64>,
    gas_used: U64,
    effective_gas_price: Option<U128>,
    contract_address: Option<Address>,
    #[serde(default)]
    logs: Vec<RpcLog>,
}

impl From<RpcReceipt> for ChainReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            status: receipt.status.is_some_and(|s| s == U64::from(1)),
            block_number: receipt.block_number.map(|n| n.saturating_to()),
            gas_used: receipt.gas_used.saturating_to(),
            effective_gas_price: receipt.effective_gas_price.map(|p| p.saturating_to()),
            contract_address: receipt.contract_address,
            logs: receipt.logs.into_iter().map(Into::into).collect(),
        }
    }
}

fn block_tag(bound: BlockBound) -> BlockNumberOrTag {
    match bound {
        BlockBound::Number(n) => BlockNumberOrTag::Number(n),
        BlockBound::Latest => BlockNumberOrTag::Latest,
    }
}

/// Builds the `eth_getLogs` filter for `query`.
///
/// Topic filters beyond the fourth position are ignored.
#[must_use]
pub fn log_filter(query: &LogQuery) -> Filter {
    let mut filter = Filter::new()
        .from_block(block_tag(query.from_block))
        .to_block(block_tag(query.to_block));
    if let Some(address) = query.address {
        filter = filter.address(address);
    }
    for (position, topic) in query.topics.iter().enumerate() {
        let Some(topic) = *topic else { continue };
        filter = match position {
            0 => filter.event_signature(topic),
            1 => filter.topic1(topic),
            2 => filter.topic2(topic),
            3 => filter.topic3(topic),
            _ => filter,
        };
    }
    filter
}

/// Chain reads over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcChainData {
    provider: DynProvider,
    timeout: Duration,
}

impl RpcChainData {
    /// Wraps `provider` with the default timeout.
    #[must_use]
    pub const fn new(provider: DynProvider) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The underlying provider.
    #[must_use]
    pub const fn provider(&self) -> &DynProvider {
        &self.provider
    }

    async fn bounded<T, E, F>(&self, method: &'static str, fut: F) -> Result<T, ChainDataError>
    where
        F: Future<Output = Result<T, E>> + Send,
        E: std::fmt::Display,
    {
        let result = traced!(
            tokio::time::timeout(self.timeout, fut),
            tracing::debug_span!("rpc", method, otel.kind = "client")
        );
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ChainDataError::rpc(method, err)),
            Err(_) => Err(ChainDataError::rpc(method, "request timed out")),
        }
    }
}

#[async_trait]
impl ChainData for RpcChainData {
    async fn block_number(&self) -> Result<u64, ChainDataError> {
        self.bounded("eth_blockNumber", self.provider.get_block_number())
            .await
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainDataError> {
        self.bounded("eth_getBalance", self.provider.get_balance(address).into_future())
            .await
    }

    async fn transaction(&self, hash: B256) -> Result<Option<ChainTransaction>, ChainDataError> {
        let tx: Option<RpcTransaction> = self
            .bounded(
                "eth_getTransactionByHash",
                self.provider
                    .raw_request("eth_getTransactionByHash".into(), (hash,)),
            )
            .await?;
        Ok(tx.map(Into::into))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ChainReceipt>, ChainDataError> {
        let receipt: Option<RpcReceipt> = self
            .bounded(
                "eth_getTransactionReceipt",
                self.provider
                    .raw_request("eth_getTransactionReceipt".into(), (hash,)),
            )
            .await?;
        Ok(receipt.map(Into::into))
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainDataError> {
        let filter = log_filter(query);
        let logs: Vec<RpcLog> = self
            .bounded(
                "eth_getLogs",
                self.provider.raw_request("eth_getLogs".into(), (filter,)),
            )
            .await?;
        Ok(logs.into_iter().map(Into::into).collect())
    }

    async fn code(&self, address: Address) -> Result<Bytes, ChainDataError> {
        self.bounded("eth_getCode", self.provider.get_code_at(address).into_future())
            .await
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainDataError> {
        let key = U256::from_be_bytes(slot.0);
        let word = self
            .bounded(
                "eth_getStorageAt",
                self.provider.get_storage_at(address, key).into_future(),
            )
            .await?;
        Ok(B256::from(word.to_be_bytes::<32>()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::{address, b256};
    use serde_json::{Value, json};
    use url::Url;
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    use crate::provider::read_provider;

    /// Answers JSON-RPC calls by method name, echoing the request id.
    pub(crate) struct RpcResponder<F>(pub(crate) F);

    impl<F> Respond for RpcResponder<F>
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let method = body["method"].as_str().unwrap_or_default();
            let result = (self.0)(method, &body["params"]);
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result,
            }))
        }
    }

    pub(crate) async fn rpc_server<F>(answer: F) -> (MockServer, DynProvider)
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::method("POST"))
            .respond_with(RpcResponder(answer))
            .mount(&server)
            .await;
        let provider = read_provider(Url::parse(&server.uri()).unwrap());
        (server, provider)
    }

    const TX: B256 = b256!("5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060");
    const TOKEN: Address = address!("3c499c542cef5e3811e1192ce70d8cc03d5c3359");

    fn answer(method: &str, params: &Value) -> Value {
        match method {
            "eth_blockNumber" => json!("0x3b9aca0"),
            "eth_getTransactionByHash" if params[0] == json!(TX) => json!({
                "hash": TX,
                "blockNumber": "0x2a",
                "blockHash": "0x0000000000000000000000000000000000000000000000000000000000000001",
                "from": "0x1111111111111111111111111111111111111111",
                "to": TOKEN,
                "value": "0x0",
                "gas": "0x5208",
                "gasPrice": "0x6fc23ac00",
                "nonce": "0x7",
                "input": "0xa9059cbb",
                "type": "0x2",
                "chainId": "0x89"
            }),
            "eth_getTransactionReceipt" => json!({
                "status": "0x1",
                "blockNumber": "0x2a",
                "gasUsed": "0x5208",
                "effectiveGasPrice": "0x6fc23ac00",
                "contractAddress": null,
                "logs": [{
                    "address": TOKEN,
                    "topics": ["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
                    "data": "0x",
                    "blockNumber": "0x2a",
                    "transactionHash": TX,
                    "logIndex": "0x0",
                    "transactionIndex": "0x3"
                }]
            }),
            "eth_getStorageAt" => {
                json!("0x000000000000000000000000000000000000000000000000000000000000002a")
            }
            _ => Value::Null,
        }
    }

    #[tokio::test]
    async fn test_transaction_and_receipt_decode() {
        let (_server, provider) = rpc_server(answer).await;
        let chain = RpcChainData::new(provider);

        assert_eq!(chain.block_number().await.unwrap(), 62_500_000);

        let tx = chain.transaction(TX).await.unwrap().unwrap();
        assert_eq!(tx.block_number, Some(42));
        assert_eq!(tx.to, Some(TOKEN));
        assert_eq!(tx.gas, 21_000);
        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.tx_type, 2);
        assert_eq!(tx.chain_id, Some(137));

        let receipt = chain.transaction_receipt(TX).await.unwrap().unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].transaction_index, Some(3));
        assert_eq!(
            receipt.logs[0].topic0(),
            Some(b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"))
        );
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_none() {
        let (_server, provider) = rpc_server(answer).await;
        let chain = RpcChainData::new(provider);
        assert!(chain.transaction(B256::repeat_byte(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_storage_word() {
        let (_server, provider) = rpc_server(answer).await;
        let chain = RpcChainData::new(provider);
        let word = chain.storage_at(TOKEN, B256::ZERO).await.unwrap();
        assert_eq!(word, B256::with_last_byte(42));
    }

    #[tokio::test]
    async fn test_rpc_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let chain = RpcChainData::new(read_provider(Url::parse(&server.uri()).unwrap()));
        let err = chain.block_number().await.unwrap_err();
        assert!(matches!(err, ChainDataError::Rpc { method: "eth_blockNumber", .. }));
    }

    #[test]
    fn test_log_filter_topics() {
        let query = LogQuery {
            address: Some(TOKEN),
            topics: vec![None, Some(B256::repeat_byte(1))],
            from_block: BlockBound::Number(100),
            to_block: BlockBound::Latest,
        };
        let json = serde_json::to_value(log_filter(&query)).unwrap();
        assert_eq!(json["fromBlock"], "0x64");
        assert_eq!(json["toBlock"], "latest");
        assert_eq!(json["topics"][0], Value::Null);
        assert_eq!(json["topics"][1], json!(B256::repeat_byte(1)));
    }
}
