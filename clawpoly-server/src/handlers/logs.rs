//! `GET /api/search/logs?address=0x...&topic0=&fromBlock=&toBlock=`

use alloy_primitives::{Address, B256, Bytes};
use axum::Json;
use axum::extract::{Query, State};
use clawpoly::proof::{DataPointer, Evidence};
use clawpoly::source::{BlockBound, ChainLog, LogQuery};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{parse_address, parse_word};
use crate::envelope::{Envelope, Findings};
use crate::error::ApiError;
use crate::state::SharedState;

/// Endpoint id and query type.
pub const ENDPOINT_ID: &str = "search/logs";

const MAX_LOGS: usize = 100;
const MAX_LOG_EVIDENCE: usize = 10;

/// Query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
    /// Emitting contract.
    pub address: Option<String>,
    /// Event signature filter.
    pub topic0: Option<String>,
    /// First block, decimal or 0x-hex.
    pub from_block: Option<String>,
    /// Last block, decimal or 0x-hex.
    pub to_block: Option<String>,
}

/// Filtered logs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsData {
    address: Address,
    topic0: Option<B256>,
    from_block: Option<String>,
    to_block: Option<String>,
    log_count: usize,
    logs: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<String>,
    transaction_hash: Option<B256>,
    log_index: Option<u64>,
    transaction_index: Option<u64>,
}

impl From<&ChainLog> for LogEntry {
    fn from(log: &ChainLog) -> Self {
        Self {
            address: log.address,
            topics: log.topics.clone(),
            data: log.data.clone(),
            block_number: log.block_number.map(|b| b.to_string()),
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            transaction_index: log.transaction_index,
        }
    }
}

/// A validated filter plus the raw bounds echoed back to the caller.
#[derive(Debug)]
struct Filter {
    address: Address,
    query: LogQuery,
    topic0: Option<B256>,
    from_block: Option<String>,
    to_block: Option<String>,
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_block(raw: &str) -> Result<u64, ApiError> {
    let parsed = match raw.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| ApiError::BadRequest("Invalid block number. Use a decimal or 0x-hex block"))
}

impl Filter {
    fn parse(query: &LogsQuery) -> Result<Self, ApiError> {
        let address = parse_address(query.address.as_deref(), "Provide ?address=0x...")?;
        let topic0 = present(query.topic0.as_deref())
            .map(|t| parse_word(Some(t), "Invalid topic0. Provide a 0x-prefixed 32-byte topic"))
            .transpose()?;
        let from_block = present(query.from_block.as_deref());
        let to_block = present(query.to_block.as_deref());

        let bound = |raw: Option<&str>| -> Result<BlockBound, ApiError> {
            raw.map(parse_block)
                .transpose()
                .map(|n| n.map_or(BlockBound::Latest, BlockBound::Number))
        };

        Ok(Self {
            address,
            query: LogQuery {
                address: Some(address),
                topics: topic0.map(Some).into_iter().collect(),
                from_block: bound(from_block)?,
                to_block: bound(to_block)?,
            },
            topic0,
            from_block: from_block.map(ToOwned::to_owned),
            to_block: to_block.map(ToOwned::to_owned),
        })
    }
}

fn evidence(chain_id: u64, address: Address, logs: &[ChainLog]) -> Vec<Evidence> {
    let evidence: Vec<Evidence> = logs
        .iter()
        .take(MAX_LOG_EVIDENCE)
        .map(|log| Evidence {
            tx_hash: log.transaction_hash,
            ..Evidence::at_block(chain_id, log.block_number.unwrap_or_default())
                .with_address(log.address)
                .with_topic0(log.topic0())
        })
        .collect();
    if evidence.is_empty() {
        return vec![Evidence::at_block(chain_id, 0).with_address(address)];
    }
    evidence
}

/// Fetches logs of a contract.
///
/// # Errors
///
/// 400 for a malformed address, topic or block bound, 500 on RPC failure.
pub async fn search_logs(
    State(state): State<SharedState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Envelope<LogsData>>, ApiError> {
    let filter = Filter::parse(&query)?;
    let address = filter.address;
    let logs = state.chain.logs(&filter.query).await?;

    let pointer = DataPointer::new(
        "eth_getLogs",
        json!({
            "address": address,
            "topics": filter.topic0.into_iter().collect::<Vec<_>>(),
            "fromBlock": filter.from_block.as_deref().unwrap_or("latest"),
            "toBlock": filter.to_block.as_deref().unwrap_or("latest"),
        }),
    );
    let params = json!({
        "address": address,
        "topic0": filter.topic0.map(|t| t.to_string()).unwrap_or_default(),
        "fromBlock": filter.from_block.clone().unwrap_or_default(),
        "toBlock": filter.to_block.clone().unwrap_or_default(),
    });

    let findings = Findings {
        evidence: evidence(state.chain_id, address, &logs),
        data: LogsData {
            address,
            topic0: filter.topic0,
            from_block: filter.from_block,
            to_block: filter.to_block,
            log_count: logs.len(),
            logs: logs.iter().take(MAX_LOGS).map(LogEntry::from).collect(),
        },
        data_pointers: vec![pointer],
    };
    state.seal(ENDPOINT_ID, &params, findings).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const CONTRACT: &str = "0x00000000000000000000000000000000000000c0";

    fn query(topic0: Option<&str>, from: Option<&str>, to: Option<&str>) -> LogsQuery {
        LogsQuery {
            address: Some(CONTRACT.to_owned()),
            topic0: topic0.map(ToOwned::to_owned),
            from_block: from.map(ToOwned::to_owned),
            to_block: to.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn test_filter_defaults_to_latest() {
        let filter = Filter::parse(&query(None, None, Some(""))).unwrap();
        assert_eq!(filter.query.from_block, BlockBound::Latest);
        assert_eq!(filter.query.to_block, BlockBound::Latest);
        assert!(filter.query.topics.is_empty());
        assert_eq!(filter.to_block, None);
    }

    #[test]
    fn test_filter_bounds_and_topic() {
        let topic = format!("0x{}", "dd".repeat(32));
        let filter = Filter::parse(&query(Some(&topic), Some("100"), Some("0xff"))).unwrap();
        assert_eq!(filter.query.from_block, BlockBound::Number(100));
        assert_eq!(filter.query.to_block, BlockBound::Number(255));
        assert_eq!(filter.query.topics, vec![Some(B256::repeat_byte(0xdd))]);
        assert_eq!(filter.from_block.as_deref(), Some("100"));
    }

    #[test]
    fn test_filter_rejections() {
        assert!(matches!(
            Filter::parse(&LogsQuery::default()),
            Err(ApiError::BadRequest("Provide ?address=0x..."))
        ));
        assert!(Filter::parse(&query(Some("0x12"), None, None)).is_err());
        assert!(Filter::parse(&query(None, Some("ten"), None)).is_err());
    }

    #[test]
    fn test_evidence_falls_back_to_address() {
        let contract = address!("00000000000000000000000000000000000000c0");
        let ev = evidence(137, contract, &[]);
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].address, Some(contract));
        assert_eq!(ev[0].block_number, 0);

        let log = ChainLog {
            address: contract,
            topics: vec![B256::repeat_byte(1)],
            data: Bytes::new(),
            block_number: Some(77),
            transaction_hash: Some(B256::repeat_byte(2)),
            log_index: Some(0),
            transaction_index: Some(0),
        };
        let logs = vec![log; 12];
        let ev = evidence(137, contract, &logs);
        assert_eq!(ev.len(), 10);
        assert_eq!(ev[0].tx_hash, Some(B256::repeat_byte(2)));
        assert_eq!(ev[0].topic0, Some(B256::repeat_byte(1)));
    }
}
