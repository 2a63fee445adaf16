//! `GET /api/search/address?address=0x...`
//!
//! Balance, recent activity, top counterparties and ERC-20 approval
//! exposure for an account.

use std::collections::HashMap;

use alloy_primitives::{Address, B256, Bytes, U256, b256};
use axum::Json;
use axum::extract::{Query, State};
use clawpoly::amount::format_units;
use clawpoly::proof::{DataPointer, Evidence};
use clawpoly::source::{BlockBound, ChainLog, ExplorerTokenTx, ExplorerTx, LogQuery};
use futures_util::TryFutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::parse_address;
use crate::envelope::{Envelope, Findings};
use crate::error::ApiError;
use crate::state::SharedState;

/// Endpoint id and query type.
pub const ENDPOINT_ID: &str = "search/address";

/// `Approval(address,address,uint256)`.
pub const APPROVAL_TOPIC: B256 =
    b256!("8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925");

/// Blocks scanned for approvals before the most recent transaction.
const APPROVAL_LOOKBACK: u64 = 100_000;

const MAX_ACTIVITY: usize = 25;
const MAX_COUNTERPARTIES: usize = 10;
const MAX_APPROVALS: usize = 20;
const MAX_TX_EVIDENCE: usize = 5;

/// Query string.
#[derive(Debug, Deserialize)]
pub struct AddressQuery {
    /// Account to inspect.
    pub address: Option<String>,
}

/// Account summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressData {
    address: Address,
    balance: String,
    balance_formatted: String,
    transaction_count: usize,
    transactions: Vec<ActivityTx>,
    token_transfers: Vec<ActivityTokenTx>,
    top_counterparties: Vec<Counterparty>,
    approvals: Vec<Approval>,
    approval_risk: ApprovalRisk,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityTx {
    hash: String,
    from: String,
    to: String,
    value: String,
    block_number: String,
    timestamp: String,
    gas_used: String,
    is_error: bool,
    function_name: String,
}

impl From<&ExplorerTx> for ActivityTx {
    fn from(tx: &ExplorerTx) -> Self {
        Self {
            hash: tx.hash.clone(),
            from: tx.from.clone(),
            to: tx.to.clone(),
            value: tx.value.clone(),
            block_number: tx.block_number.clone(),
            timestamp: tx.time_stamp.clone(),
            gas_used: tx.gas_used.clone(),
            is_error: tx.is_error == "1",
            function_name: tx.function_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivityTokenTx {
    hash: String,
    from: String,
    to: String,
    value: String,
    token_name: String,
    token_symbol: String,
    token_decimal: String,
    contract_address: String,
    block_number: String,
    timestamp: String,
}

impl From<&ExplorerTokenTx> for ActivityTokenTx {
    fn from(tx: &ExplorerTokenTx) -> Self {
        Self {
            hash: tx.hash.clone(),
            from: tx.from.clone(),
            to: tx.to.clone(),
            value: tx.value.clone(),
            token_name: tx.token_name.clone(),
            token_symbol: tx.token_symbol.clone(),
            token_decimal: tx.token_decimal.clone(),
            contract_address: tx.contract_address.clone(),
            block_number: tx.block_number.clone(),
            timestamp: tx.time_stamp.clone(),
        }
    }
}

/// An account the queried address transacted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterparty {
    /// Lowercase address.
    pub address: String,
    /// Transactions between the two.
    pub interaction_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Approval {
    token_address: Address,
    spender: Option<Address>,
    block_number: Option<String>,
    tx_hash: Option<B256>,
    data: Bytes,
}

impl From<&ChainLog> for Approval {
    fn from(log: &ChainLog) -> Self {
        Self {
            token_address: log.address,
            spender: log.topics.get(2).map(|t| Address::from_word(*t)),
            block_number: log.block_number.map(|b| b.to_string()),
            tx_hash: log.transaction_hash,
            data: log.data.clone(),
        }
    }
}

/// Exposure grade from the number of approvals found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalRisk {
    /// None found.
    Low,
    /// One to five.
    Moderate,
    /// More than five.
    Elevated,
}

impl ApprovalRisk {
    /// Grades `count` approvals.
    #[must_use]
    pub const fn from_count(count: usize) -> Self {
        match count {
            0 => Self::Low,
            1..=5 => Self::Moderate,
            _ => Self::Elevated,
        }
    }
}

/// The ten most frequent counterparties, most frequent first. Ties keep
/// first-seen order.
#[must_use]
pub fn top_counterparties(address: Address, txs: &[ExplorerTx]) -> Vec<Counterparty> {
    let me = address.to_string().to_lowercase();
    let mut order: Vec<Counterparty> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for tx in txs {
        let other = if tx.from.to_lowercase() == me { &tx.to } else { &tx.from };
        if other.is_empty() {
            continue;
        }
        let other = other.to_lowercase();
        match position.get(&other) {
            Some(&i) => order[i].interaction_count += 1,
            None => {
                position.insert(other.clone(), order.len());
                order.push(Counterparty {
                    address: other,
                    interaction_count: 1,
                });
            }
        }
    }

    order.sort_by(|a, b| b.interaction_count.cmp(&a.interaction_count));
    order.truncate(MAX_COUNTERPARTIES);
    order
}

fn block_of(tx: &ExplorerTx) -> u64 {
    tx.block_number.parse().unwrap_or_default()
}

/// Approvals granted by `owner` around its recent activity.
fn approval_query(owner: Address, latest_tx_block: u64) -> LogQuery {
    LogQuery {
        address: None,
        topics: vec![Some(APPROVAL_TOPIC), Some(owner.into_word())],
        from_block: BlockBound::Number(latest_tx_block.saturating_sub(APPROVAL_LOOKBACK)),
        to_block: BlockBound::Latest,
    }
}

fn evidence(chain_id: u64, address: Address, txs: &[ExplorerTx]) -> Vec<Evidence> {
    let head = Evidence::at_block(chain_id, txs.first().map(block_of).unwrap_or_default())
        .with_address(address);
    let recent = txs.iter().take(MAX_TX_EVIDENCE).map(|tx| Evidence {
        tx_hash: tx.hash.parse().ok(),
        ..Evidence::at_block(chain_id, block_of(tx)).with_address(address)
    });
    std::iter::once(head).chain(recent).collect()
}

/// Summarises an account.
///
/// # Errors
///
/// 400 for a malformed address, 500 if the balance or explorer reads fail.
/// A failed approval scan is logged and reported as no approvals.
pub async fn search_address(
    State(state): State<SharedState>,
    Query(query): Query<AddressQuery>,
) -> Result<Json<Envelope<AddressData>>, ApiError> {
    let address = parse_address(
        query.address.as_deref(),
        "Invalid address. Provide ?address=0x...",
    )?;

    let (balance, txs, token_txs) = futures_util::try_join!(
        state.chain.balance(address).map_err(ApiError::from),
        state.explorer.tx_list(address).map_err(ApiError::from),
        state.explorer.token_transfers(address).map_err(ApiError::from),
    )?;

    let latest_tx_block = txs.first().map(block_of).unwrap_or_default();
    let approval_logs = match state.chain.logs(&approval_query(address, latest_tx_block)).await {
        Ok(logs) => logs,
        Err(error) => {
            tracing::warn!(%address, %error, "approval log scan failed, reporting none");
            Vec::new()
        }
    };

    let data = AddressData {
        address,
        balance: balance.to_string(),
        balance_formatted: format_balance(balance),
        transaction_count: txs.len(),
        transactions: txs.iter().take(MAX_ACTIVITY).map(ActivityTx::from).collect(),
        token_transfers: token_txs.iter().take(MAX_ACTIVITY).map(ActivityTokenTx::from).collect(),
        top_counterparties: top_counterparties(address, &txs),
        approvals: approval_logs.iter().take(MAX_APPROVALS).map(Approval::from).collect(),
        approval_risk: ApprovalRisk::from_count(approval_logs.len()),
    };

    let findings = Findings {
        data,
        evidence: evidence(state.chain_id, address, &txs),
        data_pointers: vec![
            DataPointer::new("eth_getBalance", json!({ "address": address })),
            DataPointer::new("polygonscan_txlist", json!({ "address": address })),
            DataPointer::new("polygonscan_tokentx", json!({ "address": address })),
            DataPointer::new(
                "eth_getLogs",
                json!({ "topic0": APPROVAL_TOPIC, "address": address }),
            ),
        ],
    };
    state
        .seal(ENDPOINT_ID, &json!({ "address": address }), findings)
        .await
}

fn format_balance(wei: U256) -> String {
    format!("{} POL", format_units(wei, 18, 6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ME: Address = address!("00000000000000000000000000000000000000a1");

    fn tx(from: &str, to: &str, block: &str) -> ExplorerTx {
        ExplorerTx {
            hash: format!("0x{}", "11".repeat(32)),
            from: from.to_owned(),
            to: to.to_owned(),
            block_number: block.to_owned(),
            ..ExplorerTx::default()
        }
    }

    #[test]
    fn test_counterparties_rank_and_ties() {
        let me = "0x00000000000000000000000000000000000000A1";
        let txs = vec![
            tx(me, "0xBB", "10"),
            tx("0xcc", me, "9"),
            tx(me, "0xbb", "8"),
            tx(me, "", "7"),
            tx("0xdd", me, "6"),
        ];
        let top = top_counterparties(ME, &txs);
        assert_eq!(
            top,
            vec![
                Counterparty { address: "0xbb".into(), interaction_count: 2 },
                Counterparty { address: "0xcc".into(), interaction_count: 1 },
                Counterparty { address: "0xdd".into(), interaction_count: 1 },
            ]
        );
    }

    #[test]
    fn test_counterparties_capped_at_ten() {
        let txs: Vec<_> = (0..15).map(|i| tx(&ME.to_string(), &format!("0x{i:02x}"), "1")).collect();
        assert_eq!(top_counterparties(ME, &txs).len(), 10);
    }

    #[test]
    fn test_approval_risk_grades() {
        assert_eq!(ApprovalRisk::from_count(0), ApprovalRisk::Low);
        assert_eq!(ApprovalRisk::from_count(5), ApprovalRisk::Moderate);
        assert_eq!(ApprovalRisk::from_count(6), ApprovalRisk::Elevated);
        assert_eq!(serde_json::to_value(ApprovalRisk::Elevated).unwrap(), "elevated");
    }

    #[test]
    fn test_approval_query_window() {
        let q = approval_query(ME, 250_000);
        assert_eq!(q.from_block, BlockBound::Number(150_000));
        assert_eq!(q.topics[1], Some(ME.into_word()));
        assert_eq!(approval_query(ME, 10).from_block, BlockBound::Number(0));
    }

    #[test]
    fn test_spender_from_topic() {
        let spender = address!("00000000000000000000000000000000000000e5");
        let log = ChainLog {
            address: address!("00000000000000000000000000000000000000c0"),
            topics: vec![APPROVAL_TOPIC, ME.into_word(), spender.into_word()],
            data: Bytes::new(),
            block_number: Some(9),
            transaction_hash: None,
            log_index: None,
            transaction_index: None,
        };
        let approval = Approval::from(&log);
        assert_eq!(approval.spender, Some(spender));
        assert_eq!(approval.block_number.as_deref(), Some("9"));
    }

    #[test]
    fn test_evidence_and_balance() {
        let txs = vec![tx("0xa1", "0xbb", "500"), tx("0xa1", "0xbb", "400")];
        let ev = evidence(137, ME, &txs);
        assert_eq!(ev.len(), 3);
        assert_eq!(ev[0].block_number, 500);
        assert_eq!(ev[0].tx_hash, None);
        assert_eq!(ev[2].block_number, 400);
        assert_eq!(ev[2].tx_hash, Some(B256::repeat_byte(0x11)));
        assert_eq!(evidence(137, ME, &[])[0].block_number, 0);

        let one_and_a_half = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_balance(one_and_a_half), "1.500000 POL");
    }
}
