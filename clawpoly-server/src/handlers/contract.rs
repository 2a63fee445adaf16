//! `GET /api/search/contract?address=0x...`

use alloy_primitives::{Address, B256, b256};
use axum::Json;
use axum::extract::{Query, State};
use clawpoly::proof::{DataPointer, Evidence};
use clawpoly::source::ExplorerSource;
use futures_util::TryFutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::parse_address;
use crate::envelope::{Envelope, Findings};
use crate::error::ApiError;
use crate::state::SharedState;

/// Endpoint id and query type.
pub const ENDPOINT_ID: &str = "search/contract";

/// EIP-1967 implementation slot: `keccak256("eip1967.proxy.implementation") - 1`.
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// Query string.
#[derive(Debug, Deserialize)]
pub struct ContractQuery {
    /// Contract to inspect.
    pub address: Option<String>,
}

/// Contract summary.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractData {
    address: Address,
    is_contract: bool,
    bytecode_size: usize,
    is_verified: bool,
    abi: Option<Value>,
    abi_available: bool,
    source: Option<SourceInfo>,
    proxy: ProxyInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceInfo {
    contract_name: Option<String>,
    compiler_version: Option<String>,
    optimization_used: bool,
    runs: Option<u64>,
    evm_version: Option<String>,
    license_type: Option<String>,
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_owned())
}

impl From<&ExplorerSource> for SourceInfo {
    fn from(source: &ExplorerSource) -> Self {
        Self {
            contract_name: non_empty(&source.contract_name),
            compiler_version: non_empty(&source.compiler_version),
            optimization_used: source.optimization_used == "1",
            runs: source.runs.parse().ok(),
            evm_version: non_empty(&source.evm_version),
            license_type: non_empty(&source.license_type),
        }
    }
}

/// EIP-1967 proxy detection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyInfo {
    /// Whether the implementation slot is set.
    pub is_proxy: bool,
    /// Address held in the slot.
    pub implementation_address: Option<Address>,
    /// `EIP-1967` when detected.
    pub standard: Option<&'static str>,
}

impl ProxyInfo {
    /// Reads the implementation slot; an unreadable or zero slot means no proxy.
    #[must_use]
    pub fn from_slot(slot: Option<B256>) -> Self {
        match slot.filter(|word| !word.is_zero()) {
            Some(word) => Self {
                is_proxy: true,
                implementation_address: Some(Address::from_word(word)),
                standard: Some("EIP-1967"),
            },
            None => Self {
                is_proxy: false,
                implementation_address: None,
                standard: None,
            },
        }
    }
}

/// Inspects a contract.
///
/// # Errors
///
/// 400 for a malformed address, 500 if the bytecode or explorer reads fail.
/// An unreadable implementation slot is treated as "not a proxy".
pub async fn search_contract(
    State(state): State<SharedState>,
    Query(query): Query<ContractQuery>,
) -> Result<Json<Envelope<ContractData>>, ApiError> {
    let address = parse_address(
        query.address.as_deref(),
        "Invalid address. Provide ?address=0x...",
    )?;

    let slot = async {
        match state.chain.storage_at(address, EIP1967_IMPLEMENTATION_SLOT).await {
            Ok(word) => Ok::<_, ApiError>(Some(word)),
            Err(error) => {
                tracing::debug!(%address, %error, "implementation slot unreadable");
                Ok(None)
            }
        }
    };
    let (bytecode, abi, source, slot) = futures_util::try_join!(
        state.chain.code(address).map_err(ApiError::from),
        state.explorer.abi(address).map_err(ApiError::from),
        state.explorer.source(address).map_err(ApiError::from),
        slot,
    )?;

    let verified = source.as_ref().filter(|s| s.is_verified());
    let data = ContractData {
        address,
        is_contract: !bytecode.is_empty(),
        bytecode_size: bytecode.len(),
        is_verified: verified.is_some(),
        abi_available: abi.is_some(),
        abi,
        source: verified.map(SourceInfo::from),
        proxy: ProxyInfo::from_slot(slot),
    };

    let findings = Findings {
        data,
        evidence: vec![Evidence::at_block(state.chain_id, 0).with_address(address)],
        data_pointers: vec![
            DataPointer::new("eth_getCode", json!({ "address": address })),
            DataPointer::new("polygonscan_getabi", json!({ "address": address })),
            DataPointer::new("polygonscan_getsourcecode", json!({ "address": address })),
            DataPointer::new(
                "eth_getStorageAt",
                json!({ "address": address, "slot": EIP1967_IMPLEMENTATION_SLOT }),
            ),
        ],
    };
    state
        .seal(ENDPOINT_ID, &json!({ "address": address }), findings)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_proxy_detection() {
        let implementation = address!("00000000000000000000000000000000000000f1");
        let proxy = ProxyInfo::from_slot(Some(implementation.into_word()));
        assert!(proxy.is_proxy);
        assert_eq!(proxy.implementation_address, Some(implementation));
        assert_eq!(proxy.standard, Some("EIP-1967"));

        assert!(!ProxyInfo::from_slot(Some(B256::ZERO)).is_proxy);
        assert!(!ProxyInfo::from_slot(None).is_proxy);
        let json = serde_json::to_value(ProxyInfo::from_slot(None)).unwrap();
        assert_eq!(json, json!({ "isProxy": false, "implementationAddress": null, "standard": null }));
    }

    #[test]
    fn test_source_info() {
        let source = ExplorerSource {
            source_code: "contract A {}".into(),
            contract_name: "A".into(),
            compiler_version: "v0.8.24".into(),
            optimization_used: "1".into(),
            runs: "200".into(),
            evm_version: "Default".into(),
            license_type: String::new(),
        };
        let info = serde_json::to_value(SourceInfo::from(&source)).unwrap();
        assert_eq!(info["contractName"], "A");
        assert_eq!(info["optimizationUsed"], true);
        assert_eq!(info["runs"], 200);
        assert_eq!(info["licenseType"], Value::Null);
    }
}
