//! Endpoint catalogue and prices from the on-chain registries.
//!
//! Endpoints are keyed by `keccak256(endpointId)` in both registries. A
//! listing enumerates `EndpointRegistry` by index and joins each entry with
//! its `PricingRegistry` price, reading a few entries at a time and at most
//! [`MAX_LISTED_ENDPOINTS`] of them. Price lookups for the payment gate fall back
//! to a static table when the registry has no price or cannot be reached.

use alloy_primitives::{Address, B256, U256, keccak256};
use alloy_provider::DynProvider;
use async_trait::async_trait;
use clawpoly::amount::TokenAmount;
use clawpoly::catalog::{CatalogListing, CatalogSource, EndpointCatalog, EndpointInfo};
use clawpoly::networks::USDC_DECIMALS;
use clawpoly::payment::{PriceSource, StaticPrices};
use futures_util::{StreamExt, TryStreamExt, stream};

use crate::contract::{IEndpointRegistry, IPricingRegistry};

/// Entries beyond this index are not listed.
pub const MAX_LISTED_ENDPOINTS: usize = 100;

/// Registry entries read concurrently while listing.
const ENTRY_CONCURRENCY: usize = 4;

/// Failure reading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A contract call failed or returned undecodable data.
    #[error("registry call {call} failed: {source}")]
    Call {
        /// Contract function.
        call: &'static str,
        /// Underlying error.
        #[source]
        source: alloy_contract::Error,
    },
}

fn call_error(call: &'static str) -> impl FnOnce(alloy_contract::Error) -> RegistryError {
    move |source| RegistryError::Call { call, source }
}

/// The registry key of an endpoint id.
#[must_use]
pub fn endpoint_key(endpoint_id: &str) -> B256 {
    keccak256(endpoint_id.as_bytes())
}

/// Reads `EndpointRegistry` and `PricingRegistry`.
#[derive(Debug, Clone)]
pub struct OnchainRegistry {
    endpoints: IEndpointRegistry::IEndpointRegistryInstance<DynProvider>,
    pricing: IPricingRegistry::IPricingRegistryInstance<DynProvider>,
    fallback: StaticPrices,
}

impl OnchainRegistry {
    /// Reads the registries at the given addresses.
    #[must_use]
    pub fn new(endpoint_registry: Address, pricing_registry: Address, provider: DynProvider) -> Self {
        Self {
            endpoints: IEndpointRegistry::new(endpoint_registry, provider.clone()),
            pricing: IPricingRegistry::new(pricing_registry, provider),
            fallback: StaticPrices::defaults(),
        }
    }

    /// Replaces the table consulted when the pricing registry has no answer.
    #[must_use]
    pub fn with_fallback(mut self, fallback: StaticPrices) -> Self {
        self.fallback = fallback;
        self
    }

    /// Price stored under `key`; zero means "not set".
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the call fails.
    pub async fn price(&self, key: B256) -> Result<U256, RegistryError> {
        let call = self.pricing.getPrice(key);
        traced!(
            call.call().into_future(),
            tracing::debug_span!("fetch_registry_price", key = %key, otel.kind = "client")
        )
        .map_err(call_error("getPrice"))
    }

    async fn entry(&self, index: usize) -> Result<EndpointInfo, RegistryError> {
        let id_call = self.endpoints.getEndpointIdByIndex(U256::from(index));
        let id = id_call
            .call()
            .await
            .map_err(call_error("getEndpointIdByIndex"))?;

        let endpoint_call = self.endpoints.getEndpoint(id);
        let (endpoint, price) = futures_util::try_join!(
            async {
                endpoint_call
                    .call()
                    .await
                    .map_err(call_error("getEndpoint"))
            },
            self.price(id),
        )?;

        let price = TokenAmount(price);
        Ok(EndpointInfo {
            id: id.to_string(),
            name: endpoint.name,
            description: endpoint.description,
            tags: endpoint.tags,
            enabled: endpoint.enabled,
            price_formatted: price.format_usd(USDC_DECIMALS),
            price,
        })
    }
}

#[async_trait]
impl EndpointCatalog for OnchainRegistry {
    type Error = RegistryError;

    async fn list(&self) -> Result<CatalogListing, Self::Error> {
        let count_call = self.endpoints.getEndpointCount();
        let count = traced!(
            count_call.call().into_future(),
            tracing::debug_span!("fetch_endpoint_count", otel.kind = "client")
        )
        .map_err(call_error("getEndpointCount"))?;
        let count: usize = count.saturating_to();
        #[cfg(feature = "telemetry")]
        if count > MAX_LISTED_ENDPOINTS {
            tracing::warn!(count, max = MAX_LISTED_ENDPOINTS, "endpoint registry listing truncated");
        }

        let endpoints: Vec<EndpointInfo> = stream::iter(0..count.min(MAX_LISTED_ENDPOINTS))
            .map(|index| self.entry(index))
            .buffered(ENTRY_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(CatalogListing {
            source: CatalogSource::Onchain,
            endpoints,
        })
    }
}

#[async_trait]
impl PriceSource for OnchainRegistry {
    async fn price_of(&self, endpoint_id: &str) -> Option<TokenAmount> {
        match self.price(endpoint_key(endpoint_id)).await {
            Ok(price) if !price.is_zero() => return Some(TokenAmount(price)),
            Ok(_) => {}
            #[cfg_attr(not(feature = "telemetry"), allow(unused_variables))]
            Err(err) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(error = %err, endpoint_id, "registry price lookup failed, using static price");
            }
        }
        self.fallback.get(endpoint_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy_primitives::{Bytes, address, hex};
    use alloy_sol_types::{SolCall, SolValue};
    use serde_json::{Value, json};
    use url::Url;

    use crate::chain::tests::rpc_server;
    use crate::contract::IEndpointRegistry::{
        Endpoint, getEndpointCall, getEndpointCountCall, getEndpointIdByIndexCall,
    };
    use crate::contract::IPricingRegistry::getPriceCall;
    use crate::provider::read_provider;

    const ENDPOINTS: Address = address!("00000000000000000000000000000000000000e1");
    const PRICING: Address = address!("00000000000000000000000000000000000000e2");

    fn word(value: u64) -> Value {
        json!(Bytes::from(U256::from(value).abi_encode()))
    }

    fn calldata(params: &Value) -> Vec<u8> {
        let tx = &params[0];
        let input = tx.get("input").or_else(|| tx.get("data")).and_then(Value::as_str);
        hex::decode(input.unwrap_or_default()).unwrap_or_default()
    }

    fn selector(params: &Value) -> [u8; 4] {
        calldata(params)[..4].try_into().unwrap()
    }

    fn registry_answer(method: &str, params: &Value) -> Value {
        if method != "eth_call" {
            return Value::Null;
        }
        let data = calldata(params);
        let selector = selector(params);
        if selector == getEndpointCountCall::SELECTOR {
            word(1)
        } else if selector == getEndpointIdByIndexCall::SELECTOR {
            json!(Bytes::from(endpoint_key("search/tx").abi_encode()))
        } else if selector == getEndpointCall::SELECTOR {
            let endpoint = Endpoint {
                name: "Transaction Search".into(),
                description: "Search transaction by hash".into(),
                tags: "search,transaction,tx".into(),
                enabled: true,
                creator: Address::ZERO,
                createdAt: U256::from(1),
                updatedAt: U256::from(2),
            };
            json!(Bytes::from((endpoint,).abi_encode_params()))
        } else if selector == getPriceCall::SELECTOR {
            let key = getPriceCall::abi_decode(&data).unwrap().endpointId;
            if key == endpoint_key("search/tx") { word(2500) } else { word(0) }
        } else {
            Value::Null
        }
    }

    #[tokio::test]
    async fn test_listing_joins_metadata_and_price() {
        let (_server, provider) = rpc_server(registry_answer).await;
        let registry = OnchainRegistry::new(ENDPOINTS, PRICING, provider);

        let listing = registry.list().await.unwrap();
        assert_eq!(listing.source, CatalogSource::Onchain);
        assert_eq!(listing.endpoints.len(), 1);
        let entry = &listing.endpoints[0];
        assert_eq!(entry.id, endpoint_key("search/tx").to_string());
        assert_eq!(entry.name, "Transaction Search");
        assert_eq!(entry.price, TokenAmount::from_units(2500));
        assert_eq!(entry.price_formatted, "$0.002500");
    }

    #[tokio::test]
    async fn test_listing_is_capped() {
        let index_reads = Arc::new(AtomicUsize::new(0));
        let reads = Arc::clone(&index_reads);
        let (_server, provider) = rpc_server(move |method: &str, params: &Value| {
            if method == "eth_call" {
                let selector = selector(params);
                if selector == getEndpointCountCall::SELECTOR {
                    return word(5_000);
                }
                if selector == getEndpointIdByIndexCall::SELECTOR {
                    reads.fetch_add(1, Ordering::SeqCst);
                }
            }
            registry_answer(method, params)
        })
        .await;
        let registry = OnchainRegistry::new(ENDPOINTS, PRICING, provider);

        let listing = registry.list().await.unwrap();
        assert_eq!(listing.endpoints.len(), MAX_LISTED_ENDPOINTS);
        assert_eq!(index_reads.load(Ordering::SeqCst), MAX_LISTED_ENDPOINTS);
    }

    #[tokio::test]
    async fn test_unset_price_falls_back_to_static_table() {
        let (_server, provider) = rpc_server(registry_answer).await;
        let registry = OnchainRegistry::new(ENDPOINTS, PRICING, provider);
        assert_eq!(
            registry.price_of("search/tx").await,
            Some(TokenAmount::from_units(2500))
        );
        assert_eq!(
            registry.price_of("search/address").await,
            Some(TokenAmount::from_units(2000))
        );
        assert_eq!(registry.price_of("search/nope").await, None);
    }

    #[tokio::test]
    async fn test_unreachable_registry_falls_back() {
        let provider = read_provider(Url::parse("http://127.0.0.1:1").unwrap());
        let registry = OnchainRegistry::new(ENDPOINTS, PRICING, provider);
        assert_eq!(
            registry.price_of("search/contract").await,
            Some(TokenAmount::from_units(1500))
        );
        assert!(registry.list().await.is_err());
    }
}
