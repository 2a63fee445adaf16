//! Endpoint catalogue: what can be bought and at what price.
//!
//! [`default_catalog`] is the built-in table used when no on-chain registry
//! is configured. It is also the source of the default per-endpoint prices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::networks::USDC_DECIMALS;

/// Price charged for an endpoint absent from every price table ($0.001).
pub const FALLBACK_PRICE_UNITS: u64 = 1000;

/// A purchasable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointInfo {
    /// Endpoint id, e.g. `search/tx`, or its registry key as 0x-hex.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Comma-separated tags.
    pub tags: String,
    /// Whether the endpoint is currently served.
    pub enabled: bool,
    /// Price in USDC micro-units.
    pub price: TokenAmount,
    /// Price rendered as dollars, e.g. `$0.001000`.
    pub price_formatted: String,
}

impl EndpointInfo {
    fn builtin(id: &str, name: &str, description: &str, tags: &str, price: u64) -> Self {
        let price = TokenAmount::from_units(price);
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            description: description.to_owned(),
            tags: tags.to_owned(),
            enabled: true,
            price_formatted: price.format_usd(USDC_DECIMALS),
            price,
        }
    }
}

/// Where a catalogue listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Built-in table.
    Defaults,
    /// Read from the endpoint and pricing registries.
    Onchain,
}

/// A full catalogue listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogListing {
    /// Origin of the entries.
    pub source: CatalogSource,
    /// The endpoints, in registry order.
    pub endpoints: Vec<EndpointInfo>,
}

/// The built-in endpoint table.
#[must_use]
pub fn default_catalog() -> Vec<EndpointInfo> {
    vec![
        EndpointInfo::builtin(
            "search/tx",
            "Transaction Search",
            "Search transaction by hash",
            "search,transaction,tx",
            1000,
        ),
        EndpointInfo::builtin(
            "search/address",
            "Address Search",
            "Search address details and activity",
            "search,address,balance",
            2000,
        ),
        EndpointInfo::builtin(
            "search/contract",
            "Contract Search",
            "Search contract details and ABI",
            "search,contract,abi",
            1500,
        ),
        EndpointInfo::builtin(
            "search/logs",
            "Log Search",
            "Search event logs by filters",
            "search,logs,events",
            1000,
        ),
    ]
}

/// A source of endpoint listings.
#[async_trait]
pub trait EndpointCatalog: Send + Sync {
    /// Error raised when the listing cannot be read.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every endpoint.
    async fn list(&self) -> Result<CatalogListing, Self::Error>;
}

/// The built-in catalogue.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalog;

#[async_trait]
impl EndpointCatalog for DefaultCatalog {
    type Error = std::convert::Infallible;

    async fn list(&self) -> Result<CatalogListing, Self::Error> {
        Ok(CatalogListing {
            source: CatalogSource::Defaults,
            endpoints: default_catalog(),
        })
    }
}
