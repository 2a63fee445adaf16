//! Endpoint price resolution.
//!
//! A [`PriceSource`] maps an endpoint id to a price. [`Pricing`] wraps one
//! together with the fallback charged for endpoints the source does not
//! know. Unknown endpoints are charged the fallback rather than refused.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::amount::TokenAmount;
use crate::catalog::{FALLBACK_PRICE_UNITS, default_catalog};

/// An endpoint id to price lookup.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Price of `endpoint_id`, or `None` when the source has no entry.
    async fn price_of(&self, endpoint_id: &str) -> Option<TokenAmount>;
}

/// An in-memory price table.
#[derive(Debug, Clone, Default)]
pub struct StaticPrices {
    prices: HashMap<String, TokenAmount>,
}

impl StaticPrices {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in prices of the default catalogue.
    #[must_use]
    pub fn defaults() -> Self {
        default_catalog()
            .into_iter()
            .map(|e| (e.id, e.price))
            .collect()
    }

    /// Adds or replaces one entry.
    #[must_use]
    pub fn with_price(mut self, endpoint_id: impl Into<String>, price: TokenAmount) -> Self {
        self.prices.insert(endpoint_id.into(), price);
        self
    }

    /// Looks up a price synchronously.
    #[must_use]
    pub fn get(&self, endpoint_id: &str) -> Option<TokenAmount> {
        self.prices.get(endpoint_id).copied()
    }
}

impl FromIterator<(String, TokenAmount)> for StaticPrices {
    fn from_iter<I: IntoIterator<Item = (String, TokenAmount)>>(iter: I) -> Self {
        Self {
            prices: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn price_of(&self, endpoint_id: &str) -> Option<TokenAmount> {
        self.get(endpoint_id)
    }
}

/// A price source plus the fallback for unknown endpoints.
#[derive(Clone)]
pub struct Pricing {
    source: Arc<dyn PriceSource>,
    fallback: TokenAmount,
}

impl std::fmt::Debug for Pricing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pricing")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}

impl Default for Pricing {
    fn default() -> Self {
        Self::new(Arc::new(StaticPrices::defaults()))
    }
}

impl Pricing {
    /// Wraps `source` with the standard fallback price.
    #[must_use]
    pub fn new(source: Arc<dyn PriceSource>) -> Self {
        Self {
            source,
            fallback: TokenAmount::from_units(FALLBACK_PRICE_UNITS),
        }
    }

    /// Overrides the fallback price.
    #[must_use]
    pub const fn with_fallback(mut self, fallback: TokenAmount) -> Self {
        self.fallback = fallback;
        self
    }

    /// The price charged for `endpoint_id`.
    pub async fn resolve(&self, endpoint_id: &str) -> TokenAmount {
        if let Some(price) = self.source.price_of(endpoint_id).await {
            return price;
        }
        #[cfg(feature = "telemetry")]
        tracing::debug!(endpoint_id, fallback = %self.fallback, "no price entry, charging fallback");
        self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_and_fallback() {
        let pricing = Pricing::default();
        assert_eq!(pricing.resolve("search/address").await, TokenAmount::from_units(2000));
        assert_eq!(pricing.resolve("search/contract").await, TokenAmount::from_units(1500));
        assert_eq!(pricing.resolve("search/unknown").await, TokenAmount::from_units(1000));
    }

    #[tokio::test]
    async fn test_custom_table() {
        let prices = StaticPrices::new().with_price("search/tx", TokenAmount::from_units(7));
        let pricing = Pricing::new(Arc::new(prices)).with_fallback(TokenAmount::from_units(9));
        assert_eq!(pricing.resolve("search/tx").await, TokenAmount::from_units(7));
        assert_eq!(pricing.resolve("search/logs").await, TokenAmount::from_units(9));
    }
}
