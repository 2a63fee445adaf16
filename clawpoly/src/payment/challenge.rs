//! Building the payment-required descriptor.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::price::Pricing;
use super::types::{PaymentRequiredInfo, X402V1};
use crate::amount::TokenAmount;
use crate::networks::{POLYGON_MAINNET, USDC_DECIMALS, USDC_POLYGON, USDC_SYMBOL, caip2};

/// Who gets paid, in what token, on which chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Payee. Defaults to the zero address, which no caller should pay.
    pub pay_to: Address,
    /// Token contract.
    pub token: Address,
    /// Token symbol.
    pub token_symbol: String,
    /// Token decimals.
    pub token_decimals: u8,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            pay_to: Address::ZERO,
            token: USDC_POLYGON,
            token_symbol: USDC_SYMBOL.to_owned(),
            token_decimals: USDC_DECIMALS,
            chain_id: POLYGON_MAINNET,
        }
    }
}

/// Builds priced, addressed challenges for endpoints.
#[derive(Debug, Clone)]
pub struct PaymentChallenge {
    config: PaymentConfig,
    pricing: Pricing,
}

impl PaymentChallenge {
    /// Creates a challenge builder.
    #[must_use]
    pub const fn new(config: PaymentConfig, pricing: Pricing) -> Self {
        Self { config, pricing }
    }

    /// The payment terms this builder advertises.
    #[must_use]
    pub const fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// The price table this builder charges from.
    #[must_use]
    pub const fn pricing(&self) -> &Pricing {
        &self.pricing
    }

    /// The price for `endpoint_id`: the override when given, else the
    /// configured lookup, else the fallback.
    pub async fn price_for(&self, endpoint_id: &str, price_override: Option<TokenAmount>) -> TokenAmount {
        match price_override {
            Some(price) => price,
            None => self.pricing.resolve(endpoint_id).await,
        }
    }

    /// Builds the descriptor for `endpoint_id`.
    pub async fn build(&self, endpoint_id: &str, price_override: Option<TokenAmount>) -> PaymentRequiredInfo {
        let amount = self.price_for(endpoint_id, price_override).await;
        self.build_with_amount(endpoint_id, amount)
    }

    /// Builds the descriptor for an already resolved price.
    #[must_use]
    pub fn build_with_amount(&self, endpoint_id: &str, amount: TokenAmount) -> PaymentRequiredInfo {
        PaymentRequiredInfo {
            version: X402V1,
            network: caip2(self.config.chain_id),
            chain_id: self.config.chain_id,
            pay_to: self.config.pay_to,
            token: self.config.token,
            token_symbol: self.config.token_symbol.clone(),
            token_decimals: self.config.token_decimals,
            amount,
            endpoint_id: endpoint_id.to_owned(),
            description: format!("ClawPoly API access: {endpoint_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    fn challenge() -> PaymentChallenge {
        let config = PaymentConfig {
            pay_to: address!("00000000000000000000000000000000000000aa"),
            ..PaymentConfig::default()
        };
        PaymentChallenge::new(config, Pricing::default())
    }

    #[tokio::test]
    async fn test_challenge_wire_shape() {
        let info = challenge().build("search/tx", None).await;
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["version"], "x402-v1");
        assert_eq!(json["network"], "eip155:137");
        assert_eq!(json["chainId"], 137);
        assert_eq!(json["tokenSymbol"], "USDC");
        assert_eq!(json["tokenDecimals"], 6);
        assert_eq!(json["amount"], "1000");
        assert_eq!(json["endpointId"], "search/tx");
        assert_eq!(json["description"], json!("ClawPoly API access: search/tx"));
        assert_eq!(
            info.message(),
            "This endpoint requires payment. Amount: 1000 USDC micro-units ($0.001000)"
        );
    }

    #[tokio::test]
    async fn test_override_wins_and_unknown_falls_back() {
        let c = challenge();
        let info = c.build("search/address", Some(TokenAmount::from_units(42))).await;
        assert_eq!(info.amount, TokenAmount::from_units(42));
        let info = c.build("search/nope", None).await;
        assert_eq!(info.amount, TokenAmount::from_units(1000));
    }
}
