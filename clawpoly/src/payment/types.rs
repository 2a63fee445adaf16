//! Wire types of the x402 handshake.

use alloy_primitives::{Address, B256, Bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::amount::TokenAmount;
use crate::timestamp::{UnixTimestamp, iso_millis};

/// Protocol version marker, serialized as `"x402-v1"`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct X402V1;

impl X402V1 {
    /// Wire value of this version.
    pub const VALUE: &'static str = "x402-v1";
}

impl std::fmt::Display for X402V1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::VALUE)
    }
}

impl Serialize for X402V1 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(Self::VALUE)
    }
}

impl<'de> Deserialize<'de> for X402V1 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = String::deserialize(deserializer)?;
        if v == Self::VALUE {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(format!(
                "expected version {}, got {v}",
                Self::VALUE
            )))
        }
    }
}

/// The payment-required descriptor sent with a 402.
///
/// Built fresh for every challenge and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredInfo {
    /// Protocol version.
    pub version: X402V1,
    /// CAIP-2 network, e.g. `eip155:137`.
    pub network: String,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Address that must receive the payment.
    pub pay_to: Address,
    /// Token contract to pay with.
    pub token: Address,
    /// Token symbol.
    pub token_symbol: String,
    /// Token decimals.
    pub token_decimals: u8,
    /// Price in the token's smallest unit.
    pub amount: TokenAmount,
    /// Endpoint being purchased.
    pub endpoint_id: String,
    /// Human-readable description.
    pub description: String,
}

impl PaymentRequiredInfo {
    /// The 402 body message, e.g.
    /// `This endpoint requires payment. Amount: 1000 USDC micro-units ($0.001000)`.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "This endpoint requires payment. Amount: {} {} micro-units ({})",
            self.amount,
            self.token_symbol,
            self.amount.format_usd(self.token_decimals)
        )
    }
}

/// A caller-signed, time-bounded, single-use transfer permission.
///
/// The signature is carried through untouched; its authenticity is checked
/// by the settlement layer, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorization {
    /// Payer.
    pub from: Address,
    /// Recipient; must match the configured payee.
    pub to: Address,
    /// Authorized amount in smallest units.
    pub value: TokenAmount,
    /// Earliest second the authorization may be used.
    pub valid_after: UnixTimestamp,
    /// Latest second the authorization may be used.
    pub valid_before: UnixTimestamp,
    /// Unique 32-byte nonce.
    pub nonce: B256,
    /// Opaque signature.
    #[serde(default)]
    pub signature: Bytes,
}

/// Acknowledgement returned in `PAYMENT-RESPONSE` after a payment is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementAck {
    /// Always `true`; a refused payment never produces an ack.
    pub settled: bool,
    /// Payer.
    pub from: Address,
    /// Authorized amount.
    pub amount: TokenAmount,
    /// Endpoint purchased.
    pub endpoint_id: String,
    /// Acceptance time.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl SettlementAck {
    /// Builds the ack for an accepted authorization.
    #[must_use]
    pub fn accepted(authorization: &PaymentAuthorization, endpoint_id: &str) -> Self {
        Self {
            settled: true,
            from: authorization.from,
            amount: authorization.value,
            endpoint_id: endpoint_id.to_owned(),
            timestamp: Utc::now(),
        }
    }
}
