//! Token amounts in smallest units.
//!
//! Prices and payment values travel as decimal strings of the token's
//! smallest unit (USDC micro-units: `1000` is $0.001).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An integer amount of a token in its smallest unit.
///
/// Serialized as a decimal string; deserialization also accepts a JSON
/// integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenAmount(pub U256);

impl TokenAmount {
    /// Creates an amount from a `u64` count of smallest units.
    #[must_use]
    pub fn from_units(units: u64) -> Self {
        Self(U256::from(units))
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    /// Renders the amount as a dollar string with six decimals, e.g. `$0.001000`.
    ///
    /// Amounts too large for a decimal fall back to the token-unit rendering.
    #[must_use]
    pub fn format_usd(&self, decimals: u8) -> String {
        u128::try_from(self.0)
            .ok()
            .and_then(|units| i128::try_from(units).ok())
            .and_then(|units| Decimal::try_from_i128_with_scale(units, u32::from(decimals)).ok())
            .map_or_else(
                || format!("${}", format_units(self.0, decimals, 6)),
                |d| format!("${:.6}", d.round_dp(6)),
            )
    }
}

impl From<u64> for TokenAmount {
    fn from(units: u64) -> Self {
        Self::from_units(units)
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error parsing a [`TokenAmount`] from text.
#[derive(Debug, thiserror::Error)]
#[error("invalid token amount {0:?}: expected a non-negative decimal integer")]
pub struct ParseAmountError(String);

impl FromStr for TokenAmount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseAmountError(s.to_owned()));
        }
        U256::from_str_radix(trimmed, 10)
            .map(Self)
            .map_err(|_| ParseAmountError(s.to_owned()))
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct TokenAmountVisitor;

impl Visitor<'_> for TokenAmountVisitor {
    type Value = TokenAmount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or its decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(TokenAmount::from_units(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map(TokenAmount::from_units)
            .map_err(|_| E::custom("amount must be non-negative"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TokenAmountVisitor)
    }
}

/// Formats `amount` scaled down by `decimals`, rounded half-up to `places`
/// fractional digits.
///
/// ```
/// use alloy_primitives::U256;
/// use clawpoly::amount::format_units;
///
/// let wei = U256::from(1_234_567_890_000_000_000u64);
/// assert_eq!(format_units(wei, 18, 6), "1.234568");
/// ```
#[must_use]
pub fn format_units(amount: U256, decimals: u8, places: u8) -> String {
    let ten = U256::from(10u8);
    let base = ten.pow(U256::from(decimals));
    let precision = ten.pow(U256::from(places));
    let scaled = amount
        .saturating_mul(precision)
        .saturating_add(base / U256::from(2u8))
        / base;
    let whole = scaled / precision;
    if places == 0 {
        return whole.to_string();
    }
    let frac = (scaled % precision).to_string();
    format!("{whole}.{frac:0>width$}", width = usize::from(places))
}
