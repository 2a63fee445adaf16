//! Well-known Polygon network and token constants.

use alloy_primitives::{Address, address};

/// Polygon `PoS` mainnet chain id.
pub const POLYGON_MAINNET: u64 = 137;

/// Short chain name reported by health checks.
pub const POLYGON_NAME: &str = "polygon";

/// Native USDC on Polygon `PoS`.
pub const USDC_POLYGON: Address = address!("3c499c542cEF5E3811e1192ce70d8cC03d5c3359");

/// USDC symbol.
pub const USDC_SYMBOL: &str = "USDC";

/// USDC decimals.
pub const USDC_DECIMALS: u8 = 6;

/// Public Polygon RPC used when no endpoint is configured.
pub const DEFAULT_POLYGON_RPC: &str = "https://polygon-bor-rpc.publicnode.com";

/// Formats an EIP-155 chain id as a CAIP-2 identifier, e.g. `eip155:137`.
#[must_use]
pub fn caip2(chain_id: u64) -> String {
    format!("eip155:{chain_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caip2() {
        assert_eq!(caip2(POLYGON_MAINNET), "eip155:137");
    }
}
