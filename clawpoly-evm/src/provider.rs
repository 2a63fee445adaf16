//! Provider construction.
//!
//! Reads go through a plain HTTP provider. Receipt anchoring needs a
//! provider that also fills gas, nonce and chain id and signs with the
//! configured receipt signer.

use std::str::FromStr;

use alloy_network::EthereumWallet;
use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_signer_local::PrivateKeySigner;
use url::Url;

/// Failure to build a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The signer key is not a valid secp256k1 private key.
    #[error("invalid signer private key: {0}")]
    InvalidKey(String),
}

/// A read-only provider for `rpc_url`.
#[must_use]
pub fn read_provider(rpc_url: Url) -> DynProvider {
    ProviderBuilder::default().connect_http(rpc_url).erased()
}

/// A provider that signs transactions with `private_key`.
///
/// The key is hex, with or without a `0x` prefix. Returns the provider and
/// the signer address.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidKey`] if the key does not parse.
pub fn signing_provider(rpc_url: Url, private_key: &str) -> Result<(DynProvider, Address), ProviderError> {
    let signer = PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| ProviderError::InvalidKey(e.to_string()))?;
    let address = signer.address();
    let provider = ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_http(rpc_url)
        .erased();

    #[cfg(feature = "telemetry")]
    tracing::info!(signer = %address, "Using receipt signer");

    Ok((provider, address))
}
