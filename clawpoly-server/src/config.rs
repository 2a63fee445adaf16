//! Server configuration.
//!
//! Loaded from a TOML file. String values may reference environment
//! variables as `$VAR` or `${VAR}`; unresolved references are left in
//! place, and optional settings still holding one are treated as unset.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//!
//! [payment]
//! pay_to = "$X402_PAY_TO_ADDRESS"
//! default_price = 1000
//!
//! [payment.prices]
//! "search/address" = 2000
//!
//! [chain]
//! rpc_url = "https://polygon-bor-rpc.publicnode.com"
//!
//! [explorer]
//! api_key = "$POLYGONSCAN_API_KEY"
//!
//! [receipts]
//! enabled = true
//! signer_private_key = "$RECEIPT_SIGNER_PRIVATE_KEY"
//! contract_address = "$RECEIPT_CONTRACT_ADDRESS"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `config.toml`)
//! - `HOST` - Override the bind address
//! - `PORT` - Override the port

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use alloy_primitives::Address;
use clawpoly::amount::TokenAmount;
use clawpoly::catalog::FALLBACK_PRICE_UNITS;
use clawpoly::networks::{DEFAULT_POLYGON_RPC, POLYGON_MAINNET, USDC_DECIMALS, USDC_POLYGON, USDC_SYMBOL};
use clawpoly::payment::{PaymentConfig, StaticPrices};
use clawpoly::rate_limit::RateLimitPolicy;
use clawpoly_http::explorer::DEFAULT_EXPLORER_URL;
use serde::{Deserialize, Serialize};
use url::Url;

/// Failure to load the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but cannot be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for [`ServerConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    /// A setting parsed but holds an unusable value.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Setting path, e.g. `payment.pay_to`.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Port (default: `3000`).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request budgets.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Payment terms and prices.
    #[serde(default)]
    pub payment: PaymentSection,
    /// Chain RPC.
    #[serde(default)]
    pub chain: ChainSection,
    /// Block-explorer API.
    #[serde(default)]
    pub explorer: ExplorerSection,
    /// Receipt anchoring.
    #[serde(default)]
    pub receipts: ReceiptsSection,
    /// On-chain endpoint and pricing registries.
    #[serde(default)]
    pub registry: RegistrySection,
    /// Documentation search.
    #[serde(default)]
    pub docs: DocsSection,
}

/// Budgets for paid and free routes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Applied to the paid search routes.
    #[serde(default = "paid_policy")]
    pub paid: RateLimitPolicy,
    /// Applied to the free routes.
    #[serde(default = "free_policy")]
    pub free: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            paid: RateLimitPolicy::PAID,
            free: RateLimitPolicy::FREE,
        }
    }
}

/// Payment terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSection {
    /// Payee address. Unset means the zero address.
    pub pay_to: Option<String>,
    /// Token contract.
    pub token: Address,
    /// Token symbol.
    pub token_symbol: String,
    /// Token decimals.
    pub token_decimals: u8,
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Price for endpoints absent from every table.
    pub default_price: TokenAmount,
    /// Per-endpoint prices, layered over the built-in table.
    pub prices: HashMap<String, TokenAmount>,
}

impl Default for PaymentSection {
    fn default() -> Self {
        Self {
            pay_to: None,
            token: USDC_POLYGON,
            token_symbol: USDC_SYMBOL.to_owned(),
            token_decimals: USDC_DECIMALS,
            chain_id: POLYGON_MAINNET,
            default_price: TokenAmount::from_units(FALLBACK_PRICE_UNITS),
            prices: HashMap::new(),
        }
    }
}

impl PaymentSection {
    /// The payment terms advertised in challenges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `pay_to` is not an address.
    pub fn payment_config(&self) -> Result<PaymentConfig, ConfigError> {
        let pay_to = parse_address("payment.pay_to", self.pay_to.as_deref())?.unwrap_or(Address::ZERO);
        Ok(PaymentConfig {
            pay_to,
            token: self.token,
            token_symbol: self.token_symbol.clone(),
            token_decimals: self.token_decimals,
            chain_id: self.chain_id,
        })
    }

    /// The built-in price table with configured prices layered on top.
    #[must_use]
    pub fn static_prices(&self) -> StaticPrices {
        self.prices
            .iter()
            .fold(StaticPrices::defaults(), |table, (id, price)| {
                table.with_price(id.clone(), *price)
            })
    }
}

/// Chain RPC settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSection {
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: Url,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
        }
    }
}

/// Block-explorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerSection {
    /// API root.
    #[serde(default = "default_explorer_url")]
    pub api_url: Url,
    /// API key; may be empty.
    #[serde(default)]
    pub api_key: String,
}

impl Default for ExplorerSection {
    fn default() -> Self {
        Self {
            api_url: default_explorer_url(),
            api_key: String::new(),
        }
    }
}

impl ExplorerSection {
    /// The API key, with an unresolved `$VAR` treated as empty.
    #[must_use]
    pub fn api_key(&self) -> &str {
        resolved(Some(&self.api_key)).unwrap_or_default()
    }
}

/// Receipt anchoring settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptsSection {
    /// Whether to anchor receipts on-chain.
    pub enabled: bool,
    /// Signer key, hex.
    pub signer_private_key: Option<String>,
    /// `SearchReceipt` contract.
    pub contract_address: Option<String>,
    /// Prefix of the URI recorded with each receipt.
    pub uri: String,
}

impl ReceiptsSection {
    /// Signer key and contract, when anchoring is enabled and both are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the contract address does not parse.
    pub fn anchor_settings(&self) -> Result<Option<(&str, Address)>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }
        let key = resolved(self.signer_private_key.as_deref());
        let contract = parse_address("receipts.contract_address", self.contract_address.as_deref())?;
        Ok(key.zip(contract))
    }
}

/// On-chain registry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// `EndpointRegistry` contract.
    pub endpoint_registry: Option<String>,
    /// `PricingRegistry` contract.
    pub pricing_registry: Option<String>,
}

impl RegistrySection {
    /// Both registry addresses, when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an address does not parse.
    pub fn addresses(&self) -> Result<Option<(Address, Address)>, ConfigError> {
        let endpoints = parse_address("registry.endpoint_registry", self.endpoint_registry.as_deref())?;
        let pricing = parse_address("registry.pricing_registry", self.pricing_registry.as_deref())?;
        Ok(endpoints.zip(pricing))
    }
}

/// Documentation search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsSection {
    /// JSON index file.
    #[serde(default = "default_docs_index")]
    pub index_path: String,
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            index_path: default_docs_index(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    3000
}

const fn paid_policy() -> RateLimitPolicy {
    RateLimitPolicy::PAID
}

const fn free_policy() -> RateLimitPolicy {
    RateLimitPolicy::FREE
}

fn default_rpc_url() -> Url {
    Url::parse(DEFAULT_POLYGON_RPC).unwrap_or_else(|_| unreachable!("default RPC URL is valid"))
}

fn default_explorer_url() -> Url {
    Url::parse(DEFAULT_EXPLORER_URL).unwrap_or_else(|_| unreachable!("default explorer URL is valid"))
}

fn default_docs_index() -> String {
    "docs-index.json".to_owned()
}

/// `value` unless it is empty or still an unresolved `$VAR`.
fn resolved(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.starts_with('$'))
}

fn parse_address(field: &'static str, value: Option<&str>) -> Result<Option<Address>, ConfigError> {
    resolved(value)
        .map(|raw| {
            raw.parse::<Address>().map_err(|e| ConfigError::Invalid {
                field,
                message: e.to_string(),
            })
        })
        .transpose()
}

impl ServerConfig {
    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults. After loading, `HOST` and `PORT`
    /// override the file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path)?
        } else {
            String::new()
        };
        let mut config = Self::parse(&content)?;

        if let Some(host) = std::env::var("HOST").ok().and_then(|h| h.parse().ok()) {
            config.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        Ok(config)
    }

    /// Parses a TOML document after expanding environment references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content))?)
    }
}

/// Expands `$VAR` and `${VAR}` from the process environment.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name).filter(|_| !name.is_empty()) {
            Some(value) => result.push_str(&value),
            None if braced => {
                result.push_str("${");
                result.push_str(&name);
                if !name.is_empty() {
                    result.push('}');
                }
            }
            None => {
                result.push('$');
                result.push_str(&name);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "PAY_TO" => Some("0x00000000000000000000000000000000000000aa".to_owned()),
            "KEY" => Some("secret".to_owned()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_env_vars() {
        assert_eq!(expand_with("a=$KEY;b=${KEY}", env), "a=secret;b=secret");
        assert_eq!(expand_with("$MISSING ${MISSING}", env), "$MISSING ${MISSING}");
        assert_eq!(expand_with("cost: $ 5", env), "cost: $ 5");
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit.paid, RateLimitPolicy::PAID);
        assert_eq!(config.rate_limit.free, RateLimitPolicy::FREE);
        assert_eq!(config.chain.rpc_url.as_str(), "https://polygon-bor-rpc.publicnode.com/");
        assert_eq!(config.payment.default_price, TokenAmount::from_units(1000));
        assert_eq!(config.payment.payment_config().unwrap().pay_to, Address::ZERO);
        assert!(config.receipts.anchor_settings().unwrap().is_none());
        assert!(config.registry.addresses().unwrap().is_none());
    }

    #[test]
    fn test_sections_parse() {
        let doc = expand_with(
            r#"
            port = 8080

            [rate_limit.paid]
            max_requests = 5
            window_ms = 1000

            [payment]
            pay_to = "$PAY_TO"
            default_price = "2500"

            [payment.prices]
            "search/tx" = 700

            [explorer]
            api_key = "$POLYGONSCAN_API_KEY"

            [receipts]
            enabled = true
            signer_private_key = "$RECEIPT_SIGNER_PRIVATE_KEY"
            contract_address = "0x00000000000000000000000000000000000000c0"
            "#,
            env,
        );
        let config: ServerConfig = toml::from_str(&doc).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rate_limit.paid.max_requests, 5);
        assert_eq!(config.rate_limit.free, RateLimitPolicy::FREE);

        let payment = config.payment.payment_config().unwrap();
        assert_eq!(payment.pay_to, alloy_primitives::address!("00000000000000000000000000000000000000aa"));
        assert_eq!(config.payment.default_price, TokenAmount::from_units(2500));

        let prices = config.payment.static_prices();
        assert_eq!(prices.get("search/tx"), Some(TokenAmount::from_units(700)));
        assert_eq!(prices.get("search/address"), Some(TokenAmount::from_units(2000)));

        assert_eq!(config.explorer.api_key(), "");
        // unresolved signer key disables anchoring
        assert!(config.receipts.anchor_settings().unwrap().is_none());
    }

    #[test]
    fn test_example_file_parses_without_environment() {
        let doc = expand_with(include_str!("../config.example.toml"), |_| None);
        let config: ServerConfig = toml::from_str(&doc).unwrap();
        assert_eq!(config.rate_limit.paid, RateLimitPolicy::PAID);
        assert_eq!(config.payment.token, USDC_POLYGON);
        assert_eq!(
            config.payment.static_prices().get("search/contract"),
            Some(TokenAmount::from_units(1500))
        );
        assert_eq!(config.payment.payment_config().unwrap().pay_to, Address::ZERO);
        assert!(config.registry.addresses().unwrap().is_none());
        assert!(config.receipts.anchor_settings().unwrap().is_none());
    }

    #[test]
    fn test_invalid_address_is_reported() {
        let config: ServerConfig = toml::from_str(
            r#"
            [registry]
            endpoint_registry = "0x1234"
            pricing_registry = "0x00000000000000000000000000000000000000e2"
            "#,
        )
        .unwrap();
        let err = config.registry.addresses().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "registry.endpoint_registry", .. }));
    }
}
