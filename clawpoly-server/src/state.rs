//! Shared application state and its construction from configuration.

use std::path::Path;
use std::sync::Arc;

use clawpoly::catalog::{CatalogListing, DefaultCatalog, EndpointCatalog};
use clawpoly::payment::{PaymentGate, Pricing};
use clawpoly::receipt::ReceiptRecorder;
use clawpoly::source::{BlockExplorer, ChainData};
use clawpoly_evm::{OnchainRegistry, RpcChainData, SearchReceiptAnchor, read_provider};
use clawpoly_http::explorer::ExplorerClient;

use crate::config::{ConfigError, RateLimitConfig, ServerConfig};
use crate::docs::DocsIndex;
use crate::error::ApiError;

/// Where `/api/x402/endpoints` reads its listing.
#[derive(Debug, Clone)]
pub enum Catalog {
    /// The built-in table.
    Defaults,
    /// The on-chain registries.
    Onchain(OnchainRegistry),
}

impl Catalog {
    /// Lists every endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Catalog`] if the registry cannot be read.
    pub async fn list(&self) -> Result<CatalogListing, ApiError> {
        match self {
            Self::Defaults => DefaultCatalog
                .list()
                .await
                .map_err(|e| ApiError::Catalog(e.to_string())),
            Self::Onchain(registry) => registry
                .list()
                .await
                .map_err(|e| ApiError::Catalog(e.to_string())),
        }
    }
}

/// State shared by every handler.
#[allow(missing_debug_implementations)] // trait objects are not Debug
pub struct AppState {
    /// Chain RPC.
    pub chain: Arc<dyn ChainData>,
    /// Block-explorer API.
    pub explorer: Arc<dyn BlockExplorer>,
    /// Payment challenge and verification.
    pub gate: Arc<PaymentGate>,
    /// Budgets for paid and free routes.
    pub rate_limits: RateLimitConfig,
    /// Receipt anchoring.
    pub recorder: ReceiptRecorder,
    /// Endpoint listing.
    pub catalog: Catalog,
    /// Documentation search index.
    pub docs: DocsIndex,
    /// Chain id recorded in evidence and reported by health checks.
    pub chain_id: u64,
    /// Prefix of the URI recorded with each receipt.
    pub receipt_uri: String,
}

/// Handle passed to axum handlers.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wires every collaborator from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a configured address, key or URL is unusable.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let provider = read_provider(config.chain.rpc_url.clone());
        let chain = RpcChainData::new(provider.clone());

        let explorer = ExplorerClient::new(config.explorer.api_url.clone(), config.explorer.api_key())
            .map_err(|e| ConfigError::Invalid {
                field: "explorer",
                message: e.to_string(),
            })?;
        if config.explorer.api_key().is_empty() {
            tracing::warn!("no explorer API key configured, requests will be heavily throttled upstream");
        }

        let payment = config.payment.payment_config()?;
        if payment.pay_to.is_zero() {
            tracing::warn!("payment.pay_to is not set, challenges will name the zero address");
        }
        let static_prices = config.payment.static_prices();
        let fallback = config.payment.default_price;

        let (catalog, pricing) = match config.registry.addresses()? {
            Some((endpoints, pricing_registry)) => {
                let registry = OnchainRegistry::new(endpoints, pricing_registry, provider)
                    .with_fallback(static_prices);
                tracing::info!(%endpoints, pricing = %pricing_registry, "using on-chain endpoint registry");
                let pricing = Pricing::new(Arc::new(registry.clone())).with_fallback(fallback);
                (Catalog::Onchain(registry), pricing)
            }
            None => {
                tracing::info!("using built-in endpoint catalogue");
                (Catalog::Defaults, Pricing::new(Arc::new(static_prices)).with_fallback(fallback))
            }
        };

        let recorder = match config.receipts.anchor_settings()? {
            Some((key, contract)) => {
                let anchor = SearchReceiptAnchor::connect(config.chain.rpc_url.clone(), contract, key)
                    .map_err(|e| ConfigError::Invalid {
                        field: "receipts.signer_private_key",
                        message: e.to_string(),
                    })?;
                tracing::info!(%contract, signer = %anchor.signer(), "anchoring receipts on-chain");
                ReceiptRecorder::with_anchor(Arc::new(anchor))
            }
            None => {
                tracing::info!("receipt anchoring disabled, receipts are off-chain only");
                ReceiptRecorder::offchain()
            }
        };

        tracing::info!(
            paid = config.rate_limit.paid.max_requests,
            free = config.rate_limit.free.max_requests,
            "rate limits and payment nonces are tracked in memory per instance"
        );

        Ok(Self {
            chain: Arc::new(chain),
            explorer: Arc::new(explorer),
            gate: PaymentGate::new(payment, pricing).shared(),
            rate_limits: config.rate_limit,
            recorder,
            catalog,
            docs: DocsIndex::load(Path::new(&config.docs.index_path)),
            chain_id: config.payment.chain_id,
            receipt_uri: config.receipts.uri.clone(),
        })
    }

    /// The URI recorded with a receipt for `path`.
    #[must_use]
    pub fn receipt_uri_for(&self, path: &str) -> String {
        format!("{}{path}", self.receipt_uri.trim_end_matches('/'))
    }
}
