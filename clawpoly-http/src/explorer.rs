//! HTTP client for a `PolygonScan`-compatible block-explorer API.
//!
//! Every call is a `GET` on the API root with `module`, `action` and
//! `apikey` query parameters. The explorer wraps results in
//! `{status, message, result}`; a `status` other than `"1"` means "no
//! data" (e.g. an address without transactions, an unverified contract)
//! and is reported as an empty result, not an error.

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use clawpoly::error::ExplorerError;
use clawpoly::source::{BlockExplorer, ExplorerSource, ExplorerTokenTx, ExplorerTx};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Default explorer API root.
pub const DEFAULT_EXPLORER_URL: &str = "https://api.polygonscan.com/api";

/// Number of rows requested from list actions.
pub const PAGE_SIZE: u32 = 25;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    result: Value,
}

impl Envelope {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }
}

/// Explorer client over reqwest.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl ExplorerClient {
    /// Creates a client for `base_url` with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Creates a client reusing an existing reqwest [`Client`].
    #[must_use]
    pub fn with_client(client: Client, base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn url(&self, module: &str, action: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("apikey", &self.api_key);
            query.append_pair("module", module);
            query.append_pair("action", action);
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        url
    }

    async fn fetch(
        &self,
        action: &'static str,
        url: Url,
    ) -> Result<Envelope, ExplorerError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ExplorerError::Http {
                action,
                message: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExplorerError::Status {
                action,
                status: status.as_u16(),
            });
        }
        response
            .json::<Envelope>()
            .await
            .map_err(|e| ExplorerError::Decode {
                action,
                message: e.to_string(),
            })
    }

    async fn account_list<T: DeserializeOwned>(
        &self,
        action: &'static str,
        address: Address,
    ) -> Result<Vec<T>, ExplorerError> {
        let address = address.to_string();
        let offset = PAGE_SIZE.to_string();
        let url = self.url(
            "account",
            action,
            &[
                ("address", address.as_str()),
                ("startblock", "0"),
                ("endblock", "99999999"),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
            ],
        );
        let envelope = self.fetch(action, url).await?;
        if !envelope.is_ok() || !envelope.result.is_array() {
            return Ok(Vec::new());
        }
        serde_json::from_value(envelope.result).map_err(|e| ExplorerError::Decode {
            action,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl BlockExplorer for ExplorerClient {
    async fn tx_list(&self, address: Address) -> Result<Vec<ExplorerTx>, ExplorerError> {
        self.account_list("txlist", address).await
    }

    async fn token_transfers(&self, address: Address) -> Result<Vec<ExplorerTokenTx>, ExplorerError> {
        self.account_list("tokentx", address).await
    }

    async fn abi(&self, address: Address) -> Result<Option<Value>, ExplorerError> {
        let address = address.to_string();
        let url = self.url("contract", "getabi", &[("address", address.as_str())]);
        let envelope = self.fetch("getabi", url).await?;
        if !envelope.is_ok() {
            return Ok(None);
        }
        match envelope.result {
            Value::String(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| ExplorerError::Decode {
                    action: "getabi",
                    message: e.to_string(),
                }),
            other => Ok(Some(other)),
        }
    }

    async fn source(&self, address: Address) -> Result<Option<ExplorerSource>, ExplorerError> {
        let address = address.to_string();
        let url = self.url("contract", "getsourcecode", &[("address", address.as_str())]);
        let envelope = self.fetch("getsourcecode", url).await?;
        let Value::Array(mut rows) = envelope.result else {
            return Ok(None);
        };
        if rows.is_empty() {
            return Ok(None);
        }
        serde_json::from_value(rows.swap_remove(0))
            .map(Some)
            .map_err(|e| ExplorerError::Decode {
                action: "getsourcecode",
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: Address = address!("1111111111111111111111111111111111111111");

    fn client(server: &MockServer) -> ExplorerClient {
        let url = Url::parse(&format!("{}/api", server.uri())).unwrap();
        ExplorerClient::new(url, "test-key").unwrap()
    }

    #[tokio::test]
    async fn test_tx_list_parses_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .and(query_param("module", "account"))
            .and(query_param("action", "txlist"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("offset", "25"))
            .and(query_param("sort", "desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "blockNumber": "50000000",
                    "timeStamp": "1700000000",
                    "hash": "0xabc",
                    "from": "0x1111111111111111111111111111111111111111",
                    "to": "0x2222222222222222222222222222222222222222",
                    "value": "1000",
                    "isError": "0",
                    "functionName": "transfer(address,uint256)"
                }]
            })))
            .mount(&server)
            .await;

        let txs = client(&server).tx_list(ACCOUNT).await.unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].block_number, "50000000");
        assert_eq!(txs[0].function_name, "transfer(address,uint256)");
    }

    #[tokio::test]
    async fn test_no_transactions_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "tokentx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0",
                "message": "No transactions found",
                "result": []
            })))
            .mount(&server)
            .await;

        let transfers = client(&server).token_transfers(ACCOUNT).await.unwrap();
        assert!(transfers.is_empty());
    }

    #[tokio::test]
    async fn test_abi_is_parsed_from_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getabi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": "[{\"type\":\"function\",\"name\":\"totalSupply\"}]"
            })))
            .mount(&server)
            .await;

        let abi = client(&server).abi(ACCOUNT).await.unwrap().unwrap();
        assert_eq!(abi[0]["name"], "totalSupply");
    }

    #[tokio::test]
    async fn test_unverified_abi_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getabi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "0",
                "message": "NOTOK",
                "result": "Contract source code not verified"
            })))
            .mount(&server)
            .await;

        assert!(client(&server).abi(ACCOUNT).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_source_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("action", "getsourcecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "1",
                "message": "OK",
                "result": [{
                    "SourceCode": "contract Token {}",
                    "ContractName": "Token",
                    "CompilerVersion": "v0.8.20+commit.a1b79de6",
                    "OptimizationUsed": "1",
                    "Runs": "200",
                    "EVMVersion": "paris",
                    "LicenseType": "MIT"
                }]
            })))
            .mount(&server)
            .await;

        let source = client(&server).source(ACCOUNT).await.unwrap().unwrap();
        assert!(source.is_verified());
        assert_eq!(source.contract_name, "Token");
        assert_eq!(source.evm_version, "paris");
    }

    #[tokio::test]
    async fn test_http_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server).tx_list(ACCOUNT).await.unwrap_err();
        assert!(matches!(err, ExplorerError::Status { status: 503, .. }));
    }
}
