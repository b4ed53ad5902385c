//! EIP-1193 surface of a local wallet daemon reachable over HTTP.
//!
//! Desktop wallets such as Frame expose the same `eth_requestAccounts` /
//! `eth_accounts` / `eth_chainId` methods a browser extension injects, just
//! on a loopback JSON-RPC port. Plain HTTP cannot push events, so
//! [`Eip1193Provider::events`] stays `None` here.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Eip1193Provider, RpcError};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug)]
pub struct HttpProvider {
    client: Client,
    url: String,
    next_id: AtomicU64,
    metamask: bool,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
            metamask: false,
        }
    }

    /// Report the MetaMask flag, for daemons that impersonate it.
    pub fn flag_metamask(mut self, metamask: bool) -> Self {
        self.metamask = metamask;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn decode(method: &str, response: JsonRpcResponse) -> Result<Value, RpcError> {
        match (response.error, response.result) {
            (Some(err), _) => Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
                data: err.data,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(RpcError::Decode {
                method: method.to_string(),
                reason: "response has neither result nor error".into(),
            }),
        }
    }
}

#[async_trait]
impl Eip1193Provider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!("POST {} #{id} {method}", self.url);
        let response: JsonRpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Self::decode(method, response)
    }

    fn is_metamask(&self) -> bool {
        self.metamask
    }
}
