use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Eip1193Provider, ProviderEvent, RpcError};
use crate::event::Event;

/// Generic RPC wrapper around an injected [`Eip1193Provider`].
///
/// Cloning is cheap and shares the underlying handle.
#[derive(Clone)]
pub struct Web3Provider {
    inner: Arc<dyn Eip1193Provider>,
}

impl Web3Provider {
    pub fn new(inner: Arc<dyn Eip1193Provider>) -> Self {
        Self { inner }
    }

    /// Send `method` and decode its result into `T`.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, RpcError> {
        debug!("-> {method} {params:?}");
        let result = self.inner.request(method, Value::Array(params)).await?;
        debug!("<- {method} {result}");
        serde_json::from_value(result).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn is_metamask(&self) -> bool {
        self.inner.is_metamask()
    }

    pub fn events(&self) -> Option<Event<ProviderEvent>> {
        self.inner.events()
    }

    /// The wrapped EIP-1193 handle.
    pub fn raw(&self) -> &Arc<dyn Eip1193Provider> {
        &self.inner
    }
}

impl fmt::Debug for Web3Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Web3Provider").field(&self.inner).finish()
    }
}
