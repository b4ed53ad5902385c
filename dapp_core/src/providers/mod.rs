pub mod detect;
pub mod errors;
pub mod http;
pub mod web3;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::event::Event;

pub use detect::{detect_ethereum_provider, DetectOptions, InjectionHost, StaticHost};
pub use errors::RpcError;
pub use http::HttpProvider;
pub use web3::Web3Provider;

/// Notifications a wallet pushes on its own, outside any request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Raw chain id as the wallet reports it (usually `"0x…"`).
    ChainChanged(String),
    AccountsChanged(Vec<String>),
    Disconnect { code: i64, message: String },
}

/// A wallet-supplied request handle in the shape of EIP-1193.
///
/// Browser wallets inject one of these; local wallet daemons expose the same
/// surface over HTTP (see [`HttpProvider`]).
#[async_trait]
pub trait Eip1193Provider: Send + Sync + fmt::Debug {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// `true` when the wallet identifies itself as MetaMask.
    fn is_metamask(&self) -> bool {
        false
    }

    /// Source of wallet-originated events, if the transport has one.
    fn events(&self) -> Option<Event<ProviderEvent>> {
        None
    }
}

/// Closed set of raw provider shapes a caller may hand to the controller.
#[derive(Debug, Clone)]
pub enum ProviderKind {
    /// A bare EIP-1193 handle that still needs wrapping.
    External(Arc<dyn Eip1193Provider>),
    /// An already wrapped RPC provider, used as is.
    Web3(Web3Provider),
}

impl ProviderKind {
    pub fn into_web3(self) -> Web3Provider {
        match self {
            ProviderKind::External(raw) => Web3Provider::new(raw),
            ProviderKind::Web3(provider) => provider,
        }
    }
}

impl From<Arc<dyn Eip1193Provider>> for ProviderKind {
    fn from(raw: Arc<dyn Eip1193Provider>) -> Self {
        ProviderKind::External(raw)
    }
}

impl From<Web3Provider> for ProviderKind {
    fn from(provider: Web3Provider) -> Self {
        ProviderKind::Web3(provider)
    }
}
