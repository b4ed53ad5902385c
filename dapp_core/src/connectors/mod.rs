//! The uniform connection contract every wallet adapter implements.

pub mod errors;
pub mod injected;
pub mod metamask;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::event::{Event, Subscription};
use crate::providers::{ProviderEvent, Web3Provider};

pub use errors::ConnectorError;
pub use injected::InjectedConnector;
pub use metamask::MetamaskConnector;

/// How a connection attempt is made, and whether its failures are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    /// May prompt the user. Failures are returned to the caller.
    #[default]
    Interactive,
    /// Silent reconnect using already granted permissions. Never prompts,
    /// never fails: problems are logged at debug level and dropped.
    Eager,
}

impl ConnectMode {
    pub fn surfaces_errors(self) -> bool {
        matches!(self, ConnectMode::Interactive)
    }

    /// The account query for this mode. Only `eth_requestAccounts` prompts.
    pub fn accounts_method(self) -> &'static str {
        match self {
            ConnectMode::Interactive => "eth_requestAccounts",
            ConnectMode::Eager => "eth_accounts",
        }
    }
}

/// A partial update. `None` fields mean "unchanged", not "cleared".
///
/// An update carrying an error carries nothing else.
#[derive(Debug, Clone, Default)]
pub struct ConnectorUpdateData {
    pub chain_id: Option<u64>,
    pub accounts: Option<Vec<String>>,
    pub error: Option<Arc<ConnectorError>>,
}

impl ConnectorUpdateData {
    pub fn connected(chain_id: u64, accounts: Vec<String>) -> Self {
        Self {
            chain_id: Some(chain_id),
            accounts: Some(accounts),
            error: None,
        }
    }

    pub fn chain(chain_id: u64) -> Self {
        Self {
            chain_id: Some(chain_id),
            ..Self::default()
        }
    }

    pub fn accounts(accounts: Vec<String>) -> Self {
        Self {
            accounts: Some(accounts),
            ..Self::default()
        }
    }

    pub fn error(error: ConnectorError) -> Self {
        Self {
            error: Some(Arc::new(error)),
            ..Self::default()
        }
    }
}

/// A connection to one wallet backend.
///
/// Implementations own their provider handle exclusively. They are used for a
/// single activate/deactivate cycle and then discarded.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable label, e.g. `"Metamask"`.
    fn name(&self) -> &str;

    /// Chain and account changes, including ones the wallet makes on its own.
    fn update(&self) -> &Event<ConnectorUpdateData>;

    /// Connect in the given mode.
    ///
    /// On success with [`ConnectMode::Interactive`] the connector has emitted
    /// one update carrying both chain id and accounts. On failure nothing is
    /// emitted. Eager failures are returned too; [`connect_eagerly`] is the
    /// entry point that swallows them.
    ///
    /// [`connect_eagerly`]: Connector::connect_eagerly
    async fn connect(&mut self, mode: ConnectMode) -> Result<(), ConnectorError>;

    /// Release the provider. Safe to call any number of times.
    async fn deactivate(&mut self);

    async fn activate(&mut self) -> Result<(), ConnectorError> {
        self.connect(ConnectMode::Interactive).await
    }

    async fn connect_eagerly(&mut self) {
        if let Err(e) = self.connect(ConnectMode::Eager).await {
            debug!("{}: eager connect failed: {e}", self.name());
        }
    }
}

/// Normalise a wallet-reported chain id (`"0x1"`, `"1"` or `1`) to an integer.
pub fn parse_chain_id(raw: &Value) -> Result<u64, ConnectorError> {
    let parsed = match raw {
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16).ok(),
                None => s.parse::<u64>().ok(),
            }
        }
        Value::Number(n) => n.as_u64(),
        _ => None,
    };
    match parsed {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ConnectorError::InvalidChainId(raw.to_string())),
    }
}

/// Query chain id, then accounts, the way `mode` allows.
///
/// `Ok(None)` means an eager attempt found no previously authorized account.
pub(crate) async fn request_update(
    connector: &str,
    provider: &Web3Provider,
    mode: ConnectMode,
) -> Result<Option<ConnectorUpdateData>, ConnectorError> {
    let chain_id: Value = provider
        .send("eth_chainId", Vec::new())
        .await
        .map_err(|e| ConnectorError::rpc(connector, e))?;
    let chain_id = parse_chain_id(&chain_id)?;

    let accounts: Vec<String> = provider
        .send(mode.accounts_method(), Vec::new())
        .await
        .map_err(|e| ConnectorError::rpc(connector, e))?;

    if accounts.is_empty() {
        return match mode {
            ConnectMode::Eager => {
                debug!("{connector}: no previously authorized accounts");
                Ok(None)
            }
            ConnectMode::Interactive => Err(ConnectorError::NoAccounts {
                connector: connector.to_string(),
            }),
        };
    }
    Ok(Some(ConnectorUpdateData::connected(chain_id, accounts)))
}

/// Log a failed attempt. Only interactive failures are worth a warning; an
/// eager attempt failing is routine.
pub(crate) fn log_failure(
    connector: &str,
    mode: ConnectMode,
    outcome: Result<(), ConnectorError>,
) -> Result<(), ConnectorError> {
    if let Err(e) = &outcome {
        if mode.surfaces_errors() {
            warn!("{connector}: {e}");
        }
    }
    outcome
}

/// Re-emit the wallet's own events as connector updates.
pub(crate) fn forward_provider_events(
    connector: &str,
    provider: &Web3Provider,
    update: &Event<ConnectorUpdateData>,
) -> Option<Subscription<ProviderEvent>> {
    let events = provider.events()?;
    let connector = connector.to_string();
    let update = update.clone();
    Some(events.subscribe(move |event| {
        debug!("{connector}: wallet event {event:?}");
        let data = match event {
            ProviderEvent::ChainChanged(raw) => {
                match parse_chain_id(&Value::String(raw.clone())) {
                    Ok(id) => ConnectorUpdateData::chain(id),
                    Err(e) => ConnectorUpdateData::error(e),
                }
            }
            ProviderEvent::AccountsChanged(accounts) => {
                ConnectorUpdateData::accounts(accounts.clone())
            }
            ProviderEvent::Disconnect { code, message } => {
                ConnectorUpdateData::error(ConnectorError::Disconnected {
                    connector: connector.clone(),
                    code: *code,
                    message: message.clone(),
                })
            }
        };
        update.emit(&data);
    }))
}
