use async_trait::async_trait;
use log::{debug, info};

use super::{
    forward_provider_events, log_failure, request_update, ConnectMode, Connector, ConnectorError,
    ConnectorUpdateData,
};
use crate::event::{Event, Subscription};
use crate::providers::{ProviderEvent, ProviderKind, Web3Provider};

/// Adapter for a provider the caller already holds, so no detection runs.
///
/// This is what a raw provider handed to the controller gets wrapped in.
pub struct InjectedConnector {
    provider: Option<Web3Provider>,
    update: Event<ConnectorUpdateData>,
    provider_events: Option<Subscription<ProviderEvent>>,
}

impl InjectedConnector {
    pub const NAME: &'static str = "Injected";

    pub fn new(provider: impl Into<ProviderKind>) -> Self {
        Self {
            provider: Some(provider.into().into_web3()),
            update: Event::new(),
            provider_events: None,
        }
    }

    pub fn provider(&self) -> Option<&Web3Provider> {
        self.provider.as_ref()
    }

    async fn try_connect(&mut self, mode: ConnectMode) -> Result<(), ConnectorError> {
        let Some(provider) = self.provider.clone() else {
            return Err(ConnectorError::Inactive {
                connector: Self::NAME.into(),
            });
        };
        if let Some(data) = request_update(Self::NAME, &provider, mode).await? {
            if self.provider_events.is_none() {
                self.provider_events = forward_provider_events(Self::NAME, &provider, &self.update);
            }
            self.update.emit(&data);
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for InjectedConnector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(&self) -> &Event<ConnectorUpdateData> {
        &self.update
    }

    async fn connect(&mut self, mode: ConnectMode) -> Result<(), ConnectorError> {
        debug!("{}: connecting ({mode:?})", Self::NAME);
        let outcome = self.try_connect(mode).await;
        log_failure(Self::NAME, mode, outcome)
    }

    async fn deactivate(&mut self) {
        if self.provider.take().is_some() {
            info!("{}: provider released", Self::NAME);
        }
        self.provider_events = None;
    }
}
