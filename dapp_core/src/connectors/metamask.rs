//! The injected MetaMask adapter.
//!
//! Finds MetaMask among the providers the host exposes, wraps it in a
//! [`Web3Provider`] and maps `eth_chainId` / `eth_accounts` /
//! `eth_requestAccounts` onto the [`Connector`] contract.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};

use super::{
    forward_provider_events, log_failure, request_update, ConnectMode, Connector, ConnectorError,
    ConnectorUpdateData,
};
use crate::event::{Event, Subscription};
use crate::providers::{
    detect_ethereum_provider, DetectOptions, Eip1193Provider, InjectionHost, ProviderEvent,
    Web3Provider,
};

pub const GET_METAMASK_LINK: &str = "https://metamask.io/download.html";

/// Prefer a MetaMask-flagged candidate when an aggregator exposes several
/// wallets, otherwise fall back to the generic detection probe.
pub async fn find_metamask_provider(
    host: &dyn InjectionHost,
    options: DetectOptions,
) -> Option<Arc<dyn Eip1193Provider>> {
    if let Some(provider) = host.providers().into_iter().find(|p| p.is_metamask()) {
        return Some(provider);
    }
    detect_ethereum_provider(host, options).await
}

pub struct MetamaskConnector {
    host: Arc<dyn InjectionHost>,
    detect: DetectOptions,
    provider: Option<Web3Provider>,
    update: Event<ConnectorUpdateData>,
    provider_events: Option<Subscription<ProviderEvent>>,
}

impl MetamaskConnector {
    pub const NAME: &'static str = "Metamask";

    pub fn new(host: Arc<dyn InjectionHost>) -> Self {
        Self::with_detect_options(host, DetectOptions::default())
    }

    pub fn with_detect_options(host: Arc<dyn InjectionHost>, detect: DetectOptions) -> Self {
        Self {
            host,
            detect,
            provider: None,
            update: Event::new(),
            provider_events: None,
        }
    }

    pub fn provider(&self) -> Option<&Web3Provider> {
        self.provider.as_ref()
    }

    /// Detect and wrap the wallet once. Detection failure is an expected
    /// state, reported as `NotInstalled` and only acted on interactively.
    async fn init(&mut self, mode: ConnectMode) -> Result<Web3Provider, ConnectorError> {
        if let Some(provider) = &self.provider {
            return Ok(provider.clone());
        }
        match find_metamask_provider(self.host.as_ref(), self.detect).await {
            Some(raw) => {
                let provider = Web3Provider::new(raw);
                self.provider = Some(provider.clone());
                Ok(provider)
            }
            None => {
                if mode.surfaces_errors() {
                    info!("Metamask is not installed - you can get it under {GET_METAMASK_LINK}");
                    self.host.open_url(GET_METAMASK_LINK);
                }
                Err(ConnectorError::NotInstalled {
                    connector: Self::NAME.into(),
                    install_url: Some(GET_METAMASK_LINK.into()),
                })
            }
        }
    }

    async fn try_connect(&mut self, mode: ConnectMode) -> Result<(), ConnectorError> {
        let provider = self.init(mode).await?;
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
impl Connector for MetamaskConnector {
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
        self.provider_events = None;
        if self.provider.take().is_some() {
            info!("{}: provider released", Self::NAME);
        }
    }
}
