//! A deterministic connector that needs no wallet at all.
//!
//! Tests script the outcome of `connect` and, optionally, hold it open on a
//! [`Notify`] gate to observe the in-flight state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dapp_core::connectors::{ConnectMode, Connector, ConnectorError, ConnectorUpdateData};
use dapp_core::event::Event;
use tokio::sync::Notify;

pub struct FakeConnector {
    update: Event<ConnectorUpdateData>,
    chain_id: u64,
    accounts: Vec<String>,
    fail_with: Option<String>,
    gate: Option<Arc<Notify>>,
    pub deactivations: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(chain_id: u64, accounts: &[&str]) -> Self {
        Self {
            update: Event::new(),
            chain_id,
            accounts: accounts.iter().map(|a| a.to_string()).collect(),
            fail_with: None,
            gate: None,
            deactivations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    /// `connect` waits until the returned handle is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Emit on this connector's update stream from outside.
    pub fn update_handle(&self) -> Event<ConnectorUpdateData> {
        self.update.clone()
    }

    pub fn deactivation_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.deactivations)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    fn name(&self) -> &str {
        "Fake"
    }

    fn update(&self) -> &Event<ConnectorUpdateData> {
        &self.update
    }

    async fn connect(&mut self, mode: ConnectMode) -> Result<(), ConnectorError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.fail_with {
            Some(message) => Err(ConnectorError::Other(format!("{message} ({mode:?})"))),
            None => {
                self.update.emit(&ConnectorUpdateData::connected(
                    self.chain_id,
                    self.accounts.clone(),
                ));
                Ok(())
            }
        }
    }

    async fn deactivate(&mut self) {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
    }
}
