//! Owns one connector for one activation cycle and tracks what it reports.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};

use super::config::Config;
use crate::connectors::{
    ConnectMode, Connector, ConnectorError, ConnectorUpdateData, InjectedConnector,
};
use crate::event::{Event, Subscription};
use crate::providers::{Eip1193Provider, ProviderKind, Web3Provider};

/// Errors travel as `Arc`s so one report can reach many observers.
pub type ReportedError = Arc<ConnectorError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Activating,
    Active,
}

/// The read model: last known chain and accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorState {
    pub phase: Phase,
    pub chain_id: Option<u64>,
    pub accounts: Vec<String>,
}

impl ConnectorState {
    fn is_connected(&self) -> bool {
        self.chain_id.is_some() && !self.accounts.is_empty()
    }
}

/// What to activate: a raw provider (wrapped in [`InjectedConnector`]) or a
/// ready-made connector.
pub enum ActivationTarget {
    Provider(ProviderKind),
    Connector(Box<dyn Connector>),
}

impl ActivationTarget {
    fn into_connector(self) -> Box<dyn Connector> {
        match self {
            ActivationTarget::Provider(provider) => Box::new(InjectedConnector::new(provider)),
            ActivationTarget::Connector(connector) => connector,
        }
    }
}

impl From<Box<dyn Connector>> for ActivationTarget {
    fn from(connector: Box<dyn Connector>) -> Self {
        ActivationTarget::Connector(connector)
    }
}

impl From<ProviderKind> for ActivationTarget {
    fn from(provider: ProviderKind) -> Self {
        ActivationTarget::Provider(provider)
    }
}

impl From<Web3Provider> for ActivationTarget {
    fn from(provider: Web3Provider) -> Self {
        ActivationTarget::Provider(provider.into())
    }
}

impl From<Arc<dyn Eip1193Provider>> for ActivationTarget {
    fn from(provider: Arc<dyn Eip1193Provider>) -> Self {
        ActivationTarget::Provider(provider.into())
    }
}

impl fmt::Debug for ActivationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationTarget::Provider(p) => f.debug_tuple("Provider").field(p).finish(),
            ActivationTarget::Connector(c) => f.debug_tuple("Connector").field(&c.name()).finish(),
        }
    }
}

/// State shared between the controller, its update listener and any
/// [`StateHandle`]s.
struct Shared {
    state: Mutex<ConnectorState>,
    config: RwLock<Config>,
    errors: Event<ReportedError>,
    changes: Event<ConnectorState>,
}

impl Shared {
    fn snapshot(&self) -> ConnectorState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mutate the read model, then notify observers outside the lock.
    fn modify(&self, f: impl FnOnce(&mut ConnectorState)) {
        let next = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let before = state.clone();
            f(&mut state);
            if *state == before {
                return;
            }
            state.clone()
        };
        self.changes.emit(&next);
    }

    fn replace(&self, next: ConnectorState) {
        self.modify(|state| *state = next);
    }

    fn report(&self, error: ReportedError) {
        warn!("Connector error: {error}");
        self.errors.emit(&error);
    }

    fn apply(&self, data: &ConnectorUpdateData) {
        if let Some(error) = &data.error {
            if matches!(**error, ConnectorError::Disconnected { .. }) {
                self.modify(|state| {
                    if state.phase == Phase::Active {
                        *state = ConnectorState::default();
                    }
                });
            }
            self.report(Arc::clone(error));
            return;
        }
        self.modify(|state| {
            if let Some(chain_id) = data.chain_id {
                state.chain_id = Some(chain_id);
            }
            if let Some(accounts) = &data.accounts {
                state.accounts.clone_from(accounts);
            }
            // The wallet revoked every account: nothing is connected anymore.
            if state.phase == Phase::Active && state.accounts.is_empty() {
                state.phase = Phase::Idle;
            }
        });
        if let Some(chain_id) = data.chain_id {
            let supported = self
                .config
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_supported_chain(chain_id);
            if !supported {
                self.report(Arc::new(ConnectorError::UnsupportedChain(chain_id)));
            }
        }
    }
}

/// Read-only view of a controller's state that outlives borrows of the
/// controller itself, e.g. while an activation is in flight.
#[derive(Clone)]
pub struct StateHandle {
    name: String,
    shared: Arc<Shared>,
}

impl StateHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> ConnectorState {
        self.shared.snapshot()
    }

    pub fn update_config(&self, config: Config) {
        *self
            .shared
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }
}

impl fmt::Debug for StateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("name", &self.name)
            .field("state", &self.snapshot())
            .finish()
    }
}

/// Resets an interrupted activation. Unless disarmed, dropping it restores
/// the read model from before the attempt with the phase back at `Idle`,
/// so a failed or cancelled activation leaves nothing behind.
struct ActivationGuard<'a> {
    shared: &'a Shared,
    previous: Option<ConnectorState>,
}

impl<'a> ActivationGuard<'a> {
    fn begin(shared: &'a Shared) -> Self {
        let previous = shared.snapshot();
        shared.modify(|state| state.phase = Phase::Activating);
        Self {
            shared,
            previous: Some(previous),
        }
    }

    fn disarm(mut self) {
        self.previous = None;
    }
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.shared.replace(ConnectorState {
                phase: Phase::Idle,
                ..previous
            });
        }
    }
}

/// Drives one [`Connector`]: activation, update tracking and error reporting.
///
/// A controller is built fresh for every activation attempt and discarded
/// after [`deactivate`](Self::deactivate) or when a newer one replaces it.
pub struct ConnectorController {
    connector: Option<Box<dyn Connector>>,
    name: String,
    shared: Arc<Shared>,
    updates: Option<Subscription<ConnectorUpdateData>>,
}

impl ConnectorController {
    /// Wrap `target`. Nothing is activated yet.
    pub fn new(target: impl Into<ActivationTarget>, config: Config) -> Self {
        let connector = target.into().into_connector();
        Self {
            name: connector.name().to_string(),
            connector: Some(connector),
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectorState::default()),
                config: RwLock::new(config),
                errors: Event::new(),
                changes: Event::new(),
            }),
            updates: None,
        }
    }

    /// Report errors on `errors` instead of a private channel.
    pub fn with_error_channel(self, errors: Event<ReportedError>) -> Self {
        let changes = self.shared.changes.clone();
        self.with_channels(errors, changes)
    }

    /// Publish state changes on `changes` instead of a private channel.
    pub fn with_change_channel(self, changes: Event<ConnectorState>) -> Self {
        let errors = self.shared.errors.clone();
        self.with_channels(errors, changes)
    }

    fn with_channels(
        mut self,
        errors: Event<ReportedError>,
        changes: Event<ConnectorState>,
    ) -> Self {
        let config = self
            .shared
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.shared = Arc::new(Shared {
            state: Mutex::new(self.shared.snapshot()),
            config: RwLock::new(config),
            errors,
            changes,
        });
        self
    }

    /// Connect: eagerly when `mode` is [`ConnectMode::Eager`], interactively
    /// otherwise.
    ///
    /// A failure is reported on the error channel exactly once and also
    /// returned, so callers may inspect it without reporting it again. The
    /// read model is left as it was before the attempt.
    pub async fn activate(&mut self, mode: ConnectMode) -> Result<(), ReportedError> {
        let Some(connector) = self.connector.as_mut() else {
            let error: ReportedError = Arc::new(ConnectorError::Inactive {
                connector: self.name.clone(),
            });
            self.shared.report(Arc::clone(&error));
            return Err(error);
        };

        let guard = ActivationGuard::begin(&self.shared);
        info!("Activating {} ({mode:?})", self.name);

        // Subscribe before connecting: the connector emits its first update
        // from inside `connect`.
        if self.updates.is_none() {
            let shared = Arc::clone(&self.shared);
            self.updates = Some(connector.update().subscribe(move |data| shared.apply(data)));
        }

        let outcome = match mode {
            ConnectMode::Interactive => connector.activate().await,
            ConnectMode::Eager => {
                connector.connect_eagerly().await;
                Ok(())
            }
        };

        match outcome {
            Ok(()) if mode == ConnectMode::Interactive || self.shared.snapshot().is_connected() => {
                guard.disarm();
                self.shared.modify(|state| state.phase = Phase::Active);
                info!("{} is active", self.name);
                Ok(())
            }
            Ok(()) => {
                debug!("{}: nothing to reconnect", self.name);
                self.updates = None;
                drop(guard);
                Ok(())
            }
            Err(error) => {
                self.updates = None;
                drop(guard);
                let error = Arc::new(error);
                self.shared.report(Arc::clone(&error));
                Err(error)
            }
        }
    }

    /// Deactivate the connector and release it. The read model is cleared.
    /// Calling this again, or before activation completed, is a no-op.
    pub async fn deactivate(&mut self) {
        self.updates = None;
        if let Some(mut connector) = self.connector.take() {
            connector.deactivate().await;
            info!("{} deactivated", self.name);
        }
        self.shared.replace(ConnectorState::default());
    }

    /// Swap in a newer configuration. The connection is not touched.
    pub fn update_config(&self, config: Config) {
        self.state_handle().update_config(config);
    }

    /// Notify error observers. Connection state is not touched.
    pub fn report_error(&self, error: ConnectorError) {
        self.shared.report(Arc::new(error));
    }

    pub fn subscribe_errors<F>(&self, listener: F) -> Subscription<ReportedError>
    where
        F: Fn(&ReportedError) + Send + Sync + 'static,
    {
        self.shared.errors.subscribe(listener)
    }

    pub fn subscribe_changes<F>(&self, listener: F) -> Subscription<ConnectorState>
    where
        F: Fn(&ConnectorState) + Send + Sync + 'static,
    {
        self.shared.changes.subscribe(listener)
    }

    pub fn state_handle(&self) -> StateHandle {
        StateHandle {
            name: self.name.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connector(&self) -> Option<&dyn Connector> {
        self.connector.as_deref()
    }

    pub fn config(&self) -> Config {
        self.shared
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> ConnectorState {
        self.shared.snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.state().chain_id
    }

    pub fn accounts(&self) -> Vec<String> {
        self.state().accounts
    }

    pub fn is_active(&self) -> bool {
        self.phase() == Phase::Active
    }
}

impl fmt::Debug for ConnectorController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorController")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("released", &self.connector.is_none())
            .finish()
    }
}
