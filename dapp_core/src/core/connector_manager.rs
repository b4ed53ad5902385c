use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use log::{debug, info, warn};
use tokio::sync::watch;

use super::config::Config;
use super::controller::{
    ActivationTarget, ConnectorController, ConnectorState, Phase, ReportedError, StateHandle,
};
use crate::connectors::{ConnectMode, ConnectorError};
use crate::event::{Event, Subscription};
use crate::storage::TagStore;

/// Options for [`ConnectorManager::activate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivateOptions {
    pub mode: ConnectMode,
}

impl ActivateOptions {
    pub fn interactive() -> Self {
        Self {
            mode: ConnectMode::Interactive,
        }
    }

    /// Reconnect without prompting and without surfacing failures.
    pub fn silent() -> Self {
        Self {
            mode: ConnectMode::Eager,
        }
    }
}

/// Everything a UI needs to render the connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorSnapshot {
    /// Name of the current connector, if any.
    pub connector: Option<String>,
    pub is_loading: bool,
    pub phase: Phase,
    pub chain_id: Option<u64>,
    pub accounts: Vec<String>,
}

/// Counts one in-flight operation until dropped, on every exit path.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn raise(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self(in_flight)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A settled controller and the subscription forwarding its changes.
struct Installed {
    controller: ConnectorController,
    _changes: Subscription<ConnectorState>,
}

struct ManagerInner {
    /// The controller whose activation settled last. Never locked across an
    /// await.
    installed: Mutex<Option<Installed>>,
    /// View of the newest controller, settled or not, for readers.
    current: Mutex<Option<StateHandle>>,
    /// Bumped by every activation and deactivation. An activation whose
    /// generation is no longer the latest has been superseded.
    generation: watch::Sender<u64>,
    in_flight: AtomicUsize,
    config: RwLock<Config>,
    store: Arc<dyn TagStore>,
    errors: Event<ReportedError>,
    changes: Event<ConnectorState>,
}

/// Application-wide entry point to the connection lifecycle.
///
/// Owns at most one [`ConnectorController`] at a time, persists the tag of
/// the last interactively activated connector and funnels every error to a
/// single channel. Cloning is cheap; clones share the same state.
///
/// Operations never wait for each other. A newer activation or a
/// [`deactivate`](Self::deactivate) cancels an activation still in flight.
#[derive(Clone)]
pub struct ConnectorManager {
    inner: Arc<ManagerInner>,
}

impl ConnectorManager {
    pub fn new(config: Config, store: Arc<dyn TagStore>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                installed: Mutex::new(None),
                current: Mutex::new(None),
                generation: watch::Sender::new(0),
                in_flight: AtomicUsize::new(0),
                config: RwLock::new(config),
                store,
                errors: Event::new(),
                changes: Event::new(),
            }),
        }
    }

    /// Build a controller for `target`, make it current and activate it.
    ///
    /// Errors do not escape: they go to the error channel (see
    /// [`subscribe_errors`](Self::subscribe_errors)). The returned phase says
    /// whether a connection came up; a superseded activation yields `Idle`.
    pub async fn activate(
        &self,
        target: impl Into<ActivationTarget>,
        options: ActivateOptions,
    ) -> Phase {
        let _loading = LoadingGuard::raise(&self.inner.in_flight);
        let generation = self.supersede();

        let mut controller = ConnectorController::new(target, self.config())
            .with_error_channel(self.inner.errors.clone());
        let forward = self.forward_changes(&controller, generation);
        {
            let _installed = self.installed();
            if *self.inner.generation.borrow() == generation {
                *self.current() = Some(controller.state_handle());
            }
        }

        let mut superseded = self.inner.generation.subscribe();
        tokio::select! {
            // Already reported on the error channel.
            _ = controller.activate(options.mode) => {}
            _ = superseded.wait_for(|latest| *latest != generation) => {
                info!("Activation of {} cancelled", controller.name());
            }
        }

        let phase = controller.phase();
        let stale = {
            let mut installed = self.installed();
            if *self.inner.generation.borrow() == generation {
                // The previous controller is dropped without deactivation.
                *installed = Some(Installed {
                    controller,
                    _changes: forward,
                });
                None
            } else {
                Some(controller)
            }
        };
        match stale {
            None => phase,
            Some(mut controller) => {
                debug!("{} was superseded, releasing it", controller.name());
                controller.deactivate().await;
                Phase::Idle
            }
        }
    }

    /// Activate the connector configured under `tag` and remember the tag
    /// for auto-connect once it is active.
    ///
    /// An unknown tag fails right away, before any wallet is contacted.
    pub async fn activate_named(&self, tag: &str) -> Result<Phase, ConnectorError> {
        let connector = self.config().connectors.create(tag)?;
        let phase = self.activate(connector, ActivateOptions::interactive()).await;
        if phase == Phase::Active {
            if let Err(e) = self.inner.store.set(tag) {
                warn!("Could not persist auto-connect tag '{tag}': {e}");
            }
        }
        Ok(phase)
    }

    /// Silently reconnect the connector used last time, if auto-connect is
    /// enabled and that tag is still configured. Returns `None` when nothing
    /// was attempted.
    pub async fn connect_on_startup(&self) -> Option<Phase> {
        let config = self.config();
        if !config.auto_connect {
            return None;
        }
        let tag = match self.inner.store.get() {
            Ok(Some(tag)) => tag,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not read auto-connect tag: {e}");
                return None;
            }
        };
        let connector = match config.connectors.create(&tag) {
            Ok(connector) => connector,
            Err(e) => {
                debug!("Skipping auto-connect: {e}");
                return None;
            }
        };
        info!("Auto-connecting '{tag}'");
        Some(self.activate(connector, ActivateOptions::silent()).await)
    }

    /// Forget the auto-connect tag, cancel any activation in flight and
    /// deactivate the current controller. Returns without waiting for a
    /// pending activation; calling it with nothing active is fine.
    pub async fn deactivate(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!("Could not clear auto-connect tag: {e}");
        }
        let _loading = LoadingGuard::raise(&self.inner.in_flight);
        let (installed, previous) = {
            let mut installed = self.installed();
            self.supersede();
            (installed.take(), self.current().take())
        };
        let was_idle =
            previous.map_or(true, |handle| handle.snapshot() == ConnectorState::default());

        if let Some(mut installed) = installed {
            installed.controller.deactivate().await;
        }
        // The superseded controller no longer publishes, so announce the reset.
        if !was_idle {
            self.inner.changes.emit(&ConnectorState::default());
        }
    }

    /// Replace the configuration and push it to the current controller.
    pub fn update_config(&self, config: Config) {
        if let Some(handle) = self.current().as_ref() {
            handle.update_config(config.clone());
        }
        *self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Send `error` to the error channel.
    pub fn report_error(&self, error: ConnectorError) {
        warn!("Reported error: {error}");
        self.inner.errors.emit(&Arc::new(error));
    }

    pub fn subscribe_errors<F>(&self, listener: F) -> Subscription<ReportedError>
    where
        F: Fn(&ReportedError) + Send + Sync + 'static,
    {
        self.inner.errors.subscribe(listener)
    }

    /// Observe read-model changes of whichever controller is current.
    pub fn subscribe_changes<F>(&self, listener: F) -> Subscription<ConnectorState>
    where
        F: Fn(&ConnectorState) + Send + Sync + 'static,
    {
        self.inner.changes.subscribe(listener)
    }

    pub fn snapshot(&self) -> ConnectorSnapshot {
        let is_loading = self.is_loading();
        match self.current().as_ref() {
            Some(handle) => {
                let state = handle.snapshot();
                ConnectorSnapshot {
                    connector: Some(handle.name().to_string()),
                    is_loading,
                    phase: state.phase,
                    chain_id: state.chain_id,
                    accounts: state.accounts,
                }
            }
            None => ConnectorSnapshot {
                is_loading,
                ..ConnectorSnapshot::default()
            },
        }
    }

    /// True while any activation or deactivation is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn config(&self) -> Config {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The persisted auto-connect tag, if readable.
    pub fn auto_connect_tag(&self) -> Option<String> {
        self.inner.store.get().ok().flatten()
    }

    /// Start a new generation, superseding whatever is in flight.
    fn supersede(&self) -> u64 {
        let mut next = 0;
        self.inner.generation.send_modify(|generation| {
            *generation += 1;
            next = *generation;
        });
        next
    }

    /// Relay `controller`'s changes for as long as `generation` is the
    /// latest, so a superseded controller stays silent.
    fn forward_changes(
        &self,
        controller: &ConnectorController,
        generation: u64,
    ) -> Subscription<ConnectorState> {
        let latest = self.inner.generation.subscribe();
        let changes = self.inner.changes.clone();
        controller.subscribe_changes(move |state| {
            if *latest.borrow() == generation {
                changes.emit(state);
            }
        })
    }

    fn installed(&self) -> MutexGuard<'_, Option<Installed>> {
        self.inner
            .installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> MutexGuard<'_, Option<StateHandle>> {
        self.inner
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ConnectorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorManager")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
