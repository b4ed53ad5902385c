pub mod config;
pub mod connector_manager;
pub mod controller;
pub mod settings;

pub use config::{Config, ConnectorFactory, ConnectorRegistry};
pub use connector_manager::{ActivateOptions, ConnectorManager, ConnectorSnapshot};
pub use controller::{ActivationTarget, ConnectorController, ConnectorState, Phase, StateHandle};
pub use settings::{ConnectorSettings, HostSettings, Settings};
