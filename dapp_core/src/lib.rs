pub mod connectors;
pub mod core;
pub mod event;
pub mod providers;
pub mod storage;
pub mod utils;

// re‑export ergonomic entry points
pub use crate::core::config::{Config, ConnectorRegistry};
pub use crate::core::connector_manager::{ActivateOptions, ConnectorManager, ConnectorSnapshot};
pub use crate::core::controller::{
    ActivationTarget, ConnectorController, ConnectorState, Phase, ReportedError,
};
pub use connectors::{ConnectMode, Connector, ConnectorError, ConnectorUpdateData};
pub use event::{Event, Subscription};
