#![allow(dead_code)]

pub mod fake_connector;
pub mod mock_wallet;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dapp_core::providers::DetectOptions;

/// Logs appear only with `-- --nocapture` or when a test fails.
pub fn init_test_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Detection that gives up quickly, so "no wallet" tests stay fast.
pub fn quick_detect() -> DetectOptions {
    DetectOptions {
        timeout: Duration::from_millis(30),
        poll_interval: Duration::from_millis(5),
        must_be_metamask: false,
    }
}

/// Collects everything a listener sees.
#[derive(Clone, Default)]
pub struct Recorder<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn listener(&self) -> impl Fn(&T) + Send + Sync + 'static {
        let items = Arc::clone(&self.items);
        move |item: &T| items.lock().unwrap().push(item.clone())
    }

    pub fn items(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}
