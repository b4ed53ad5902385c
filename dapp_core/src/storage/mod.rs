//! Persistence of the "last used connector" tag that drives auto-connect.

pub mod tag_store;

use std::io;
use std::sync::{Mutex, PoisonError};

pub use tag_store::FileTagStore;

/// Key under which the tag is stored.
pub const AUTO_CONNECT_TAG_KEY: &str = "usedapp:autoConnectTag";

/// A single optional string that survives restarts.
pub trait TagStore: Send + Sync {
    fn get(&self) -> io::Result<Option<String>>;
    fn set(&self, tag: &str) -> io::Result<()>;
    /// Remove the tag. Clearing an absent tag is not an error.
    fn clear(&self) -> io::Result<()>;
}

/// Keeps the tag in memory only.
#[derive(Debug, Default)]
pub struct MemoryTagStore {
    tag: Mutex<Option<String>>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Mutex::new(Some(tag.into())),
        }
    }
}

impl TagStore for MemoryTagStore {
    fn get(&self) -> io::Result<Option<String>> {
        Ok(self.tag.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn set(&self, tag: &str) -> io::Result<()> {
        *self.tag.lock().unwrap_or_else(PoisonError::into_inner) = Some(tag.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        self.tag.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}
