use std::collections::BTreeMap;
use std::{fs, io, path::PathBuf};

use directories::ProjectDirs;
use log::debug;
use serde_json::Error as SerdeError;

use super::{TagStore, AUTO_CONNECT_TAG_KEY};

/// A tiny key/value file in the spirit of browser local storage. Other keys
/// in the same file are preserved.
#[derive(Debug, Clone)]
pub struct FileTagStore {
    path: PathBuf,
}

impl FileTagStore {
    /// `~/.config/dapp_connect/local_storage.json` on Linux,
    /// `%APPDATA%\dapp_connect\local_storage.json` on Windows, etc.
    pub fn new() -> io::Result<Self> {
        let proj = ProjectDirs::from("", "", "dapp_connect")
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))?;
        let dir = proj.config_dir();
        fs::create_dir_all(dir)?;
        Ok(Self::at(dir.join("local_storage.json")))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> io::Result<BTreeMap<String, String>> {
        match fs::File::open(&self.path) {
            Ok(file) => serde_json::from_reader(io::BufReader::new(file)).map_err(SerdeError::into),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> io::Result<()> {
        let file = fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, entries).map_err(SerdeError::into)
    }
}

impl TagStore for FileTagStore {
    fn get(&self) -> io::Result<Option<String>> {
        Ok(self.read_all()?.remove(AUTO_CONNECT_TAG_KEY))
    }

    fn set(&self, tag: &str) -> io::Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(AUTO_CONNECT_TAG_KEY.to_string(), tag.to_string());
        debug!("Persisting auto-connect tag '{tag}' to {:?}", self.path);
        self.write_all(&entries)
    }

    fn clear(&self) -> io::Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(AUTO_CONNECT_TAG_KEY).is_none() {
            return Ok(());
        }
        self.write_all(&entries)
    }
}
