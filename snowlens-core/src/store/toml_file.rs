//! TOML-file backend for the profile store.
//!
//! Connections live in a single human-editable TOML file, one table per
//! saved bundle, created lazily on first save. Every operation reads or
//! rewrites the file wholesale; concurrent writers from two processes
//! can race, which is acceptable for a single-user local tool.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::models::ConnectionProfile;

use super::backend::ProfileStore;

/// File name of the secrets file inside the config directory
const SECRETS_FILE: &str = "connections.toml";

/// TOML-file profile store
///
/// The default location is `~/.config/snowlens/connections.toml`.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    /// Path to the secrets file
    path: PathBuf,
}

impl TomlFileStore {
    /// Creates a store at the default secrets file location
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoConfigDir` if the platform config
    /// directory cannot be determined.
    pub fn new() -> StoreResult<Self> {
        let path = dirs::config_dir()
            .ok_or(StoreError::NoConfigDir)?
            .join("snowlens")
            .join(SECRETS_FILE);
        Ok(Self { path })
    }

    /// Creates a store over a custom secrets file path
    ///
    /// This is useful for testing or non-standard configurations.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the secrets file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole secrets file into a key-to-profile map
    ///
    /// A missing file is an empty store, not an error.
    fn load_all(&self) -> StoreResult<BTreeMap<String, ConnectionProfile>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Rewrites the whole secrets file from the map
    fn save_all(&self, entries: &BTreeMap<String, ConnectionProfile>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Write {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        }
        let text =
            toml::to_string_pretty(entries).map_err(|e| StoreError::Serialize(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| StoreError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %self.path.display(), entries = entries.len(), "saved secrets file");
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for TomlFileStore {
    async fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.load_all()?.into_keys().collect())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<ConnectionProfile>> {
        Ok(self.load_all()?.remove(key))
    }

    async fn put(&self, key: &str, profile: &ConnectionProfile) -> StoreResult<()> {
        let mut entries = self.load_all()?;
        if entries.insert(key.to_string(), profile.clone()).is_some() {
            debug!(key, "replacing existing saved connection");
        }
        self.save_all(&entries)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.load_all()?;
        if entries.remove(key).is_none() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        self.save_all(&entries)
    }
}
