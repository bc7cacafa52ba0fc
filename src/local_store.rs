// ABOUTME: JSON file backed key/value store used as client-side session persistence
// ABOUTME: Holds cached user id, username, device token and the biometric flag across runs

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const USER_ID_KEY: &str = "user_id";
pub const USERNAME_KEY: &str = "username";
pub const DEVICE_ID_KEY: &str = "device_id";
pub const BIOMETRIC_ENABLED_KEY: &str = "biometric_enabled";

/// Synchronous key/value persistence; every write is flushed to disk.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading local store {}", path.display()))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing local store {}", path.display()))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.values.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing local store {}", self.path.display()))
    }
}

/// Identity cached by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedIdentity {
    pub user_id: String,
    pub username: String,
    pub device_id: String,
}

/// Typed view over the session keys of a [`LocalStore`].
#[derive(Debug)]
pub struct LocalSession {
    store: LocalStore,
}

impl LocalSession {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub fn identity(&self) -> Option<CachedIdentity> {
        Some(CachedIdentity {
            user_id: self.store.get(USER_ID_KEY)?.to_string(),
            username: self.store.get(USERNAME_KEY)?.to_string(),
            device_id: self.store.get(DEVICE_ID_KEY)?.to_string(),
        })
    }

    pub fn save_identity(&mut self, identity: &CachedIdentity) -> Result<()> {
        self.store.set(USER_ID_KEY, identity.user_id.as_str())?;
        self.store.set(USERNAME_KEY, identity.username.as_str())?;
        self.store.set(DEVICE_ID_KEY, identity.device_id.as_str())
    }

    /// Drops the cached identity, including the device token.
    pub fn clear_identity(&mut self) -> Result<()> {
        self.store.remove(USER_ID_KEY)?;
        self.store.remove(USERNAME_KEY)?;
        self.store.remove(DEVICE_ID_KEY)
    }

    /// Logout keeps the device token so the device stays recognized.
    pub fn clear_login(&mut self) -> Result<()> {
        self.store.remove(USER_ID_KEY)?;
        self.store.remove(USERNAME_KEY)
    }

    pub fn biometric_enabled(&self) -> bool {
        self.store.get(BIOMETRIC_ENABLED_KEY) == Some("true")
    }

    pub fn set_biometric_enabled(&mut self, enabled: bool) -> Result<()> {
        self.store
            .set(BIOMETRIC_ENABLED_KEY, if enabled { "true" } else { "false" })
    }
}
