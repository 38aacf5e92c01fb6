//! Session context shared by the API gateway and the auth store.
//!
//! Holds the bearer token and role of the logged-in user. Both are written
//! together on login and removed together on logout, and may be mirrored to
//! a durable [`SessionStorage`] backend so a restart resumes the session.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    pub token: String,
    pub role: Role,
}

pub trait SessionStorage: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<Credentials>>;
    fn save(&self, credentials: &Credentials) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<Credentials>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Option<Credentials>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, credentials: &Credentials) -> anyhow::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file holding `{token, role}`.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> anyhow::Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read session file {}", self.path.display()))?;
        match serde_json::from_str(&raw) {
            Ok(creds) => Ok(Some(creds)),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "ignoring unreadable session file");
                Ok(None)
            }
        }
    }

    fn save(&self, credentials: &Credentials) -> anyhow::Result<()> {
        let json = serde_json::to_string(credentials)?;
        // write-then-rename so token and role land together
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("failed to write session file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace session file {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to remove session file {}", self.path.display())),
        }
    }
}

pub struct Session {
    storage: Box<dyn SessionStorage>,
    current: RwLock<Option<Credentials>>,
}

impl Session {
    /// Restores whatever the backend has persisted.
    pub fn restore(storage: Box<dyn SessionStorage>) -> anyhow::Result<Self> {
        let current = storage.load()?;
        if let Some(creds) = &current {
            tracing::info!(role = %creds.role, "restored persisted session");
        }
        Ok(Self {
            storage,
            current: RwLock::new(current),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            storage: Box::new(MemoryStorage::new()),
            current: RwLock::new(None),
        }
    }

    pub fn login(&self, credentials: Credentials) -> anyhow::Result<()> {
        self.storage.save(&credentials)?;
        tracing::info!(role = %credentials.role, "session started");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        Ok(())
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.storage.clear()?;
        tracing::info!("session cleared");
        Ok(())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn token(&self) -> Option<String> {
        self.credentials().map(|c| c.token)
    }

    pub fn role(&self) -> Option<Role> {
        self.credentials().map(|c| c.role)
    }
}
