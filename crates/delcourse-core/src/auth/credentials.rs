//! Persistence of the session credential across process restarts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::BearerToken;
use crate::models::User;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

const SERVICE_NAME: &str = "delcourse";

/// Keychain account the session is stored under
const KEYRING_ACCOUNT: &str = "session";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub token: BearerToken,
    #[serde(default)]
    pub user: Option<User>,
    pub saved_at: DateTime<Utc>,
}

impl StoredCredentials {
    pub fn new(token: BearerToken, user: Option<User>) -> Self {
        Self {
            token,
            user,
            saved_at: Utc::now(),
        }
    }
}

/// Where the session credential lives between runs.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredCredentials>>;
    fn save(&self, credentials: &StoredCredentials) -> Result<()>;
    /// Remove stored credentials. Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;
}

/// JSON file in the cache directory.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let credentials =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(credentials))
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(credentials)?;
        // Write then rename so a concurrent reader never sees a partial file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// OS keychain entry holding the serialized credentials.
pub struct KeyringCredentialStore {
    account: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_account(KEYRING_ACCOUNT)
    }

    pub fn with_account(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let credentials = serde_json::from_str(&secret)
                    .context("Failed to parse credentials from keychain")?;
                Ok(Some(credentials))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve credentials from keychain"),
        }
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        let secret = serde_json::to_string(credentials)?;
        self.entry()?
            .set_password(&secret)
            .context("Failed to store credentials in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credentials from keychain"),
        }
    }
}

/// In-process store for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<StoredCredentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        *self.inner.lock() = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.inner.lock() = None;
        Ok(())
    }
}
