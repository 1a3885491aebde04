//! Authentication context.
//!
//! Every consumer of the bearer credential goes through [`AuthContext`];
//! nothing reads the credential file directly.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::errors::{NotifyError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        [self.username.as_deref(), self.first_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|n| !n.is_empty())
            .unwrap_or("User")
    }
}

pub trait AuthContext: Send + Sync {
    fn token(&self) -> Option<String>;

    fn profile(&self) -> Option<UserProfile>;

    /// Forget every stored credential. Called when the backend rejects the token.
    fn clear(&self) -> Result<()>;
}

/// On-disk shape of the credential file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
}

/// Credentials persisted as a JSON file.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<StoredCredentials> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| NotifyError::Credentials(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredCredentials::default()),
            Err(e) => Err(NotifyError::Credentials(format!("{}: {}", self.path.display(), e))),
        }
    }

    pub fn write(&self, creds: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| NotifyError::Credentials(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(creds)
            .map_err(|e| NotifyError::Credentials(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| NotifyError::Credentials(format!("{}: {}", self.path.display(), e)))
    }

    fn load_or_warn(&self) -> StoredCredentials {
        self.read().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable credential file");
            StoredCredentials::default()
        })
    }
}

impl AuthContext for FileCredentials {
    fn token(&self) -> Option<String> {
        self.load_or_warn().access_token.filter(|t| !t.is_empty())
    }

    fn profile(&self) -> Option<UserProfile> {
        self.load_or_warn().user_profile
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "cleared stored credentials");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NotifyError::Credentials(format!("{}: {}", self.path.display(), e))),
        }
    }
}

/// In-memory credentials (`--token` on the command line, tests).
#[derive(Default)]
pub struct StaticCredentials {
    inner: Mutex<StoredCredentials>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>, profile: Option<UserProfile>) -> Self {
        Self {
            inner: Mutex::new(StoredCredentials {
                access_token: Some(token.into()),
                refresh_token: None,
                user_profile: profile,
            }),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl AuthContext for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.inner.lock().ok()?.access_token.clone()
    }

    fn profile(&self) -> Option<UserProfile> {
        self.inner.lock().ok()?.user_profile.clone()
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| NotifyError::Credentials("credential lock poisoned".into()))?;
        *guard = StoredCredentials::default();
        Ok(())
    }
}
