//! Durable session storage.
//!
//! Persists the authenticated session in `${VEGAS_HOME}/session.json` with
//! restricted permissions (0600). Tokens are never logged or displayed in
//! full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::identity::UserIdentity;

/// An authenticated session: the access/refresh token pair plus the display
/// identity captured at sign-in.
///
/// A persisted session always carries both tokens; anything else on disk is
/// treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Short-lived bearer credential attached to authorized requests.
    pub access_token: String,
    /// Longer-lived credential used solely to obtain a new access token.
    pub refresh_token: String,
    /// Display identity decoded from the sign-in credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,
}

/// File-backed store for the current session.
///
/// The store is the single owner of the persisted session; callers only ever
/// hold the snapshots returned by [`SessionStore::load`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Opens the store at the default `${VEGAS_HOME}/session.json` location.
    pub fn open_default() -> Self {
        Self::new(crate::config::paths::session_path())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Loads the persisted session, if any.
    ///
    /// Returns `None` for a missing, unreadable, or unparseable file, and for
    /// a stored object missing either token. Corrupt state is indistinguishable
    /// from being signed out; it is never an error.
    pub fn load(&self) -> Option<Session> {
        let contents = fs::read_to_string(&self.path).ok()?;
        let session: Session = serde_json::from_str(&contents).ok()?;
        if session.access_token.is_empty() || session.refresh_token.is_empty() {
            return None;
        }
        Some(session)
    }

    /// Persists the session, fully overwriting any prior value.
    ///
    /// Writes to a temp file and renames it into place so a concurrent reader
    /// never observes a half-written session. Restricted permissions (0600) on
    /// unix.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        let tmp_path = self.path.with_extension("json.tmp");

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&tmp_path, &contents)
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Removes any persisted session. Calling it when nothing is stored is
    /// not an error.
    ///
    /// # Errors
    /// Returns an error if the operation fails.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove session at {}", self.path.display())),
        }
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
