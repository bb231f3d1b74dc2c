//! Session token storage.
//!
//! Stores the auth session in `<base>/session.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::AuthSession;
use crate::config::paths;
use crate::model::UserProfile;

pub(crate) fn now_millis_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// Persisted session: tokens plus the user projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// The access token (short-lived)
    pub access_token: String,
    /// The refresh token (long-lived)
    pub refresh_token: String,
    /// Expiry timestamp in milliseconds since epoch
    pub expires_at: u64,
    pub user: UserProfile,
}

impl StoredSession {
    /// Builds a stored session from a token grant received now.
    pub fn from_grant(grant: AuthSession) -> Self {
        let expires_at = match grant.expires_at.and_then(|s| u64::try_from(s).ok()) {
            Some(secs) => secs.saturating_mul(1000),
            None => now_millis_u64().saturating_add(grant.expires_in.saturating_mul(1000)),
        };
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            expires_at,
            user: grant.user.into(),
        }
    }

    /// Returns true if the access token is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// Returns true if the access token expires within `margin`.
    pub fn expires_within(&self, margin: Duration) -> bool {
        let margin_ms = u64::try_from(margin.as_millis()).unwrap_or(u64::MAX);
        now_millis_u64().saturating_add(margin_ms) >= self.expires_at
    }
}

/// File-backed session storage.
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::at(paths::session_path())
    }
}

impl SessionStorage {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored session.
    /// Returns `None` if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        serde_json::from_str(&contents)
            .map(Some)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))
    }

    /// Saves the session with restricted permissions (0600).
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save(&self, session: &StoredSession) -> Result<()> {
        let path = &self.path;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(session).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }

    /// Removes the stored session. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(true)
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(12) {
        Some((idx, _)) if token.len() > 16 => format!("{}...", &token[..idx]),
        _ => "***".to_string(),
    }
}
