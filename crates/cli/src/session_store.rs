//! Session persistence between CLI runs.
//!
//! The signed-in credential is written as JSON to `SHOPMART_SESSION_FILE`
//! after `login` and removed on `logout`. Every other command restores it
//! into the session signal before doing any work.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopmart_storefront::Session;
use shopmart_storefront::session::SessionError;

/// Errors that can occur while reading or writing the session file.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Filesystem error.
    #[error("session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a stored session.
    #[error("session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The stored credential cannot be decoded.
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

/// JSON file holding the current credential.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Read the stored session, `None` when nobody is signed in.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or decoded.
    pub fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        let stored: StoredSession = serde_json::from_str(&text)?;
        Ok(Some(Session::from_token(stored.token, stored.email)?))
    }

    /// Write `session`, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let stored = StoredSession {
            token: session.token().expose().to_string(),
            email: session.user().email.clone(),
        };
        let text = serde_json::to_string_pretty(&stored)?;
        std::fs::write(&self.path, text).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Remove the stored session. Missing files are fine.
    ///
    /// # Errors
    ///
    /// Returns an error when an existing file cannot be removed.
    pub fn clear(&self) -> Result<(), SessionStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use base64::Engine as _;

    use super::*;

    fn token(user_id: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let claims = serde_json::json!({ "id": user_id, "name": "Mona", "role": "user" });
        format!(
            "{}.{}.sig",
            engine.encode(br#"{"alg":"HS256","typ":"JWT"}"#),
            engine.encode(claims.to_string())
        )
    }

    #[test]
    fn test_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        let session =
            Session::from_token(token("6407cf6f"), Some("mona@example.com".to_string())).unwrap();

        store.save(&session).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.user().email.as_deref(), Some("mona@example.com"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            SessionStore::new(path).load(),
            Err(SessionStoreError::Corrupt(_))
        ));
    }
}
