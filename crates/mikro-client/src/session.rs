//! Session credentials.
//!
//! A [`Session`] is issued by a successful login or registration and cleared
//! by logout. The [`ApiClient`](crate::ApiClient) holds a [`SharedSession`]
//! handed to it at construction and attaches the session token to every
//! request. Persistence is opt-in through a [`SessionStore`].

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::auth::User;
use crate::error::{ClientError, Result};

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token issued by the API.
    pub token: String,
    /// The user the token belongs to, when known.
    #[serde(default)]
    pub user: Option<User>,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Session for `token` issued now, with no user attached.
    #[must_use]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
            issued_at: Utc::now(),
        }
    }

    /// Attach the user profile.
    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// JSON file holding at most one session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the file at `path`. Nothing is touched until used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session. A missing file is not an error.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no session file");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        let session = serde_json::from_str(&content).map_err(|e| {
            ClientError::Session(format!(
                "failed to parse session file '{}': {e}",
                self.path.display()
            ))
        })?;
        Ok(Some(session))
    }

    /// Write the session, readable by the owner only on Unix.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(session)?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;

        // `mode` only applies on creation; tighten a file left by an older write.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(json.as_bytes())?;

        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the stored session, if any.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session slot shared between a client and its owner.
///
/// Cloning shares the slot. When built with [`SharedSession::persistent`]
/// every issue and clear is mirrored to the backing [`SessionStore`].
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    current: Arc<RwLock<Option<Session>>>,
    store: Option<SessionStore>,
}

impl SharedSession {
    /// Empty in-memory session slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory slot already holding `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            current: Arc::new(RwLock::new(Some(session))),
            store: None,
        }
    }

    /// Slot backed by `store`, preloaded with whatever it holds.
    ///
    /// An unreadable session file is logged and treated as no session.
    #[must_use]
    pub fn persistent(store: SessionStore) -> Self {
        let loaded = match store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session file");
                None
            }
        };
        Self {
            current: Arc::new(RwLock::new(loaded)),
            store: Some(store),
        }
    }

    /// Replace the current session.
    pub fn issue(&self, session: Session) -> Result<()> {
        if let Some(store) = &self.store {
            store.save(&session)?;
        }
        *self.current.write() = Some(session);
        Ok(())
    }

    /// Drop the current session.
    pub fn clear(&self) -> Result<()> {
        *self.current.write() = None;
        if let Some(store) = &self.store {
            store.clear()?;
        }
        Ok(())
    }

    /// Copy of the current session.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.current.read().as_ref().map(|s| s.token.clone())
    }

    /// Current `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.current.read().as_ref().map(Session::bearer)
    }

    /// Whether a session has been issued and not cleared.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.read().is_some()
    }
}
