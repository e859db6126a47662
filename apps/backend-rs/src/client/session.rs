use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::error::{ClientError, ClientResult};

/// Signed-in user as persisted between CLI invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub is_authenticated: bool,
    pub id: String,
    pub email: String,
    pub token: String,
}

impl Session {
    /// Builds a session from the `/sign-in` response user object. The store
    /// hands out numeric ids; they are kept as strings.
    pub fn signed_in(user: &Value, token: &str) -> Self {
        let id = match user.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => String::new(),
        };
        let email = user
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            is_authenticated: true,
            id,
            email,
            token: token.to_string(),
        }
    }
}

/// Where the auth state lives between runs.
pub trait SessionRepository {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> ClientResult<Option<Session>>;
    fn save(&self, session: &Session) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// JSON file on disk, typically `~/.staydesk/session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionRepository {
    path: PathBuf,
}

impl FileSessionRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionRepository for FileSessionRepository {
    fn load(&self) -> ClientResult<Option<Session>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };

        // A damaged file behaves like a signed-out session.
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %error,
                    "Could not load session, starting signed out"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, serialized)?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(ClientError::Io(error)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    session: Mutex<Option<Session>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemorySessionRepository {
    fn load(&self) -> ClientResult<Option<Session>> {
        Ok(self
            .session
            .lock()
            .map_err(|_| ClientError::Invalid("session lock poisoned".to_string()))?
            .clone())
    }

    fn save(&self, session: &Session) -> ClientResult<()> {
        *self
            .session
            .lock()
            .map_err(|_| ClientError::Invalid("session lock poisoned".to_string()))? =
            Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self
            .session
            .lock()
            .map_err(|_| ClientError::Invalid("session lock poisoned".to_string()))? = None;
        Ok(())
    }
}
