//! On-disk session and secret storage.
//!
//! Two file formats live here:
//! - The session file: a JSON mapping of server URL to a list of
//!   `{username, session_id}` entries.
//! - Legacy secret files: a single line of `username::secret`, used both for
//!   the auth file (password) and the auth-token file (session token).
//!
//! Both are required to have mode `0600` on POSIX systems. Loading an
//! insecure file fails unless explicitly allowed; saving repairs permissions
//! instead of failing.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Required file mode for session and secret files.
pub const SECURE_MODE: u32 = 0o600;

const SEPARATOR: &str = "::";

#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("session file {} not found", path.display())]
    NotFound { path: PathBuf },
    #[error(
        "session file {} must have {SECURE_MODE:o} permissions, has {mode:o}; refusing to load",
        path.display()
    )]
    Permissions { path: PathBuf, mode: u32 },
    #[error("no session file path configured")]
    PathUnset,
    #[error("failed to access session file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse session file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SessionEntry {
    username: String,
    session_id: String,
}

/// The session file: per-(URL, username) session IDs.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    sessions: BTreeMap<String, Vec<SessionEntry>>,
}

impl SessionStore {
    /// An empty store that will save to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            sessions: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Load the store from disk, enforcing secure permissions.
    pub fn load(path: impl Into<PathBuf>, allow_insecure: bool) -> Result<Self, SessionFileError> {
        let path = path.into();
        if !path.exists() {
            return Err(SessionFileError::NotFound { path });
        }
        check_secure_permissions(&path, allow_insecure)?;
        let content = fs::read_to_string(&path).map_err(|source| SessionFileError::Io {
            path: path.clone(),
            source,
        })?;
        let sessions = serde_json::from_str(&content).map_err(|source| SessionFileError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path: Some(path),
            sessions,
        })
    }

    /// Like [`SessionStore::load`], but a missing file yields an empty store.
    pub fn load_or_empty(
        path: impl Into<PathBuf>,
        allow_insecure: bool,
    ) -> Result<Self, SessionFileError> {
        let path = path.into();
        match Self::load(&path, allow_insecure) {
            Ok(store) => Ok(store),
            Err(SessionFileError::NotFound { .. }) => Ok(Self::new(path)),
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, url: &str, username: &str) -> Option<&str> {
        self.sessions.get(url).and_then(|entries| {
            entries
                .iter()
                .find(|e| e.username == username)
                .map(|e| e.session_id.as_str())
        })
    }

    pub fn set(&mut self, url: &str, username: &str, session_id: &str) {
        let entries = self.sessions.entry(url.to_string()).or_default();
        match entries.iter_mut().find(|e| e.username == username) {
            Some(entry) => entry.session_id = session_id.to_string(),
            None => entries.push(SessionEntry {
                username: username.to_string(),
                session_id: session_id.to_string(),
            }),
        }
    }

    /// Write the store to its configured path.
    ///
    /// The write is atomic from the perspective of readers: the contents go
    /// to a sibling temp file (created with mode `0600` before any secret is
    /// written) which is then renamed over the target. An existing target
    /// with insecure permissions is repaired first unless `allow_insecure`.
    pub fn save(&self, allow_insecure: bool) -> Result<(), SessionFileError> {
        let path = self.path.as_ref().ok_or(SessionFileError::PathUnset)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| SessionFileError::Io {
                path: path.clone(),
                source,
            })?;
        }
        if path.exists() && !allow_insecure {
            repair_permissions(path)?;
        }
        let data =
            serde_json::to_vec_pretty(&self.sessions).map_err(|source| SessionFileError::Parse {
                path: path.clone(),
                source,
            })?;
        atomic_write_secret(path, &data).map_err(|source| SessionFileError::Io {
            path: path.clone(),
            source,
        })
    }
}

/// A username paired with a secret, as stored in legacy auth files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSecret {
    pub username: String,
    pub secret: String,
}

/// Read a legacy `username::secret` file.
///
/// The first non-blank line is parsed; everything after the first `::` is
/// the secret. Permission policy is the same as for the session file.
pub fn read_secret_file(path: &Path, allow_insecure: bool) -> Result<UserSecret, SessionFileError> {
    if !path.exists() {
        return Err(SessionFileError::NotFound {
            path: path.to_path_buf(),
        });
    }
    check_secure_permissions(path, allow_insecure)?;
    let content = fs::read_to_string(path).map_err(|source| SessionFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let (username, secret) = line.split_once(SEPARATOR).unwrap_or(("", line));
    Ok(UserSecret {
        username: username.to_string(),
        secret: secret.to_string(),
    })
}

/// Write a legacy `username::secret` file with secure permissions.
pub fn write_secret_file(
    path: &Path,
    username: &str,
    secret: &str,
) -> Result<(), SessionFileError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SessionFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    if path.exists() {
        repair_permissions(path)?;
    }
    let contents = format!("{username}{SEPARATOR}{secret}");
    atomic_write_secret(path, contents.as_bytes()).map_err(|source| SessionFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Default location of the session file.
pub fn default_session_file() -> PathBuf {
    data_dir().join(".zbx_session.json")
}

/// Default location of the legacy auth file (`username::password`).
pub fn default_auth_file() -> PathBuf {
    data_dir().join(".zbx_auth")
}

/// Default location of the legacy auth-token file (`username::token`).
pub fn default_auth_token_file() -> PathBuf {
    data_dir().join(".zbx_auth_token")
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("zbx"))
        .unwrap_or_else(|| PathBuf::from(".zbx"))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::MetadataExt;
    Ok(fs::metadata(path)?.mode() & 0o777)
}

#[cfg(unix)]
fn check_secure_permissions(path: &Path, allow_insecure: bool) -> Result<(), SessionFileError> {
    let mode = file_mode(path).map_err(|source| SessionFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if mode != SECURE_MODE && !allow_insecure {
        return Err(SessionFileError::Permissions {
            path: path.to_path_buf(),
            mode,
        });
    }
    Ok(())
}

#[cfg(unix)]
fn repair_permissions(path: &Path) -> Result<(), SessionFileError> {
    use std::os::unix::fs::PermissionsExt;
    let mode = file_mode(path).map_err(|source| SessionFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if mode != SECURE_MODE {
        tracing::debug!(path = %path.display(), "repairing permissions to {SECURE_MODE:o}");
        fs::set_permissions(path, fs::Permissions::from_mode(SECURE_MODE)).map_err(|source| {
            SessionFileError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_secure_permissions(_path: &Path, _allow_insecure: bool) -> Result<(), SessionFileError> {
    Ok(())
}

#[cfg(not(unix))]
fn repair_permissions(_path: &Path) -> Result<(), SessionFileError> {
    Ok(())
}

/// Write to a sibling temp file, then rename over the target.
///
/// Mode is set to `0600` after creation, before the first byte of secret
/// contents is written.
fn atomic_write_secret(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = create_secure(&tmp)?;
        f.write_all(data)?;
        f.sync_all().ok();
    }
    fs::rename(&tmp, path)?;
    fsync_parent_dir(path);
    Ok(())
}

#[cfg(unix)]
fn create_secure(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(SECURE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn create_secure(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

/// Best-effort fsync of the parent directory after a rename. Failure is
/// ignored because not all platforms support opening a directory for sync.
fn fsync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent()
        && let Ok(dir) = fs::File::open(parent)
    {
        let _ = dir.sync_all();
    }
}
