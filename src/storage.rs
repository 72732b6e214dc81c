// Durable credential storage: a tiny string key/value store that keeps
// the bearer token and the signed-in identity across runs.
//
// `FileStore` is what the CLI uses (a JSON object in the user's home
// directory); `MemoryStore` keeps everything in-process and is handy for
// tests or for embedding the client somewhere without a filesystem.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Storage key holding the raw bearer token.
pub const TOKEN_KEY: &str = "authToken";
/// Storage key holding the identity (email) the token belongs to.
pub const IDENTITY_KEY: &str = "authEmail";

const DEFAULT_FILE_NAME: &str = ".sota_admin_session.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Synchronous string store backing the session. Implementations must be
/// safe to share between threads; each call is a complete read or write.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Default location of the session file: `~/.sota_admin_session.json`,
/// or the current directory when no home directory can be resolved.
pub fn default_session_path() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(DEFAULT_FILE_NAME)
}

/// JSON-file backed store. The whole file is re-read on every `get` so
/// that changes made by another process are picked up.
pub struct FileStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Map<String, Value>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&data).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, entries: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let body = Value::Object(entries.clone()).to_string();
        write_private(&self.path, body.as_bytes()).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn modify(&self, f: impl FnOnce(&mut Map<String, Value>)) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        // A corrupt file is replaced rather than blocking logout forever.
        let mut entries = match self.load() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt { .. }) => Map::new(),
            Err(e) => return Err(e),
        };
        f(&mut entries);
        self.save(&entries)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.load()?;
        Ok(entries
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), Value::String(value.to_string()));
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}

/// Write `data` so that only the owner can read it (mode 0600 on unix).
/// Files left with looser permissions by older versions are tightened.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(data)
}

/// In-process store; contents vanish with the value.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_reads_as_empty() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = FileStore::new(tmp.path().join("session.json"));
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        // removing from a file that does not exist must not create it
        store.remove(TOKEN_KEY).unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_survives_reload() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("nested").join("session.json");
        {
            let store = FileStore::new(&path);
            store.set(TOKEN_KEY, "tok123").unwrap();
            store.set(IDENTITY_KEY, "a@b.com").unwrap();
        }
        let reopened = FileStore::new(&path);
        assert_eq!(reopened.get(TOKEN_KEY).unwrap().as_deref(), Some("tok123"));
        assert_eq!(reopened.get(IDENTITY_KEY).unwrap().as_deref(), Some("a@b.com"));

        reopened.remove(TOKEN_KEY).unwrap();
        assert_eq!(reopened.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(reopened.get(IDENTITY_KEY).unwrap().as_deref(), Some("a@b.com"));
    }

    #[test]
    fn corrupt_file_is_reported_then_overwritten() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileStore::new(&path);

        assert!(matches!(store.get(TOKEN_KEY), Err(StorageError::Corrupt { .. })));
        store.set(TOKEN_KEY, "fresh").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileStore::new(&path);
        store.set(TOKEN_KEY, "tok123").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let fresh = tmp.path().join("fresh.json");
        FileStore::new(&fresh).set(TOKEN_KEY, "tok123").unwrap();
        let mode = std::fs::metadata(&fresh).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "t").unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("t"));
        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }
}
