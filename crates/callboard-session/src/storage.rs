//! Durable client state.
//!
//! Each namespace is one JSON file `<data_dir>/<namespace>.json`:
//!
//! ```json
//! { "version": 1, "lastUpdated": "2025-01-01T00:00:00Z", "state": { ... } }
//! ```
//!
//! Files are replaced atomically and written with mode 0600. A missing, unreadable, corrupt or
//! wrong-version file reads as absent.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use callboard_core::types::{AuthTokens, UiPreferences, User};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

/// Namespace holding the signed-in user and tokens.
pub const AUTH_NAMESPACE: &str = "auth-storage";
/// Namespace holding UI preferences.
pub const UI_NAMESPACE: &str = "ui-storage";
/// Current on-disk schema version.
pub const STORAGE_VERSION: u32 = 1;

/// The persisted part of a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    /// Signed-in user.
    pub user: User,
    /// Current credentials.
    pub tokens: AuthTokens,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document<T> {
    version: u32,
    #[serde(default)]
    last_updated: String,
    state: T,
}

/// Path of a namespace file under `data_dir`.
pub fn namespace_path(data_dir: &Path, namespace: &str) -> PathBuf {
    data_dir.join(format!("{namespace}.json"))
}

/// Read a namespace, or `None` if absent or unusable.
pub fn load_namespace<T: DeserializeOwned>(data_dir: &Path, namespace: &str) -> Option<T> {
    let path = namespace_path(data_dir, namespace);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(namespace, "failed to read storage file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<Document<T>>(&data) {
        Ok(doc) if doc.version == STORAGE_VERSION => Some(doc.state),
        Ok(doc) => {
            tracing::warn!(namespace, version = doc.version, "unsupported storage version");
            None
        }
        Err(e) => {
            tracing::warn!(namespace, "failed to parse storage file: {e}");
            None
        }
    }
}

/// Write a namespace, creating `data_dir` if needed.
pub fn save_namespace<T: Serialize>(
    data_dir: &Path,
    namespace: &str,
    state: &T,
) -> Result<(), StorageError> {
    std::fs::create_dir_all(data_dir)?;
    let path = namespace_path(data_dir, namespace);

    let doc = Document {
        version: STORAGE_VERSION,
        last_updated: chrono::Utc::now().to_rfc3339(),
        state,
    };
    let json = serde_json::to_string_pretty(&doc)?;

    // Sibling temp file (created 0600 on unix), renamed over the target so a
    // reader sees either the old document or the new one.
    let mut tmp = tempfile::NamedTempFile::new_in(data_dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    let _ = tmp.persist(&path).map_err(|e| e.error)?;

    Ok(())
}

/// Delete a namespace file. Missing is not an error.
pub fn clear_namespace(data_dir: &Path, namespace: &str) -> Result<(), StorageError> {
    match std::fs::remove_file(namespace_path(data_dir, namespace)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StorageError::Io(e)),
    }
}

/// Stored UI preferences, or defaults.
pub fn load_preferences(data_dir: &Path) -> UiPreferences {
    load_namespace(data_dir, UI_NAMESPACE).unwrap_or_default()
}

/// Persist UI preferences.
pub fn save_preferences(data_dir: &Path, prefs: &UiPreferences) -> Result<(), StorageError> {
    save_namespace(data_dir, UI_NAMESPACE, prefs)
}

/// Where the session manager keeps its session.
pub trait SessionStore: Send + Sync {
    /// The stored session, if any.
    fn load(&self) -> Option<PersistedSession>;
    /// Replace the stored session.
    fn save(&self, session: &PersistedSession) -> Result<(), StorageError>;
    /// Remove the stored session.
    fn clear(&self) -> Result<(), StorageError>;
}

/// [`SessionStore`] backed by the `auth-storage` namespace file.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
    data_dir: PathBuf,
}

impl FileSessionStore {
    /// Store under `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of the session file.
    pub fn path(&self) -> PathBuf {
        namespace_path(&self.data_dir, AUTH_NAMESPACE)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<PersistedSession> {
        load_namespace(&self.data_dir, AUTH_NAMESPACE)
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        save_namespace(&self.data_dir, AUTH_NAMESPACE, session)
    }

    fn clear(&self) -> Result<(), StorageError> {
        clear_namespace(&self.data_dir, AUTH_NAMESPACE)
    }
}

/// In-process [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    /// Store pre-seeded with `session`.
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<PersistedSession> {
        self.slot.lock().clone()
    }

    fn save(&self, session: &PersistedSession) -> Result<(), StorageError> {
        *self.slot.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slot.lock() = None;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use callboard_core::types::Theme;
    use tempfile::TempDir;

    fn session() -> PersistedSession {
        serde_json::from_value(serde_json::json!({
            "user": {"id": "u1", "tenantId": "t1", "email": "ops@example.com"},
            "tokens": {
                "accessToken": "at",
                "refreshToken": "rt",
                "expiresAt": "2030-01-01T00:00:00Z"
            }
        }))
        .unwrap()
    }

    #[test]
    fn file_store_roundtrip_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.load().is_none());

        store.save(&session()).unwrap();
        assert_eq!(store.load(), Some(session()));
        assert!(store.path().ends_with("auth-storage.json"));

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.save(&session()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn overwrite_tightens_loose_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = namespace_path(dir.path(), AUTH_NAMESPACE);
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileSessionStore::new(dir.path()).save(&session()).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.save(&session()).unwrap();
        store.save(&session()).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("auth-storage.json")]);
        assert_eq!(store.load(), Some(session()));
    }

    #[test]
    fn save_failure_is_returned() {
        let dir = TempDir::new().unwrap();
        let not_a_dir = dir.path().join("file");
        std::fs::write(&not_a_dir, "x").unwrap();
        assert!(FileSessionStore::new(&not_a_dir).save(&session()).is_err());
    }

    #[test]
    fn corrupt_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(namespace_path(dir.path(), AUTH_NAMESPACE), "{not json").unwrap();
        assert!(FileSessionStore::new(dir.path()).load().is_none());
    }

    #[test]
    fn wrong_version_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let doc = serde_json::json!({"version": 2, "state": session()});
        std::fs::write(
            namespace_path(dir.path(), AUTH_NAMESPACE),
            doc.to_string(),
        )
        .unwrap();
        assert!(FileSessionStore::new(dir.path()).load().is_none());
    }

    #[test]
    fn save_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        FileSessionStore::new(&nested).save(&session()).unwrap();
        assert!(nested.join("auth-storage.json").exists());
    }

    #[test]
    fn preferences_default_then_persist() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_preferences(dir.path()), UiPreferences::default());

        let prefs = UiPreferences {
            theme: Theme::Dark,
            auto_refresh: false,
            ..UiPreferences::default()
        };
        save_preferences(dir.path(), &prefs).unwrap();
        assert_eq!(load_preferences(dir.path()), prefs);
        assert!(dir.path().join("ui-storage.json").exists());
    }

    #[test]
    fn memory_store() {
        let store = MemorySessionStore::default();
        assert!(store.load().is_none());
        store.save(&session()).unwrap();
        assert!(store.load().is_some());
        store.clear().unwrap();
        assert!(store.load().is_none());
    }
}
