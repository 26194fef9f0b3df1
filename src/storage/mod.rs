//! # Storage Module - Account Persistence Layer
//!
//! Every account is one record keyed by username. A backend only needs to load all
//! records at startup and atomically replace one record after each mutation.
//!
//! Two backends are available:
//!
//! - [`JsonFileBackend`] (default): a single `accounts.json` document
//!   `{"users": {"<username>": {...}}}`, rewritten in full on every change via a
//!   temp file and rename while an `fs2` exclusive lock is held on a sidecar lock file.
//! - [`SledBackend`] (feature `sled-store`): one bincode value per username in a sled tree.
//!
//! ```text
//! data/
//! ├── accounts.json       ← JSON backend store
//! ├── accounts.json.lock  ← writer/reader lock
//! └── accounts.sled/      ← sled backend (when selected)
//! ```
//!
//! A missing or unreadable JSON store is treated as empty and logged at warn level, so a
//! damaged file never prevents startup.

#[cfg(feature = "sled-store")]
pub mod sled_store;

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{StorageBackendKind, StorageConfig};
use crate::gacha::{Account, GachaError};

#[cfg(feature = "sled-store")]
pub use sled_store::SledBackend;

/// Durable home for account records.
pub trait AccountBackend: Send + Sync {
    /// Every stored account, keyed by username.
    fn load_all(&self) -> Result<BTreeMap<String, Account>, GachaError>;

    /// Atomically replace the stored record for `account.username`.
    fn persist(&self, account: &Account) -> Result<(), GachaError>;

    /// Human readable location, for logs and `status`.
    fn describe(&self) -> String;
}

/// Open the backend selected in `config`, creating the data directory if needed.
pub fn open_backend(config: &StorageConfig) -> Result<Box<dyn AccountBackend>, GachaError> {
    let data_dir = Path::new(&config.data_dir);
    fs::create_dir_all(data_dir)?;
    match config.backend {
        StorageBackendKind::Json => Ok(Box::new(JsonFileBackend::open(
            data_dir.join(&config.json_file),
        )?)),
        #[cfg(feature = "sled-store")]
        StorageBackendKind::Sled => Ok(Box::new(SledBackend::open(
            data_dir.join("accounts.sled"),
        )?)),
        #[cfg(not(feature = "sled-store"))]
        StorageBackendKind::Sled => Err(GachaError::Internal(
            "sled backend requested but the 'sled-store' feature is disabled".into(),
        )),
    }
}

// ============================================================================
// JSON file backend
// ============================================================================

/// On-disk document for the JSON backend.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub users: BTreeMap<String, Account>,
}

/// Borrowed view so a write does not clone every account.
#[derive(Serialize)]
struct StoreView<'a> {
    users: BTreeMap<&'a str, &'a Account>,
}

pub struct JsonFileBackend {
    path: PathBuf,
    lock_path: PathBuf,
    snapshot: Mutex<StoreFile>,
}

impl JsonFileBackend {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GachaError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock_path = sidecar(&path, "lock");
        let snapshot = read_store(&path, &lock_path);
        debug!(
            "json store {} opened with {} account(s)",
            path.display(),
            snapshot.users.len()
        );
        Ok(Self {
            path,
            lock_path,
            snapshot: Mutex::new(snapshot),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccountBackend for JsonFileBackend {
    fn load_all(&self) -> Result<BTreeMap<String, Account>, GachaError> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|_| GachaError::Internal("json store mutex poisoned".into()))?;
        Ok(guard.users.clone())
    }

    fn persist(&self, account: &Account) -> Result<(), GachaError> {
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| GachaError::Internal("json store mutex poisoned".into()))?;

        // Serialize the would-be document first; the snapshot only changes once the file has.
        let mut users: BTreeMap<&str, &Account> = guard
            .users
            .iter()
            .map(|(name, acct)| (name.as_str(), acct))
            .collect();
        users.insert(account.username.as_str(), account);
        let content = serde_json::to_string_pretty(&StoreView { users })?;

        write_file_locked(&self.path, &self.lock_path, &content)?;
        guard
            .users
            .insert(account.username.clone(), account.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "accounts.json".into());
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn open_lock(lock_path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)
}

/// Read the store under a shared lock. Missing or corrupt files yield an empty store.
fn read_store(path: &Path, lock_path: &Path) -> StoreFile {
    let lock = open_lock(lock_path).ok();
    if let Some(ref l) = lock {
        let _ = l.lock_shared();
    }
    let mut contents = String::new();
    let result = match File::open(path) {
        Ok(mut f) => f.read_to_string(&mut contents).map(|_| ()),
        Err(e) => Err(e),
    };
    if let Some(ref l) = lock {
        let _ = l.unlock();
    }

    match result {
        Ok(()) => {
            let cleaned = contents.trim_start_matches('\0');
            if cleaned.trim().is_empty() {
                return StoreFile::default();
            }
            serde_json::from_str(cleaned).unwrap_or_else(|e| {
                warn!(
                    "account store {} is corrupt ({}); starting with an empty store",
                    path.display(),
                    e
                );
                StoreFile::default()
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => StoreFile::default(),
        Err(e) => {
            warn!(
                "account store {} unreadable ({}); starting with an empty store",
                path.display(),
                e
            );
            StoreFile::default()
        }
    }
}

/// Write and fsync `content` into a fresh temp file; on failure the temp file is removed.
fn fill_or_discard(mut tmp: File, tmp_path: &Path, content: &[u8]) -> std::io::Result<()> {
    let written = tmp
        .write_all(content)
        .and_then(|_| tmp.flush())
        .and_then(|_| tmp.sync_all());
    if written.is_err() {
        drop(tmp);
        let _ = fs::remove_file(tmp_path);
    }
    written
}

/// Replace `path` with `content` atomically: temp file, fsync, rename, all under an
/// exclusive lock on `lock_path`.
fn write_file_locked(path: &Path, lock_path: &Path, content: &str) -> Result<(), GachaError> {
    let lock_file = open_lock(lock_path)?;
    lock_file.lock_exclusive()?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("accounts.json");
    let mut counter = 0u32;
    let tmp_path = loop {
        let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(tmp) => {
                if let Err(e) = fill_or_discard(tmp, &candidate, content.as_bytes()) {
                    let _ = lock_file.unlock();
                    return Err(e.into());
                }
                break candidate;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter = counter.saturating_add(1);
            }
            Err(e) => {
                let _ = lock_file.unlock();
                return Err(e.into());
            }
        }
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        let _ = lock_file.unlock();
        return Err(e.into());
    }
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }
    let _ = lock_file.unlock();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gacha::Wallet;
    use tempfile::TempDir;

    #[test]
    fn missing_file_opens_empty() {
        let dir = TempDir::new().expect("tempdir");
        let backend = JsonFileBackend::open(dir.path().join("accounts.json")).expect("open");
        assert!(backend.load_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("accounts.json");
        fs::write(&path, "{\"users\": [1, 2").unwrap();
        let backend = JsonFileBackend::open(&path).expect("open");
        assert!(backend.load_all().unwrap().is_empty());

        fs::write(&path, "\0\0\0").unwrap();
        let backend = JsonFileBackend::open(&path).expect("open");
        assert!(backend.load_all().unwrap().is_empty());
    }

    #[test]
    fn persist_rewrites_whole_document() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("accounts.json");
        let backend = JsonFileBackend::open(&path).expect("open");
        backend
            .persist(&Account::new("alice", Wallet::new(2000, 500)))
            .unwrap();
        backend
            .persist(&Account::new("bob", Wallet::new(10, 20)))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["users"]["alice"].is_object());
        assert!(raw["users"]["bob"].is_object());

        let reopened = JsonFileBackend::open(&path).expect("reopen");
        let users = reopened.load_all().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users["bob"].wallet.coins(), 20);
        // No temp files left behind
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn failed_temp_write_removes_temp_file() {
        let dir = TempDir::new().expect("tempdir");
        let tmp_path = dir.path().join(".accounts.json.tmp-test");
        fs::write(&tmp_path, "").unwrap();
        // A read-only handle makes the write fail.
        let read_only = File::open(&tmp_path).unwrap();
        assert!(fill_or_discard(read_only, &tmp_path, b"{}").is_err());
        assert!(!tmp_path.exists());
    }

    #[test]
    fn open_backend_honours_config() {
        let dir = TempDir::new().expect("tempdir");
        let config = StorageConfig {
            data_dir: dir.path().join("nested").to_string_lossy().to_string(),
            backend: StorageBackendKind::Json,
            json_file: "store.json".into(),
        };
        let backend = open_backend(&config).expect("open");
        assert!(backend.describe().ends_with("store.json"));
    }
}
