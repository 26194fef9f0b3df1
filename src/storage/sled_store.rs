use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;
use sled::IVec;

use super::AccountBackend;
use crate::gacha::{Account, GachaError, ACCOUNT_SCHEMA_VERSION};

const TREE_ACCOUNTS: &str = "swca_accounts";
const KEY_PREFIX: &str = "accounts:";

/// Sled-backed persistence: one bincode record per username.
pub struct SledBackend {
    _db: sled::Db,
    accounts: sled::Tree,
    path: PathBuf,
}

impl SledBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GachaError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let accounts = db.open_tree(TREE_ACCOUNTS)?;
        Ok(Self {
            _db: db,
            accounts,
            path: path_ref.to_path_buf(),
        })
    }

    fn account_key(username: &str) -> Vec<u8> {
        format!("{}{}", KEY_PREFIX, username).into_bytes()
    }

    fn decode(bytes: IVec) -> Result<Account, GachaError> {
        let record: Account = bincode::deserialize(&bytes)?;
        if record.schema_version != ACCOUNT_SCHEMA_VERSION {
            return Err(GachaError::SchemaMismatch {
                entity: "account",
                expected: ACCOUNT_SCHEMA_VERSION,
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Fetch one account by username.
    pub fn get_account(&self, username: &str) -> Result<Option<Account>, GachaError> {
        match self.accounts.get(Self::account_key(username))? {
            Some(bytes) => Ok(Some(Self::decode(bytes)?)),
            None => Ok(None),
        }
    }
}

impl AccountBackend for SledBackend {
    fn load_all(&self) -> Result<BTreeMap<String, Account>, GachaError> {
        let mut out = BTreeMap::new();
        for entry in self.accounts.scan_prefix(KEY_PREFIX.as_bytes()) {
            let (key, value) = entry?;
            match Self::decode(value) {
                Ok(account) => {
                    out.insert(account.username.clone(), account);
                }
                Err(e) => warn!(
                    "skipping unreadable account record {}: {}",
                    String::from_utf8_lossy(&key),
                    e
                ),
            }
        }
        Ok(out)
    }

    fn persist(&self, account: &Account) -> Result<(), GachaError> {
        let bytes = bincode::serialize(account)?;
        self.accounts
            .insert(Self::account_key(&account.username), bytes)?;
        self.accounts.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sled:{}", self.path.display())
    }
}
