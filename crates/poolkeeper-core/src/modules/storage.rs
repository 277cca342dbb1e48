//! `accounts.json` persistence for accounts and their refresh state.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use poolkeeper_types::{Account, ScheduledRefreshState};

use crate::error::AppResult;

const ACCOUNTS_FILE: &str = "accounts.json";
const STORE_VERSION: u32 = 1;

/// One persisted account. In-flight claims are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredAccount {
    #[serde(flatten)]
    pub account: Account,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_refresh_state: Option<ScheduledRefreshState>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountsFile {
    version: u32,
    #[serde(default)]
    accounts: Vec<StoredAccount>,
}

/// File-backed account store.
///
/// Clones share one write lock, so saves through any clone never interleave
/// on the temp file.
#[derive(Debug, Clone)]
pub struct AccountStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl AccountStore {
    pub fn new(data_dir: &Path) -> Self {
        Self { path: data_dir.join(ACCOUNTS_FILE), write_lock: Arc::new(Mutex::new(())) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load stored accounts; a missing file is an empty pool.
    pub fn load(&self) -> AppResult<Vec<StoredAccount>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let file: AccountsFile = serde_json::from_str(&content)?;
        if file.version > STORE_VERSION {
            tracing::warn!(
                "[Storage] {} has version {} (newer than {}), loading anyway",
                self.path.display(),
                file.version,
                STORE_VERSION
            );
        }
        Ok(file.accounts)
    }

    /// Save atomically (temp file + rename).
    pub fn save(&self, accounts: Vec<StoredAccount>) -> AppResult<()> {
        let _lock = self.write_lock.lock();
        self.write_locked(accounts)
    }

    /// Take the snapshot and write it under the write lock, so a snapshot
    /// taken earlier can never land on disk after a later one.
    pub fn save_with<F>(&self, snapshot: F) -> AppResult<()>
    where
        F: FnOnce() -> Vec<StoredAccount>,
    {
        let _lock = self.write_lock.lock();
        self.write_locked(snapshot())
    }

    fn write_locked(&self, accounts: Vec<StoredAccount>) -> AppResult<()> {
        let file = AccountsFile { version: STORE_VERSION, accounts };
        let content = serde_json::to_string_pretty(&file)?;
        let temp_path = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
