//! Status persistence — durable key-value records keyed by strategy name.
//!
//! Two guarantees back the lifecycle contract:
//! - atomic overwrite: a reader never observes a partially written record
//!   (write to a temp file, then rename into place)
//! - at-most-one-writer per strategy: an evaluation cycle holds a writer
//!   guard for its strategy name; a concurrent cycle on the same name fails
//!   with `StoreError::Conflict` instead of interleaving

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use super::status::StrategyStatus;

/// Errors from the status store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("concurrent write to strategy '{name}' detected")]
    Conflict { name: String },
    #[error("invalid strategy name '{name}': names are non-empty and use only [A-Za-z0-9._-]")]
    InvalidName { name: String },
    #[error("status record for '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Status persistence capability. Implementations must honor atomic
/// overwrite and the writer-guard contract.
pub trait StatusStore: Send + Sync {
    fn load(&self, name: &str) -> Result<Option<StrategyStatus>, StoreError>;
    fn save(&self, status: &StrategyStatus) -> Result<(), StoreError>;
    fn list(&self) -> Result<Vec<StrategyStatus>, StoreError>;
    /// Claim exclusive write access to one strategy for the guard's lifetime.
    fn begin_write(&self, name: &str) -> Result<WriteGuard<'_>, StoreError>;
}

// ─── Writer registry ─────────────────────────────────────────────────

/// Tracks strategy names with an in-flight evaluation cycle.
#[derive(Debug, Default)]
pub struct WriterRegistry {
    active: Mutex<HashSet<String>>,
}

impl WriterRegistry {
    fn acquire(&self, name: &str) -> Result<WriteGuard<'_>, StoreError> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(name.to_string()) {
            return Err(StoreError::Conflict {
                name: name.to_string(),
            });
        }
        Ok(WriteGuard {
            name: name.to_string(),
            registry: self,
        })
    }

    fn release(&self, name: &str) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(name);
    }
}

/// RAII guard for exclusive write access to one strategy's record.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    name: String,
    registry: &'a WriterRegistry,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            name: name.to_string(),
        })
    }
}

// ─── JSON file store ─────────────────────────────────────────────────

/// One JSON file per strategy under a base directory.
///
/// Saves write `<name>.json.tmp` and rename it over `<name>.json`; rename is
/// atomic on the same filesystem, so readers see either the old or the new
/// record in full.
pub struct JsonStatusStore {
    dir: PathBuf,
    writers: WriterRegistry,
}

impl JsonStatusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writers: WriterRegistry::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl StatusStore for JsonStatusStore {
    fn load(&self, name: &str) -> Result<Option<StrategyStatus>, StoreError> {
        validate_name(name)?;
        let path = self.record_path(name);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    fn save(&self, status: &StrategyStatus) -> Result<(), StoreError> {
        validate_name(&status.strategy_name)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.record_path(&status.strategy_name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(status)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(
            strategy = %status.strategy_name,
            state = %status.state,
            "status record saved"
        );
        Ok(())
    }

    fn list(&self) -> Result<Vec<StrategyStatus>, StoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut statuses = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|c| serde_json::from_str::<StrategyStatus>(&c).map_err(StoreError::from))
            {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable status record");
                }
            }
        }
        statuses.sort_by(|a, b| a.strategy_name.cmp(&b.strategy_name));
        Ok(statuses)
    }

    fn begin_write(&self, name: &str) -> Result<WriteGuard<'_>, StoreError> {
        validate_name(name)?;
        self.writers.acquire(name)
    }
}

// ─── In-memory store ─────────────────────────────────────────────────

/// In-memory store for tests and dependency injection.
#[derive(Default)]
pub struct MemoryStatusStore {
    records: Mutex<HashMap<String, StrategyStatus>>,
    writers: WriterRegistry,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusStore for MemoryStatusStore {
    fn load(&self, name: &str) -> Result<Option<StrategyStatus>, StoreError> {
        validate_name(name)?;
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(name).cloned())
    }

    fn save(&self, status: &StrategyStatus) -> Result<(), StoreError> {
        validate_name(&status.strategy_name)?;
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(status.strategy_name.clone(), status.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<StrategyStatus>, StoreError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let mut statuses: Vec<_> = records.values().cloned().collect();
        statuses.sort_by(|a, b| a.strategy_name.cmp(&b.strategy_name));
        Ok(statuses)
    }

    fn begin_write(&self, name: &str) -> Result<WriteGuard<'_>, StoreError> {
        validate_name(name)?;
        self.writers.acquire(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::status::LifecycleState;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(tmp.path());

        let mut status = StrategyStatus::new("trend_a");
        status.state = LifecycleState::PaperTrading;
        status.days_in_state = 12;
        store.save(&status).unwrap();

        let loaded = store.load("trend_a").unwrap().unwrap();
        assert_eq!(loaded, status);
    }

    #[test]
    fn load_missing_returns_none() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(tmp.path());
        assert!(store.load("nothing_here").unwrap().is_none());
    }

    #[test]
    fn save_overwrites_atomically() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(tmp.path());

        let mut status = StrategyStatus::new("trend_a");
        store.save(&status).unwrap();
        status.days_in_state = 5;
        store.save(&status).unwrap();

        let loaded = store.load("trend_a").unwrap().unwrap();
        assert_eq!(loaded.days_in_state, 5);
        // No temp file left behind after the rename.
        assert!(!tmp.path().join("trend_a.json.tmp").exists());
    }

    #[test]
    fn concurrent_write_guard_conflicts() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(tmp.path());

        let _guard = store.begin_write("trend_a").unwrap();
        let second = store.begin_write("trend_a");
        assert!(matches!(second, Err(StoreError::Conflict { .. })));

        // A different strategy is unaffected.
        assert!(store.begin_write("trend_b").is_ok());
    }

    #[test]
    fn guard_release_allows_next_writer() {
        let store = MemoryStatusStore::new();
        {
            let _guard = store.begin_write("trend_a").unwrap();
        }
        assert!(store.begin_write("trend_a").is_ok());
    }

    #[test]
    fn corrupt_record_surfaces_on_load() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(tmp.path());
        fs::create_dir_all(tmp.path()).unwrap();
        fs::write(tmp.path().join("broken.json"), "{not json").unwrap();

        assert!(matches!(
            store.load("broken"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn list_skips_unreadable_records() {
        let tmp = TempDir::new().unwrap();
        let store = JsonStatusStore::new(tmp.path());

        store.save(&StrategyStatus::new("good_one")).unwrap();
        fs::write(tmp.path().join("broken.json"), "{not json").unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].strategy_name, "good_one");
    }

    #[test]
    fn list_is_sorted_by_name() {
        let store = MemoryStatusStore::new();
        store.save(&StrategyStatus::new("zeta")).unwrap();
        store.save(&StrategyStatus::new("alpha")).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all[0].strategy_name, "alpha");
        assert_eq!(all[1].strategy_name, "zeta");
    }

    #[test]
    fn invalid_names_rejected() {
        let store = MemoryStatusStore::new();
        assert!(matches!(
            store.load(""),
            Err(StoreError::InvalidName { .. })
        ));
        assert!(matches!(
            store.load("../escape"),
            Err(StoreError::InvalidName { .. })
        ));
        assert!(store.load("ok_name-1.2").is_ok());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStatusStore::new();
        let status = StrategyStatus::new("trend_a");
        store.save(&status).unwrap();
        assert_eq!(store.load("trend_a").unwrap().unwrap(), status);
    }
}
