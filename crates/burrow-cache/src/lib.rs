//! Burrow Cache — on-disk package/module metadata store
//!
//! A keyed store of package records persisted as a JSON file under the
//! config directory. The server treats it as a blocking key/value lookup
//! with three operations: find-by-key, find-by-predicate-set, and create.
//! A lookup miss is an `Option::None`, never an error.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Cache file inside the config directory.
pub const CACHE_FILE: &str = "packages.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One known package: local name, import path, and resolved version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub id: u64,
    pub name: String,
    pub import_path: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
}

impl PackageRecord {
    /// Display key combining path and version, e.g. `fmt@v1.21`.
    pub fn index_name(&self) -> String {
        format!("{}@{}", self.import_path, self.version)
    }
}

/// Predicate set for `find`: any field left `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct PackageQuery {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub import_path: Option<String>,
    pub version: Option<String>,
}

pub struct PackageStore {
    path: Option<PathBuf>,
    records: DashMap<u64, PackageRecord>,
    next_id: AtomicU64,
}

impl PackageStore {
    /// Open the store backed by `<dir>/packages.json`, creating the
    /// directory on first use and loading any existing records.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
        let path = dir.join(CACHE_FILE);

        let records = DashMap::new();
        let mut max_id = 0u64;
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let loaded: Vec<PackageRecord> = serde_json::from_str(&raw)?;
            for record in loaded {
                max_id = max_id.max(record.id);
                records.insert(record.id, record);
            }
            tracing::debug!("Loaded {} package records from {}", records.len(), path.display());
        }

        Ok(PackageStore {
            path: Some(path),
            records,
            next_id: AtomicU64::new(max_id + 1),
        })
    }

    /// Unpersisted store, used by tests and one-shot indexing runs.
    pub fn in_memory() -> Self {
        PackageStore {
            path: None,
            records: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Insert a new record and persist the table.
    pub fn create(
        &self,
        name: &str,
        import_path: &str,
        version: &str,
    ) -> Result<PackageRecord, CacheError> {
        let record = PackageRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            import_path: import_path.to_string(),
            version: version.to_string(),
            created_at: Utc::now(),
        };
        self.records.insert(record.id, record.clone());
        self.persist()?;
        Ok(record)
    }

    /// Find-by-key: exact import path and version. A miss is `None`.
    pub fn get(&self, import_path: &str, version: &str) -> Option<PackageRecord> {
        self.records
            .iter()
            .find(|entry| entry.import_path == import_path && entry.version == version)
            .map(|entry| entry.value().clone())
    }

    /// Find-by-predicate-set: every present field must match.
    pub fn find(&self, query: &PackageQuery) -> Vec<PackageRecord> {
        let mut results: Vec<PackageRecord> = self
            .records
            .iter()
            .filter(|entry| {
                query.id.is_none_or(|id| entry.id == id)
                    && query.name.as_deref().is_none_or(|n| entry.name == n)
                    && query
                        .import_path
                        .as_deref()
                        .is_none_or(|p| entry.import_path == p)
                    && query.version.as_deref().is_none_or(|v| entry.version == v)
            })
            .map(|entry| entry.value().clone())
            .collect();
        results.sort_by_key(|record| record.id);
        results
    }

    /// A miss on the key triggers the create path; only I/O failures are
    /// errors.
    pub fn get_or_create(
        &self,
        name: &str,
        import_path: &str,
        version: &str,
    ) -> Result<PackageRecord, CacheError> {
        if let Some(existing) = self.get(import_path, version) {
            return Ok(existing);
        }
        self.create(name, import_path, version)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn persist(&self) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut records: Vec<PackageRecord> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|record| record.id);
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = PackageStore::in_memory();
        let record = store.create("fmt", "fmt", "").unwrap();
        assert_eq!(record.id, 1);

        let found = store.get("fmt", "").expect("record should be found");
        assert_eq!(found.name, "fmt");
        // A miss is not an error.
        assert!(store.get("fmt", "v2").is_none());
    }

    #[test]
    fn test_find_with_predicate_set() {
        let store = PackageStore::in_memory();
        store.create("fmt", "fmt", "").unwrap();
        store.create("json", "encoding/json", "").unwrap();

        let all = store.find(&PackageQuery::default());
        assert_eq!(all.len(), 2);

        let by_path = store.find(&PackageQuery {
            import_path: Some("encoding/json".into()),
            ..Default::default()
        });
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].name, "json");

        let none = store.find(&PackageQuery {
            name: Some("missing".into()),
            ..Default::default()
        });
        assert!(none.is_empty());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store = PackageStore::in_memory();
        let first = store.get_or_create("fmt", "fmt", "").unwrap();
        let second = store.get_or_create("fmt", "fmt", "").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = PackageStore::open(dir.path()).unwrap();
            store.create("fmt", "fmt", "").unwrap();
            store.create("mymod", "example.com/mymod", "v0.1.0").unwrap();
        }

        let reloaded = PackageStore::open(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        let record = reloaded.get("example.com/mymod", "v0.1.0").unwrap();
        assert_eq!(record.name, "mymod");

        // Ids keep advancing after a reload.
        let fresh = reloaded.create("extra", "example.com/extra", "").unwrap();
        assert!(fresh.id > record.id);
    }

    #[test]
    fn test_index_name() {
        let store = PackageStore::in_memory();
        let record = store.create("mymod", "example.com/mymod", "v1.2.3").unwrap();
        assert_eq!(record.index_name(), "example.com/mymod@v1.2.3");
    }
}
