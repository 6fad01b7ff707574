//! Mock storage.
//!
//! The engine reads through the [`MockStore`] trait and treats every call as
//! a point-in-time snapshot. [`InMemoryStore`] is the bundled backend.

use crate::error::StoreError;
use crate::model::{Mock, RegexMatcher};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Storage contract consumed by the resolver and the management routes.
pub trait MockStore: Send + Sync {
    /// Mocks with a literal path equal to `path`, ascending by id.
    fn find_exact(&self, method: &str, path: &str) -> Result<Vec<Mock>, StoreError>;

    /// Regex-path projections registered for `method`, ascending by id.
    fn find_regex_candidates(&self, method: &str) -> Result<Vec<RegexMatcher>, StoreError>;

    /// Full records for `ids` in the given order. Unknown ids are skipped.
    fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Mock>, StoreError>;

    /// Persist a mock and return it with its assigned id.
    fn save(&self, mock: Mock) -> Result<Mock, StoreError>;

    fn delete_by_id(&self, id: i64) -> Result<(), StoreError>;

    fn list_all(&self) -> Result<Vec<Mock>, StoreError>;
}

struct StoredMock {
    mock: Mock,
    /// Compiled once on save
    regex: Option<Regex>,
}

/// Thread-safe in-memory store with monotonically increasing ids.
#[derive(Default)]
pub struct InMemoryStore {
    mocks: RwLock<BTreeMap<i64, StoredMock>>,
    last_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<i64, StoredMock>>, StoreError> {
        self.mocks
            .read()
            .map_err(|_| StoreError::Backend("mock store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<i64, StoredMock>>, StoreError> {
        self.mocks
            .write()
            .map_err(|_| StoreError::Backend("mock store lock poisoned".to_string()))
    }
}

impl MockStore for InMemoryStore {
    fn find_exact(&self, method: &str, path: &str) -> Result<Vec<Mock>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|s| s.mock.method == method && s.mock.exact_path() == Some(path))
            .map(|s| s.mock.clone())
            .collect())
    }

    fn find_regex_candidates(&self, method: &str) -> Result<Vec<RegexMatcher>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|s| s.mock.method == method)
            .filter_map(|s| {
                s.regex.as_ref().map(|regex| RegexMatcher {
                    id: s.mock.id,
                    method: s.mock.method.clone(),
                    regex_path: regex.clone(),
                })
            })
            .collect())
    }

    fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Mock>, StoreError> {
        let mocks = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| mocks.get(id).map(|s| s.mock.clone()))
            .collect())
    }

    fn save(&self, mut mock: Mock) -> Result<Mock, StoreError> {
        let regex = mock
            .regex_pattern()
            .map(Regex::new)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("invalid regexPath: {}", e)))?;

        let mut mocks = self.write()?;
        mock.id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        mocks.insert(
            mock.id,
            StoredMock {
                mock: mock.clone(),
                regex,
            },
        );

        info!(
            mock_id = mock.id,
            method = %mock.method,
            path = mock.exact_path().or(mock.regex_pattern()).unwrap_or_default(),
            "Saved mock"
        );
        Ok(mock)
    }

    fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        match self.write()?.remove(&id) {
            Some(_) => {
                info!(mock_id = id, "Deleted mock");
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn list_all(&self) -> Result<Vec<Mock>, StoreError> {
        Ok(self.read()?.values().map(|s| s.mock.clone()).collect())
    }
}
