use std::collections::BTreeMap;
use std::ops::RangeBounds;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{Record, Storage, StorageError, StorageIterator, StorageRead, StorageResult};
use crate::BytesRange;

/// In-memory implementation of the [`Storage`] trait using a BTreeMap.
///
/// Stores all data in memory and is useful for testing or scenarios where
/// durability is not required. Iteration order is the map's key order, which
/// is the lexicographic byte order the adapter's key layout relies on.
pub struct InMemoryStorage {
    data: Arc<RwLock<BTreeMap<Bytes, Bytes>>>,
}

impl InMemoryStorage {
    /// Creates a new InMemoryStorage instance with an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRead for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(data
            .get(&key)
            .map(|value| Record::new(key.clone(), value.clone())))
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire read lock: {}", e)))?;

        let records: Vec<Record> = data
            .range((range.start_bound().cloned(), range.end_bound().cloned()))
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect();

        Ok(Box::new(InMemoryIterator { records, index: 0 }))
    }
}

struct InMemoryIterator {
    records: Vec<Record>,
    index: usize,
}

#[async_trait]
impl StorageIterator for InMemoryIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>> {
        if self.index >= self.records.len() {
            Ok(None)
        } else {
            let record = self.records[self.index].clone();
            self.index += 1;
            Ok(Some(record))
        }
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    #[tracing::instrument(level = "trace", skip_all)]
    async fn put(&self, record: Record) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        data.insert(record.key, record.value);
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn delete(&self, key: Bytes) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::Internal(format!("Failed to acquire write lock: {}", e)))?;

        data.remove(&key);
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        // No-op for in-memory storage
        Ok(())
    }
}

/// Injected failure that fires either once or on every call.
#[derive(Clone)]
enum Failure {
    /// Error is returned once, then automatically cleared.
    Once(StorageError),
    /// Error is returned on every subsequent call until explicitly cleared.
    Persistent(StorageError),
}

type FailSlot = Mutex<Option<Failure>>;

/// Checks a [`FailSlot`] and returns an error if one is set.
///
/// For [`Failure::Once`], the slot is cleared so the error fires exactly
/// once. For [`Failure::Persistent`], the slot is left unchanged.
fn check_failure(slot: &FailSlot) -> StorageResult<()> {
    let mut guard = slot
        .lock()
        .map_err(|e| StorageError::Internal(format!("Failed to acquire failure slot: {}", e)))?;
    match guard.as_ref() {
        None => Ok(()),
        Some(Failure::Persistent(err)) => Err(err.clone()),
        Some(Failure::Once(err)) => {
            let err = err.clone();
            *guard = None;
            Err(err)
        }
    }
}

/// A storage wrapper that delegates to an inner [`Storage`] but can inject
/// failures into `get`, `put`, `delete`, and `scan_iter` on demand.
///
/// Failures can be *persistent* (returned on every call until cleared) or
/// *once* (returned on the next call, then automatically cleared).
///
/// # Example
///
/// ```ignore
/// let storage = FailingStorage::wrap(Arc::new(InMemoryStorage::new()));
/// storage.fail_put(StorageError::Storage("disk full".into()));
/// // every put call now returns Err(...)
///
/// storage.fail_get_once(StorageError::NotFound("gone".into()));
/// // only the next get call returns Err(...), then auto-clears
/// ```
pub struct FailingStorage {
    inner: Arc<dyn Storage>,
    fail_get: FailSlot,
    fail_put: FailSlot,
    fail_delete: FailSlot,
    fail_scan: FailSlot,
}

impl FailingStorage {
    /// Wraps an existing storage, with all failure injections initially `None`.
    pub fn wrap(inner: Arc<dyn Storage>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_get: Mutex::new(None),
            fail_put: Mutex::new(None),
            fail_delete: Mutex::new(None),
            fail_scan: Mutex::new(None),
        })
    }

    /// Makes `get` return the given error on every subsequent call.
    pub fn fail_get(&self, err: StorageError) {
        *self.fail_get.lock().expect("failure slot poisoned") = Some(Failure::Persistent(err));
    }

    /// Makes `get` return the given error on the next call only.
    pub fn fail_get_once(&self, err: StorageError) {
        *self.fail_get.lock().expect("failure slot poisoned") = Some(Failure::Once(err));
    }

    /// Makes `put` return the given error on every subsequent call.
    pub fn fail_put(&self, err: StorageError) {
        *self.fail_put.lock().expect("failure slot poisoned") = Some(Failure::Persistent(err));
    }

    /// Makes `put` return the given error on the next call only.
    pub fn fail_put_once(&self, err: StorageError) {
        *self.fail_put.lock().expect("failure slot poisoned") = Some(Failure::Once(err));
    }

    /// Makes `delete` return the given error on every subsequent call.
    pub fn fail_delete(&self, err: StorageError) {
        *self.fail_delete.lock().expect("failure slot poisoned") = Some(Failure::Persistent(err));
    }

    /// Makes `delete` return the given error on the next call only.
    pub fn fail_delete_once(&self, err: StorageError) {
        *self.fail_delete.lock().expect("failure slot poisoned") = Some(Failure::Once(err));
    }

    /// Makes `scan_iter` return the given error on every subsequent call.
    pub fn fail_scan(&self, err: StorageError) {
        *self.fail_scan.lock().expect("failure slot poisoned") = Some(Failure::Persistent(err));
    }

    /// Makes `scan_iter` return the given error on the next call only.
    pub fn fail_scan_once(&self, err: StorageError) {
        *self.fail_scan.lock().expect("failure slot poisoned") = Some(Failure::Once(err));
    }
}

#[async_trait]
impl StorageRead for FailingStorage {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>> {
        check_failure(&self.fail_get)?;
        self.inner.get(key).await
    }

    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>> {
        check_failure(&self.fail_scan)?;
        self.inner.scan_iter(range).await
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn put(&self, record: Record) -> StorageResult<()> {
        check_failure(&self.fail_put)?;
        self.inner.put(record).await
    }

    async fn delete(&self, key: Bytes) -> StorageResult<()> {
        check_failure(&self.fail_delete)?;
        self.inner.delete(key).await
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}
