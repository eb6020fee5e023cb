//! Storage abstraction for the underlying sorted key-value store.
//!
//! MetricDb does not implement durability, compaction, replication, or
//! transactions itself; it delegates all of that to whatever backend
//! implements [`Storage`]. The traits here describe the minimum contract the
//! adapter needs: point get/put/delete and ordered iteration over a bounded
//! key range.

pub mod in_memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::BytesRange;

/// A single key-value record.
#[derive(Clone, Debug)]
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The requested key does not exist. Backends that report missing keys
    /// as errors use this variant; point lookups in the adapter treat it as
    /// absence, never as failure.
    NotFound(String),
    /// Storage-related errors.
    Storage(String),
    /// Internal errors.
    Internal(String),
}

impl StorageError {
    /// True for the missing-key condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl std::error::Error for StorageError {}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Key not found: {}", msg),
            StorageError::Storage(msg) => write!(f, "Storage error: {}", msg),
            StorageError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Iterator over storage records, ordered by key.
#[async_trait]
pub trait StorageIterator {
    async fn next(&mut self) -> StorageResult<Option<Record>>;
}

/// Read operations on the storage layer.
#[async_trait]
pub trait StorageRead: Send + Sync {
    async fn get(&self, key: Bytes) -> StorageResult<Option<Record>>;

    /// Returns an iterator over records in the given range.
    ///
    /// The returned iterator is owned and does not borrow from the storage,
    /// allowing it to be stored in structs or passed across await points.
    async fn scan_iter(
        &self,
        range: BytesRange,
    ) -> StorageResult<Box<dyn StorageIterator + Send + 'static>>;

    /// Collects all records in the range into a Vec.
    #[tracing::instrument(level = "trace", skip_all)]
    async fn scan(&self, range: BytesRange) -> StorageResult<Vec<Record>> {
        let mut iter = self.scan_iter(range).await?;
        let mut records = Vec::new();
        while let Some(record) = iter.next().await? {
            records.push(record);
        }
        Ok(records)
    }
}

/// The storage type encapsulates access to the underlying sorted store.
#[async_trait]
pub trait Storage: StorageRead {
    /// Writes a single record, overwriting any existing value.
    async fn put(&self, record: Record) -> StorageResult<()>;

    /// Deletes a key. No-op if the key does not exist.
    async fn delete(&self, key: Bytes) -> StorageResult<()>;

    /// Closes the storage, releasing any resources.
    async fn close(&self) -> StorageResult<()>;
}
