//! In-memory document store.
//!
//! This module provides:
//! - [`MemoryStore`] — Thread-safe bounded record store, usable as a
//!   [`StoreClientFactory`]
//! - [`MemoryConnection`] — Connection handle released on drop

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::aggregate::AggregateGroup;
use crate::error::LogError;
use crate::store::{
    AggregatePipeline, FindQuery, StoreClientFactory, StoreConnection, StoreFuture,
};
use crate::types::{LogRecord, RecordId};

/// Default maximum number of records kept.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

#[derive(Debug)]
struct Shared {
    max_entries: usize,
    records: RwLock<VecDeque<LogRecord>>,
    next_sequence: AtomicU64,
    available: AtomicBool,
    open_connections: AtomicUsize,
}

/// Thread-safe in-memory log store.
///
/// Records are kept in insertion order and assigned increasing
/// [`RecordId`]s. Once `max_entries` is reached the oldest record is
/// evicted. Cloning yields another handle to the same store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryStore {
    /// Creates a store holding at most `max_entries` records.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                max_entries: max_entries.max(1),
                records: RwLock::new(VecDeque::new()),
                next_sequence: AtomicU64::new(1),
                available: AtomicBool::new(true),
                open_connections: AtomicUsize::new(0),
            }),
        }
    }

    /// Stores a record, overwriting its `_id` with a fresh identifier.
    pub fn insert(&self, mut record: LogRecord) -> RecordId {
        let id = RecordId::from_sequence(self.shared.next_sequence.fetch_add(1, Ordering::Relaxed));
        record.set_id(&id);

        let mut records = self.shared.records.write();
        records.push_back(record);
        while records.len() > self.shared.max_entries {
            records.pop_front();
        }
        id
    }

    /// Stores several records in order.
    pub fn extend<I>(&self, records: I) -> Vec<RecordId>
    where
        I: IntoIterator<Item = LogRecord>,
    {
        records.into_iter().map(|r| self.insert(r)).collect()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.records.read().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.records.read().is_empty()
    }

    /// Removes every record.
    pub fn clear(&self) {
        self.shared.records.write().clear();
    }

    /// Marks the store reachable or unreachable. While unreachable,
    /// [`StoreClientFactory::connect`] fails.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::Release);
    }

    /// Number of connections currently open.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.shared.open_connections.load(Ordering::Acquire)
    }

    /// Returns the capacity.
    #[must_use]
    pub fn max_entries(&self) -> usize {
        self.shared.max_entries
    }
}

impl StoreClientFactory for MemoryStore {
    fn connect(&self) -> StoreFuture<'_, Box<dyn StoreConnection>> {
        Box::pin(async move {
            if !self.shared.available.load(Ordering::Acquire) {
                warn!("document store unavailable");
                return Err(LogError::store("document store unavailable"));
            }
            self.shared.open_connections.fetch_add(1, Ordering::AcqRel);
            let conn: Box<dyn StoreConnection> = Box::new(MemoryConnection {
                shared: Arc::clone(&self.shared),
            });
            Ok(conn)
        })
    }
}

/// Connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
}

impl StoreConnection for MemoryConnection {
    fn find(&self, query: FindQuery) -> StoreFuture<'_, Vec<LogRecord>> {
        let found = query.apply(self.shared.records.read().iter());
        debug!(
            skip = query.skip,
            limit = ?query.limit,
            sort = ?query.sort,
            found = found.len(),
            "find"
        );
        Box::pin(async move { Ok(found) })
    }

    fn aggregate(&self, pipeline: AggregatePipeline) -> StoreFuture<'_, Vec<AggregateGroup>> {
        let snapshot: Vec<LogRecord> = self.shared.records.read().iter().cloned().collect();
        let groups = pipeline.apply(snapshot);
        if let Ok(groups) = &groups {
            debug!(stages = pipeline.stages().len(), groups = groups.len(), "aggregate");
        }
        Box::pin(async move { groups })
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.shared.open_connections.fetch_sub(1, Ordering::AcqRel);
    }
}
