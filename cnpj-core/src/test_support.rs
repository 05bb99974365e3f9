//! In-memory record store used by unit and behaviour tests.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use crate::{EntityKind, RecordSchema, RecordSink, RecordStore, SinkError, TypedRecord};

type RejectFn = dyn Fn(&TypedRecord) -> bool + Send + Sync;

#[derive(Default)]
struct Shared {
    active: AtomicUsize,
    max_active: AtomicUsize,
    sinks_opened: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
    single_inserts: AtomicUsize,
    committed: Mutex<Vec<TypedRecord>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record store keeping committed rows in memory.
///
/// The store counts how many sinks are open at once so tests can observe
/// whether jobs overlapped, and can be told to reject particular records to
/// exercise the row-by-row fallback.
#[derive(Clone)]
pub struct MemoryStore {
    concurrent: bool,
    reject: Option<Arc<RejectFn>>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("concurrent", &self.concurrent)
            .field("committed", &self.committed().len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Store that only allows one writer at a time.
    #[must_use]
    pub fn single_writer() -> Self {
        Self {
            concurrent: false,
            reject: None,
            shared: Arc::default(),
        }
    }

    /// Store that allows concurrent writers.
    #[must_use]
    pub fn concurrent() -> Self {
        Self {
            concurrent: true,
            ..Self::single_writer()
        }
    }

    /// Reject every record for which `predicate` returns `true`.
    #[must_use]
    pub fn rejecting<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TypedRecord) -> bool + Send + Sync + 'static,
    {
        self.reject = Some(Arc::new(predicate));
        self
    }

    /// Records committed so far, in commit order.
    #[must_use]
    pub fn committed(&self) -> Vec<TypedRecord> {
        lock(&self.shared.committed).clone()
    }

    /// Committed records belonging to `kind`.
    #[must_use]
    pub fn committed_for(&self, kind: EntityKind) -> Vec<TypedRecord> {
        lock(&self.shared.committed)
            .iter()
            .filter(|record| record.entity_kind() == kind)
            .cloned()
            .collect()
    }

    /// Sizes of every `insert_batch` call, in call order.
    #[must_use]
    pub fn batch_sizes(&self) -> Vec<usize> {
        lock(&self.shared.batch_sizes).clone()
    }

    /// Number of `insert_one` calls.
    #[must_use]
    pub fn single_inserts(&self) -> usize {
        self.shared.single_inserts.load(Ordering::SeqCst)
    }

    /// Highest number of sinks that were open at the same time.
    #[must_use]
    pub fn max_active_sinks(&self) -> usize {
        self.shared.max_active.load(Ordering::SeqCst)
    }

    /// Number of sinks opened over the store's lifetime.
    #[must_use]
    pub fn sinks_opened(&self) -> usize {
        self.shared.sinks_opened.load(Ordering::SeqCst)
    }
}

impl RecordStore for MemoryStore {
    type Sink = MemorySink;

    fn supports_concurrent_writers(&self) -> bool {
        self.concurrent
    }

    fn open_sink(&self) -> Result<MemorySink, SinkError> {
        let active = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_active.fetch_max(active, Ordering::SeqCst);
        self.shared.sinks_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySink {
            reject: self.reject.clone(),
            shared: Arc::clone(&self.shared),
            pending: Vec::new(),
        })
    }
}

/// Sink handed out by [`MemoryStore`].
pub struct MemorySink {
    reject: Option<Arc<RejectFn>>,
    shared: Arc<Shared>,
    pending: Vec<TypedRecord>,
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl MemorySink {
    fn check(&self, record: &TypedRecord) -> Result<(), SinkError> {
        match &self.reject {
            Some(reject) if reject(record) => Err(SinkError::new(
                "insert record",
                format!("record rejected by {} table", record.schema().table),
            )),
            _ => Ok(()),
        }
    }
}

impl RecordSink for MemorySink {
    fn insert_batch(
        &mut self,
        _schema: &'static RecordSchema,
        records: &[TypedRecord],
    ) -> Result<(), SinkError> {
        lock(&self.shared.batch_sizes).push(records.len());
        for record in records {
            self.check(record)?;
            self.pending.push(record.clone());
        }
        Ok(())
    }

    fn insert_one(
        &mut self,
        _schema: &'static RecordSchema,
        record: &TypedRecord,
    ) -> Result<(), SinkError> {
        self.shared.single_inserts.fetch_add(1, Ordering::SeqCst);
        self.check(record)?;
        self.pending.push(record.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        lock(&self.shared.committed).append(&mut self.pending);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SinkError> {
        self.pending.clear();
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.shared.active.fetch_sub(1, Ordering::SeqCst);
    }
}
