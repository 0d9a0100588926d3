//! Concurrent engine: a fixed set of independently locked buckets
//!
//! Single-field operations lock exactly one bucket for the time it takes to
//! read or write one entry. A separate batch gate orders multi-field reads
//! against multi-field writes: readers share it, a batch write holds it
//! exclusively, so a page read never sees half of a batch.
//!
//! Segments hold the same hash-sorted chains as the exclusive engine and are
//! picked from the high hash bits, so a scan walks fields in hash order.

use super::chain::Chain;
use super::{bucket_index, hash_field, FieldRef, FieldTable, Scope, StorageBackend};
use crate::error::HashResult;
use bytes::Bytes;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Concurrent engine
#[derive(Debug)]
pub struct ConcurrentBackend {
    buckets: Box<[RwLock<Chain>]>,
    len: AtomicUsize,
    batch_gate: RwLock<()>,
}

impl ConcurrentBackend {
    /// `segments` is rounded up to a power of two
    pub fn new(segments: usize) -> Self {
        let segments = segments.max(1).next_power_of_two();
        ConcurrentBackend {
            buckets: (0..segments).map(|_| RwLock::new(Chain::default())).collect(),
            len: AtomicUsize::new(0),
            batch_gate: RwLock::new(()),
        }
    }

    fn bucket_of(&self, hash: u64) -> &RwLock<Chain> {
        &self.buckets[bucket_index(hash, self.buckets.len())]
    }
}

impl StorageBackend for ConcurrentBackend {
    fn kind(&self) -> &'static str {
        "concurrent"
    }

    fn open(&self, scope: Scope) -> Box<dyn FieldTable + '_> {
        let (shared, exclusive) = match scope {
            Scope::Field => (None, None),
            Scope::Read => (Some(self.batch_gate.read()), None),
            Scope::Batch => (None, Some(self.batch_gate.write())),
        };
        Box::new(ConcurrentTable {
            map: self,
            _shared: shared,
            _exclusive: exclusive,
        })
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }
}

/// Table handle; the batch gate guards are released when it drops
struct ConcurrentTable<'a> {
    map: &'a ConcurrentBackend,
    _shared: Option<RwLockReadGuard<'a, ()>>,
    _exclusive: Option<RwLockWriteGuard<'a, ()>>,
}

impl FieldTable for ConcurrentTable<'_> {
    fn lookup(&self, field: &[u8]) -> Option<FieldRef<'_>> {
        let hash = hash_field(field);
        let guard = self.map.bucket_of(hash).read();
        RwLockReadGuard::try_map(guard, |chain| chain.get(hash, field))
            .ok()
            .map(FieldRef::Locked)
    }

    fn upsert(&mut self, field: Bytes, value: Bytes) -> bool {
        let hash = hash_field(&field);
        let mut chain = self.map.bucket_of(hash).write();
        let existed = chain.insert(hash, field, value).is_some();
        if !existed {
            self.map.len.fetch_add(1, Ordering::AcqRel);
        }
        existed
    }

    fn upsert_if_absent(&mut self, field: Bytes, value: Bytes) -> bool {
        let hash = hash_field(&field);
        let mut chain = self.map.bucket_of(hash).write();
        if chain.get(hash, &field).is_some() {
            return false;
        }
        chain.insert(hash, field, value);
        self.map.len.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn update(
        &mut self,
        field: Bytes,
        apply: &mut dyn FnMut(Option<&Bytes>) -> HashResult<Bytes>,
    ) -> HashResult<Bytes> {
        let hash = hash_field(&field);
        let mut chain = self.map.bucket_of(hash).write();
        let next = apply(chain.get(hash, &field))?;
        if chain.insert(hash, field, next.clone()).is_none() {
            self.map.len.fetch_add(1, Ordering::AcqRel);
        }
        Ok(next)
    }

    fn remove(&mut self, field: &[u8]) -> bool {
        let hash = hash_field(field);
        let mut chain = self.map.bucket_of(hash).write();
        let existed = chain.remove(hash, field).is_some();
        if existed {
            self.map.len.fetch_sub(1, Ordering::AcqRel);
        }
        existed
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn bucket_count(&self) -> usize {
        self.map.buckets.len()
    }

    fn bucket_len(&self, bucket: usize) -> usize {
        self.map.buckets.get(bucket).map_or(0, |b| b.read().len())
    }

    fn read_bucket(
        &self,
        bucket: usize,
        skip: usize,
        limit: usize,
        out: &mut Vec<(Bytes, Bytes)>,
    ) -> usize {
        self.map
            .buckets
            .get(bucket)
            .map_or(0, |chain| chain.read().read(skip, limit, out))
    }
}
