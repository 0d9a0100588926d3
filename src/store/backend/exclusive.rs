//! Exclusive engine: a chained hash table behind one key-wide lock
//!
//! The backend's mutex is the per-key lock. [`StorageBackend::open`] takes it
//! for the whole command whatever the scope, and the [`BucketTable`] under it
//! does no locking of its own. [`StorageBackend::len`] takes the same mutex,
//! so calling it while a table handle from `open` is alive on the same thread
//! deadlocks.

use super::chain::Chain;
use super::{bucket_index, hash_field, FieldRef, FieldTable, Scope, StorageBackend};
use crate::error::HashResult;
use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};

const MIN_BUCKETS: usize = 8;

/// Average chain length that triggers a grow
const MAX_LOAD: usize = 2;

/// Chained hash table with power-of-two buckets
///
/// Chains are sorted by field hash and buckets are picked from the high hash
/// bits, so the bucket-by-bucket walk order does not change on resize.
#[derive(Debug, Clone)]
pub struct BucketTable {
    buckets: Vec<Chain>,
    len: usize,
}

impl BucketTable {
    pub fn new() -> Self {
        BucketTable {
            buckets: vec![Chain::default(); MIN_BUCKETS],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn chain(&self, hash: u64) -> &Chain {
        &self.buckets[bucket_index(hash, self.buckets.len())]
    }

    fn chain_mut(&mut self, hash: u64) -> &mut Chain {
        let bucket = bucket_index(hash, self.buckets.len());
        &mut self.buckets[bucket]
    }

    pub fn get(&self, field: &[u8]) -> Option<&Bytes> {
        let hash = hash_field(field);
        self.chain(hash).get(hash, field)
    }

    /// Insert or overwrite. Returns the previous value.
    pub fn insert(&mut self, field: Bytes, value: Bytes) -> Option<Bytes> {
        let hash = hash_field(&field);
        let previous = self.chain_mut(hash).insert(hash, field, value);
        if previous.is_none() {
            self.len += 1;
            if self.len > self.buckets.len() * MAX_LOAD {
                self.resize(self.buckets.len() * 2);
            }
        }
        previous
    }

    pub fn remove(&mut self, field: &[u8]) -> Option<Bytes> {
        let hash = hash_field(field);
        let value = self.chain_mut(hash).remove(hash, field)?;
        self.len -= 1;
        if self.buckets.len() > MIN_BUCKETS && self.len < self.buckets.len() / 8 {
            self.resize(self.buckets.len() / 2);
        }
        Some(value)
    }

    // The old chains, concatenated, are already in hash order; appending in
    // that order keeps every new chain sorted.
    fn resize(&mut self, buckets: usize) {
        let old = std::mem::replace(&mut self.buckets, vec![Chain::default(); buckets]);
        for slot in old.into_iter().flat_map(Chain::into_slots) {
            let bucket = bucket_index(slot.hash, buckets);
            self.buckets[bucket].push_back(slot);
        }
    }

    /// Entries in `bucket`; 0 past the last bucket
    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets.get(bucket).map_or(0, Chain::len)
    }

    /// Append up to `limit` entries of `bucket` to `out`, skipping the first
    /// `skip`
    pub fn read_bucket(
        &self,
        bucket: usize,
        skip: usize,
        limit: usize,
        out: &mut Vec<(Bytes, Bytes)>,
    ) -> usize {
        self.buckets
            .get(bucket)
            .map_or(0, |chain| chain.read(skip, limit, out))
    }
}

impl Default for BucketTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive engine
///
/// `table` is the per-key lock. Do not call [`StorageBackend::len`] while a
/// handle from `open` is alive: both take this mutex, which is not reentrant.
#[derive(Debug, Default)]
pub struct ExclusiveBackend {
    table: Mutex<BucketTable>,
}

impl ExclusiveBackend {
    pub fn new() -> Self {
        ExclusiveBackend::default()
    }
}

impl StorageBackend for ExclusiveBackend {
    fn kind(&self) -> &'static str {
        "exclusive"
    }

    fn open(&self, _scope: Scope) -> Box<dyn FieldTable + '_> {
        Box::new(ExclusiveTable {
            table: self.table.lock(),
        })
    }

    fn len(&self) -> usize {
        self.table.lock().len()
    }
}

/// The locked table for the duration of one command
struct ExclusiveTable<'a> {
    table: MutexGuard<'a, BucketTable>,
}

impl FieldTable for ExclusiveTable<'_> {
    fn lookup(&self, field: &[u8]) -> Option<FieldRef<'_>> {
        self.table.get(field).map(FieldRef::Borrowed)
    }

    fn upsert(&mut self, field: Bytes, value: Bytes) -> bool {
        self.table.insert(field, value).is_some()
    }

    fn upsert_if_absent(&mut self, field: Bytes, value: Bytes) -> bool {
        if self.table.get(&field).is_some() {
            return false;
        }
        self.table.insert(field, value);
        true
    }

    fn update(
        &mut self,
        field: Bytes,
        apply: &mut dyn FnMut(Option<&Bytes>) -> HashResult<Bytes>,
    ) -> HashResult<Bytes> {
        let next = apply(self.table.get(&field))?;
        self.table.insert(field, next.clone());
        Ok(next)
    }

    fn remove(&mut self, field: &[u8]) -> bool {
        self.table.remove(field).is_some()
    }

    fn len(&self) -> usize {
        self.table.len()
    }

    fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    fn bucket_len(&self, bucket: usize) -> usize {
        self.table.bucket_len(bucket)
    }

    fn read_bucket(
        &self,
        bucket: usize,
        skip: usize,
        limit: usize,
        out: &mut Vec<(Bytes, Bytes)>,
    ) -> usize {
        self.table.read_bucket(bucket, skip, limit, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(i: usize) -> Bytes {
        Bytes::from(format!("field:{}", i))
    }

    #[test]
    fn test_insert_get_remove() {
        let mut table = BucketTable::new();
        assert_eq!(table.insert(field(1), Bytes::from("a")), None);
        assert_eq!(table.insert(field(1), Bytes::from("b")), Some(Bytes::from("a")));
        assert_eq!(table.get(&field(1)), Some(&Bytes::from("b")));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove(&field(1)), Some(Bytes::from("b")));
        assert_eq!(table.remove(&field(1)), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_grows_and_shrinks() {
        let mut table = BucketTable::new();
        for i in 0..1000 {
            table.insert(field(i), Bytes::from(i.to_string()));
        }
        assert_eq!(table.len(), 1000);
        assert!(table.bucket_count() >= 1000 / MAX_LOAD);
        assert!(table.bucket_count().is_power_of_two());
        for i in 0..1000 {
            assert_eq!(table.get(&field(i)), Some(&Bytes::from(i.to_string())));
        }

        let grown = table.bucket_count();
        for i in 0..990 {
            table.remove(&field(i));
        }
        assert!(table.bucket_count() < grown);
        assert!(table.bucket_count() >= MIN_BUCKETS);
        for i in 990..1000 {
            assert!(table.get(&field(i)).is_some());
        }
    }

    #[test]
    fn test_bucket_sizes_add_up() {
        let mut table = BucketTable::new();
        for i in 0..100 {
            table.insert(field(i), Bytes::new());
        }
        let total: usize = (0..table.bucket_count()).map(|b| table.bucket_len(b)).sum();
        assert_eq!(total, 100);
        assert_eq!(table.bucket_len(table.bucket_count()), 0);
    }

    fn walk(table: &BucketTable) -> Vec<Bytes> {
        let mut out = Vec::new();
        for bucket in 0..table.bucket_count() {
            table.read_bucket(bucket, 0, usize::MAX, &mut out);
        }
        out.into_iter().map(|(f, _)| f).collect()
    }

    #[test]
    fn test_walk_order_survives_resize() {
        let mut table = BucketTable::new();
        for i in 0..16 {
            table.insert(field(i), Bytes::new());
        }
        let before = walk(&table);
        let buckets = table.bucket_count();

        for i in 16..200 {
            table.insert(field(i), Bytes::new());
        }
        assert!(table.bucket_count() > buckets);
        let after: Vec<Bytes> = walk(&table).into_iter().filter(|f| before.contains(f)).collect();
        assert_eq!(after, before);

        let hashes: Vec<u64> = walk(&table).iter().map(|f| hash_field(f)).collect();
        assert!(hashes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_update_failure_writes_nothing() {
        let backend = ExclusiveBackend::new();
        let mut table = backend.open(Scope::Field);
        table.upsert(Bytes::from("n"), Bytes::from("abc"));

        let result = table.update(Bytes::from("n"), &mut |_| Err(crate::error::HashError::NotANumber));
        assert_eq!(result, Err(crate::error::HashError::NotANumber));
        assert_eq!(table.lookup(b"n").as_deref(), Some(&Bytes::from("abc")));
    }
}
