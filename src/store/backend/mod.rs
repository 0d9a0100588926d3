//! Storage engines for the hash type
//!
//! A hash key holds an [`HashObject`], a shared handle to one
//! [`StorageBackend`]. Commands never touch the table directly: they call
//! [`StorageBackend::open`] with the [`Scope`] they need and work through the
//! returned [`FieldTable`]. Dropping that handle releases every lock the scope
//! took, on every exit path.
//!
//! Two engines implement the contract:
//! - [`ExclusiveBackend`]: a plain bucketed table guarded by one key-wide
//!   lock, held for the whole command.
//! - [`ConcurrentBackend`]: independently locked buckets, safe for
//!   unsynchronized callers on the same key.

mod chain;
mod concurrent;
mod exclusive;

pub use concurrent::ConcurrentBackend;
pub use exclusive::{BucketTable, ExclusiveBackend};

use super::scan::{self, Page};
use crate::error::HashResult;
use bytes::Bytes;
use parking_lot::MappedRwLockReadGuard;
use serde::Deserialize;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault};
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;
use siphasher::sip::SipHasher13;

/// Shared handle to the engine backing one hash key
pub type HashObject = Arc<dyn StorageBackend>;

/// Hasher used for bucket placement in both engines
pub(crate) type FieldHasher = BuildHasherDefault<SipHasher13>;

pub(crate) fn hash_field(field: &[u8]) -> u64 {
    FieldHasher::default().hash_one(field)
}

/// Bucket for `hash` among `buckets` (a power of two), taken from the high
/// bits. Doubling the count splits bucket `i` into `2i` and `2i + 1`.
pub(crate) fn bucket_index(hash: u64, buckets: usize) -> usize {
    hash.checked_shr(64 - buckets.trailing_zeros()).unwrap_or(0) as usize
}

/// What a command is about to do with the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// One field lookup or mutation
    Field,
    /// A read over many fields (get-all, list, scan page)
    Read,
    /// A write of many fields that must become visible all at once
    Batch,
}

/// A storage engine for one hash
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Engine name, reported by INFO
    fn kind(&self) -> &'static str;

    /// Open the table for one command
    fn open(&self, scope: Scope) -> Box<dyn FieldTable + '_>;

    /// Number of fields, without opening a scope
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Command-scoped access to a field table
///
/// Buckets are numbered `0..bucket_count()`; the numbering is only stable for
/// as long as the table is not resized. Walking the buckets in order visits
/// entries in ascending field-hash order in both engines.
pub trait FieldTable {
    /// Look up a field. The returned token may hold a bucket lock until dropped.
    fn lookup(&self, field: &[u8]) -> Option<FieldRef<'_>>;

    /// Insert or overwrite. Returns whether the field existed before.
    fn upsert(&mut self, field: Bytes, value: Bytes) -> bool;

    /// Insert only when absent. Returns whether the field was inserted.
    fn upsert_if_absent(&mut self, field: Bytes, value: Bytes) -> bool;

    /// Read-modify-write one field under a single lock acquisition.
    ///
    /// `apply` sees the current value (if any) and returns the value to store.
    /// When it fails nothing is written.
    fn update(
        &mut self,
        field: Bytes,
        apply: &mut dyn FnMut(Option<&Bytes>) -> HashResult<Bytes>,
    ) -> HashResult<Bytes>;

    /// Remove a field. Returns whether it existed.
    fn remove(&mut self, field: &[u8]) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_count(&self) -> usize;

    fn bucket_len(&self, bucket: usize) -> usize;

    /// Append up to `limit` entries of `bucket` to `out`, skipping the first
    /// `skip`. Returns how many were appended.
    fn read_bucket(
        &self,
        bucket: usize,
        skip: usize,
        limit: usize,
        out: &mut Vec<(Bytes, Bytes)>,
    ) -> usize;

    /// Read one page starting at an engine-private `position`.
    /// A returned position of 0 means the walk is complete.
    fn iterate_from(&self, position: u64, limit: usize) -> Page {
        scan::scan(self, position, limit)
    }

    /// Every entry, bucket by bucket
    fn entries(&self) -> Vec<(Bytes, Bytes)> {
        let mut out = Vec::with_capacity(self.len());
        for bucket in 0..self.bucket_count() {
            self.read_bucket(bucket, 0, usize::MAX, &mut out);
        }
        out
    }
}

/// Borrowed value token returned by [`FieldTable::lookup`]
///
/// For the concurrent engine it keeps the bucket read lock until dropped.
pub enum FieldRef<'a> {
    Borrowed(&'a Bytes),
    Locked(MappedRwLockReadGuard<'a, Bytes>),
}

impl Deref for FieldRef<'_> {
    type Target = Bytes;

    fn deref(&self) -> &Bytes {
        match self {
            FieldRef::Borrowed(value) => value,
            FieldRef::Locked(guard) => guard,
        }
    }
}

impl fmt::Debug for FieldRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldRef").field(&**self).finish()
    }
}

/// Which engine new hashes are created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendKind {
    Exclusive,
    Concurrent {
        #[serde(default = "default_segments")]
        segments: usize,
    },
}

pub const DEFAULT_SEGMENTS: usize = 64;

fn default_segments() -> usize {
    DEFAULT_SEGMENTS
}

impl BackendKind {
    /// Create an empty engine of this kind
    pub fn create(&self) -> HashObject {
        match *self {
            BackendKind::Exclusive => Arc::new(ExclusiveBackend::new()),
            BackendKind::Concurrent { segments } => Arc::new(ConcurrentBackend::new(segments)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Exclusive => "exclusive",
            BackendKind::Concurrent { .. } => "concurrent",
        }
    }

    /// Reject layouts the engines cannot use
    pub fn validate(&self) -> anyhow::Result<()> {
        if let BackendKind::Concurrent { segments } = *self {
            if segments == 0 || !segments.is_power_of_two() {
                anyhow::bail!("segments must be a non-zero power of two, got {}", segments);
            }
        }
        Ok(())
    }
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Concurrent { segments: DEFAULT_SEGMENTS }
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exclusive" => Ok(BackendKind::Exclusive),
            "concurrent" => Ok(BackendKind::default()),
            other => anyhow::bail!("unknown backend '{}'", other),
        }
    }
}
