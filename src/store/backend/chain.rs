//! Hash-ordered bucket chain shared by both engines
//!
//! Entries are kept sorted by `(hash, field)`. Buckets are picked from the
//! high hash bits (see [`bucket_index`](super::bucket_index)), so walking the
//! buckets in order visits every entry in ascending hash order whatever the
//! bucket count. An insert lands at its hash position instead of the tail of
//! a walk, and a resize leaves the global order untouched.

use bytes::Bytes;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub(super) hash: u64,
    pub(super) field: Bytes,
    pub(super) value: Bytes,
}

#[derive(Debug, Clone, Default)]
pub(super) struct Chain {
    slots: Vec<Slot>,
}

impl Chain {
    pub(super) fn len(&self) -> usize {
        self.slots.len()
    }

    fn search(&self, hash: u64, field: &[u8]) -> Result<usize, usize> {
        self.slots.binary_search_by(|slot| match slot.hash.cmp(&hash) {
            Ordering::Equal => slot.field.as_ref().cmp(field),
            other => other,
        })
    }

    pub(super) fn get(&self, hash: u64, field: &[u8]) -> Option<&Bytes> {
        let index = self.search(hash, field).ok()?;
        Some(&self.slots[index].value)
    }

    /// Insert or overwrite. Returns the previous value.
    pub(super) fn insert(&mut self, hash: u64, field: Bytes, value: Bytes) -> Option<Bytes> {
        match self.search(hash, &field) {
            Ok(index) => Some(std::mem::replace(&mut self.slots[index].value, value)),
            Err(index) => {
                self.slots.insert(index, Slot { hash, field, value });
                None
            }
        }
    }

    pub(super) fn remove(&mut self, hash: u64, field: &[u8]) -> Option<Bytes> {
        let index = self.search(hash, field).ok()?;
        Some(self.slots.remove(index).value)
    }

    /// Append up to `limit` entries to `out`, skipping the first `skip`
    pub(super) fn read(&self, skip: usize, limit: usize, out: &mut Vec<(Bytes, Bytes)>) -> usize {
        let before = out.len();
        out.extend(
            self.slots
                .iter()
                .skip(skip)
                .take(limit)
                .map(|slot| (slot.field.clone(), slot.value.clone())),
        );
        out.len() - before
    }

    pub(super) fn into_slots(self) -> Vec<Slot> {
        self.slots
    }

    /// Append a slot that sorts after every slot already in the chain
    pub(super) fn push_back(&mut self, slot: Slot) {
        debug_assert!(self
            .slots
            .last()
            .map_or(true, |last| (last.hash, &last.field) < (slot.hash, &slot.field)));
        self.slots.push(slot);
    }
}
