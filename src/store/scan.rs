//! Incremental cursor scan over a bucketed field table
//!
//! The cursor is an absolute element offset into the table's current bucket
//! layout: buckets are walked in ascending order and the offset is spent
//! bucket by bucket until it lands inside one. Collection resumes there and
//! spills into the following non-empty buckets until `count` entries are
//! taken or the table runs out.
//!
//! Both engines walk their buckets in ascending field-hash order, and that
//! order does not depend on the bucket count. Guarantees:
//! - with no mutation, one full cycle (cursor 0 until cursor 0 comes back)
//!   returns every field exactly once;
//! - inserts, including ones that resize the table, only shift later
//!   offsets forward: a field present for the whole cycle may be repeated
//!   but is never skipped;
//! - a removal behind the cursor shifts offsets back and can skip a field
//!   in that cycle; fields added or removed mid-cycle may or may not appear;
//! - every call that does not finish the cycle advances the cursor by at
//!   least one, and a cursor past the end finishes the cycle, so a cycle
//!   always terminates.
//!
//! The offset encoding is private to this module and the engines using it;
//! callers pass the number back verbatim.

use super::backend::FieldTable;
use bytes::Bytes;

/// One page of a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<(Bytes, Bytes)>,
    /// Cursor for the next call; 0 once the cycle is complete
    pub next: u64,
}

impl Page {
    fn finished(entries: Vec<(Bytes, Bytes)>) -> Self {
        Page { entries, next: 0 }
    }

    pub fn is_finished(&self) -> bool {
        self.next == 0
    }
}

/// Read the page starting at `cursor`, taking at most `count` entries
/// (a `count` of 0 is treated as 1).
pub fn scan<T: FieldTable + ?Sized>(table: &T, cursor: u64, count: usize) -> Page {
    if table.is_empty() {
        return Page::finished(Vec::new());
    }
    let count = count.max(1);
    let buckets = table.bucket_count();

    // Spend the offset to find the resume point. Running off the end means
    // the table shrank below the cursor since the previous call.
    let Ok(mut skip) = usize::try_from(cursor) else {
        return Page::finished(Vec::new());
    };
    let mut bucket = 0;
    loop {
        if bucket >= buckets {
            return Page::finished(Vec::new());
        }
        let len = table.bucket_len(bucket);
        if skip < len {
            break;
        }
        skip -= len;
        bucket += 1;
    }

    let mut entries = Vec::with_capacity(count.min(table.len()));
    while entries.len() < count && bucket < buckets {
        let want = count - entries.len();
        let got = table.read_bucket(bucket, skip, want, &mut entries);
        if got < want {
            bucket += 1;
            skip = 0;
        } else {
            skip += got;
        }
    }

    if exhausted(table, bucket, skip) {
        return Page::finished(entries);
    }
    Page {
        next: cursor + entries.len() as u64,
        entries,
    }
}

/// No entry left at or after `skip` in `bucket`, nor in any later bucket
fn exhausted<T: FieldTable + ?Sized>(table: &T, bucket: usize, skip: usize) -> bool {
    let buckets = table.bucket_count();
    if bucket >= buckets {
        return true;
    }
    table.bucket_len(bucket) <= skip && (bucket + 1..buckets).all(|b| table.bucket_len(b) == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::{BackendKind, HashObject, Scope};
    use std::collections::HashMap;

    fn backends() -> Vec<HashObject> {
        vec![
            BackendKind::Exclusive.create(),
            BackendKind::Concurrent { segments: 8 }.create(),
            BackendKind::Concurrent { segments: 1 }.create(),
        ]
    }

    fn fill(backend: &HashObject, n: usize) {
        let mut table = backend.open(Scope::Batch);
        for i in 0..n {
            table.upsert(Bytes::from(format!("f{}", i)), Bytes::from(format!("v{}", i)));
        }
    }

    fn scan_page(backend: &HashObject, cursor: u64, count: usize) -> Page {
        backend.open(Scope::Read).iterate_from(cursor, count)
    }

    #[test]
    fn test_empty_table_finishes_immediately() {
        for backend in backends() {
            let page = scan_page(&backend, 0, 10);
            assert!(page.entries.is_empty());
            assert!(page.is_finished());

            let page = scan_page(&backend, 42, 10);
            assert!(page.entries.is_empty());
            assert!(page.is_finished());
        }
    }

    #[test]
    fn test_full_cycle_returns_each_field_once() {
        for backend in backends() {
            fill(&backend, 157);
            for count in [1, 2, 7, 10, 156, 157, 1000] {
                let mut seen: HashMap<Bytes, usize> = HashMap::new();
                let mut cursor = 0;
                let mut calls = 0;
                loop {
                    let page = scan_page(&backend, cursor, count);
                    assert!(page.entries.len() <= count);
                    for (field, value) in page.entries {
                        assert_eq!(&value[1..], &field[1..]);
                        *seen.entry(field).or_default() += 1;
                    }
                    calls += 1;
                    if page.next == 0 {
                        break;
                    }
                    cursor = page.next;
                }
                assert_eq!(seen.len(), 157, "{} count={}", backend.kind(), count);
                assert!(seen.values().all(|&n| n == 1));
                assert_eq!(calls, (157 + count - 1) / count);
            }
        }
    }

    #[test]
    fn test_last_page_ending_exactly_at_the_end_returns_zero() {
        for backend in backends() {
            fill(&backend, 10);
            let first = scan_page(&backend, 0, 5);
            assert_eq!(first.entries.len(), 5);
            assert_eq!(first.next, 5);
            let second = scan_page(&backend, first.next, 5);
            assert_eq!(second.entries.len(), 5);
            assert!(second.is_finished());
        }
    }

    #[test]
    fn test_cursor_past_end_finishes_cycle() {
        for backend in backends() {
            fill(&backend, 20);
            let page = scan_page(&backend, 20, 5);
            assert!(page.entries.is_empty());
            assert!(page.is_finished());
            let page = scan_page(&backend, u64::MAX, 5);
            assert!(page.is_finished());
        }
    }

    #[test]
    fn test_shrink_between_calls_ends_cycle() {
        for backend in backends() {
            fill(&backend, 100);
            let page = scan_page(&backend, 0, 80);
            assert_eq!(page.next, 80);
            {
                let mut table = backend.open(Scope::Field);
                for i in 0..90 {
                    table.remove(format!("f{}", i).as_bytes());
                }
            }
            let page = scan_page(&backend, 80, 10);
            assert!(page.entries.is_empty());
            assert!(page.is_finished());
        }
    }

    #[test]
    fn test_cycle_terminates_under_mutation() {
        for backend in backends() {
            fill(&backend, 200);
            let mut cursor = 0;
            let mut calls = 0;
            let mut next_field = 200;
            loop {
                let page = scan_page(&backend, cursor, 10);
                calls += 1;
                {
                    let mut table = backend.open(Scope::Field);
                    // Grow by two and drop one per call: the table keeps moving.
                    for _ in 0..2 {
                        table.upsert(Bytes::from(format!("f{}", next_field)), Bytes::new());
                        next_field += 1;
                    }
                    table.remove(format!("f{}", calls).as_bytes());
                }
                if page.is_finished() {
                    break;
                }
                assert!(page.next > cursor);
                cursor = page.next;
                assert!(calls < 1000, "scan did not terminate");
            }
            // 200 fields, net +1 per call, 10 per page
            assert!(calls <= 25, "{} took {} calls", backend.kind(), calls);
        }
    }

    #[test]
    fn test_stable_fields_survive_inserts() {
        for backend in backends() {
            fill(&backend, 50);
            let mut seen = std::collections::HashSet::new();
            let mut cursor = 0;
            let mut extra = 0;
            loop {
                let page = scan_page(&backend, cursor, 5);
                let done = page.is_finished();
                let next = page.next;
                seen.extend(page.entries.into_iter().map(|(f, _)| f));
                if done {
                    break;
                }
                cursor = next;
                // Three inserts per page push the exclusive table through a resize.
                let mut table = backend.open(Scope::Field);
                for _ in 0..3 {
                    table.upsert(Bytes::from(format!("extra{}", extra)), Bytes::new());
                    extra += 1;
                }
            }
            assert!(extra > 20, "{} finished after {} inserts", backend.kind(), extra);
            for i in 0..50 {
                assert!(
                    seen.contains(&Bytes::from(format!("f{}", i))),
                    "{} skipped f{}",
                    backend.kind(),
                    i
                );
            }
        }
    }
}
