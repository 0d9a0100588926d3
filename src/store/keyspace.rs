//! Key table
//!
//! Resolves a key name to its typed container and enforces one type per key.
//! The table is split into shards, each behind its own lock, and a lookup
//! only holds the shard lock long enough to clone the container handle out.
//! Work on a hash then happens against its storage engine, outside any
//! keyspace lock.

use super::backend::{BackendKind, HashObject};
use super::router::ShardRouter;
use super::value::Value;
use crate::error::{HashError, HashResult};
use bytes::Bytes;
use parking_lot::RwLock;
use siphasher::sip::SipHasher13;
use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use tracing::debug;

type ShardMap = HashMap<Bytes, Value, BuildHasherDefault<SipHasher13>>;

/// Sharded key table
#[derive(Debug)]
pub struct Keyspace {
    shards: Vec<RwLock<ShardMap>>,
    router: ShardRouter,
    backend: BackendKind,
}

impl Keyspace {
    /// Create a key table whose new hashes use `backend`
    pub fn new(num_shards: usize, backend: BackendKind) -> Self {
        let router = ShardRouter::new(num_shards);
        let shards = (0..router.num_shards())
            .map(|_| RwLock::new(ShardMap::default()))
            .collect();
        Keyspace {
            shards,
            router,
            backend,
        }
    }

    fn shard(&self, key: &[u8]) -> &RwLock<ShardMap> {
        &self.shards[self.router.route_key(key)]
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Resolve an existing hash
    ///
    /// `NotExist` when the key is absent, `WrongType` when it holds another type.
    pub fn get_hash(&self, key: &[u8]) -> HashResult<HashObject> {
        match self.shard(key).read().get(key) {
            Some(Value::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(HashError::WrongType),
            None => Err(HashError::NotExist),
        }
    }

    /// Resolve a hash, creating an empty one when the key is absent
    pub fn get_or_create_hash(&self, key: &Bytes) -> HashResult<HashObject> {
        match self.get_hash(key) {
            Err(HashError::NotExist) => {}
            other => return other,
        }

        let mut shard = self.shard(key).write();
        // Another writer may have created the key between the two locks.
        let value = shard.entry(key.clone()).or_insert_with(|| {
            debug!(key = ?key, backend = self.backend.name(), "creating hash");
            Value::Hash(self.backend.create())
        });
        value.as_hash().cloned().ok_or(HashError::WrongType)
    }

    /// Set a string value, replacing whatever the key held
    pub fn set(&self, key: Bytes, value: Value) -> bool {
        self.shard(&key).write().insert(key, value).is_none()
    }

    /// Clone out the value held by a key
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.shard(key).read().get(key).cloned()
    }

    /// Delete a key, returns true if it existed
    pub fn delete(&self, key: &[u8]) -> bool {
        self.shard(key).write().remove(key).is_some()
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Type name of a key, `none` when absent
    pub fn type_of(&self, key: &[u8]) -> &'static str {
        self.shard(key).read().get(key).map_or("none", Value::type_name)
    }

    /// Remove all keys
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> KeyspaceStats {
        let mut stats = KeyspaceStats {
            shards: self.shards.len(),
            ..KeyspaceStats::default()
        };
        for shard in &self.shards {
            for value in shard.read().values() {
                stats.keys += 1;
                if let Value::Hash(hash) = value {
                    stats.hashes += 1;
                    stats.hash_fields += hash.len();
                }
            }
        }
        stats
    }
}

/// Statistics about the key table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyspaceStats {
    pub shards: usize,
    pub keys: usize,
    pub hashes: usize,
    pub hash_fields: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::Scope;

    fn keyspace() -> Keyspace {
        Keyspace::new(4, BackendKind::Exclusive)
    }

    #[test]
    fn test_get_hash_missing_and_wrong_type() {
        let ks = keyspace();
        assert_eq!(ks.get_hash(b"h").unwrap_err(), HashError::NotExist);

        ks.set(Bytes::from("s"), Value::string("text"));
        assert_eq!(ks.get_hash(b"s").unwrap_err(), HashError::WrongType);
        assert_eq!(
            ks.get_or_create_hash(&Bytes::from("s")).unwrap_err(),
            HashError::WrongType
        );
    }

    #[test]
    fn test_get_or_create_returns_same_hash() {
        let ks = keyspace();
        let key = Bytes::from("h");
        let first = ks.get_or_create_hash(&key).unwrap();
        first.open(Scope::Field).upsert(Bytes::from("f"), Bytes::from("v"));

        let second = ks.get_or_create_hash(&key).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(ks.type_of(b"h"), "hash");
        assert_eq!(ks.len(), 1);
    }

    #[test]
    fn test_delete_destroys_hash() {
        let ks = keyspace();
        let key = Bytes::from("h");
        ks.get_or_create_hash(&key)
            .unwrap()
            .open(Scope::Field)
            .upsert(Bytes::from("f"), Bytes::from("v"));

        assert!(ks.delete(b"h"));
        assert!(!ks.exists(b"h"));
        assert_eq!(ks.get_or_create_hash(&key).unwrap().len(), 0);
    }

    #[test]
    fn test_stats() {
        let ks = Keyspace::new(2, BackendKind::Concurrent { segments: 4 });
        ks.set(Bytes::from("s"), Value::string("x"));
        let hash = ks.get_or_create_hash(&Bytes::from("h")).unwrap();
        {
            let mut table = hash.open(Scope::Batch);
            table.upsert(Bytes::from("a"), Bytes::from("1"));
            table.upsert(Bytes::from("b"), Bytes::from("2"));
        }
        assert_eq!(
            ks.stats(),
            KeyspaceStats {
                shards: 2,
                keys: 2,
                hashes: 1,
                hash_fields: 2,
            }
        );

        ks.clear();
        assert!(ks.is_empty());
    }
}
