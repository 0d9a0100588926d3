//! Key to keyspace-shard routing
//!
//! Keys are spread over shards with SipHash-1-3, so unrelated keys rarely
//! contend on the same shard lock.

use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Routes keys to shards
#[derive(Debug, Clone)]
pub struct ShardRouter {
    num_shards: usize,
}

impl ShardRouter {
    /// `num_shards` of 0 is raised to 1
    pub fn new(num_shards: usize) -> Self {
        ShardRouter {
            num_shards: num_shards.max(1),
        }
    }

    /// Shard index for `key`
    pub fn route_key(&self, key: &[u8]) -> usize {
        let mut hasher = SipHasher13::new();
        hasher.write(key);
        (hasher.finish() as usize) % self.num_shards
    }

    pub fn num_shards(&self) -> usize {
        self.num_shards
    }
}
