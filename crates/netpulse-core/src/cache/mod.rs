//! Memoizing lookup caches.
//!
//! A [`LookupCache`] pairs a map with a [`Resolve`] implementation. The
//! resolver runs at most once per distinct key; whatever it returns,
//! including a "could not resolve" sentinel, is stored and served from
//! memory afterwards. Entries are never evicted for the life of the cache.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

mod dns;
mod service;

pub use dns::{HostnameCache, SystemDnsResolver};
pub use service::{PortTable, PortTableError, ServiceCache, UNKNOWN_SERVICE};

/// Produces the value for a key on a cache miss. Must not fail: failures
/// are expressed as a sentinel value.
pub trait Resolve<K, V> {
    fn resolve(&mut self, key: &K) -> V;
}

impl<K, V, F> Resolve<K, V> for F
where
    F: FnMut(&K) -> V,
{
    fn resolve(&mut self, key: &K) -> V {
        self(key)
    }
}

#[derive(Debug)]
pub struct LookupCache<K, V, R> {
    entries: HashMap<K, V>,
    resolver: R,
}

impl<K, V, R> LookupCache<K, V, R>
where
    K: Eq + Hash,
    R: Resolve<K, V>,
{
    pub fn new(resolver: R) -> Self {
        Self {
            entries: HashMap::new(),
            resolver,
        }
    }

    /// Return the cached value for `key`, resolving and storing it first on a
    /// miss.
    pub fn get(&mut self, key: K) -> &V {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = self.resolver.resolve(entry.key());
                entry.insert(value)
            }
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }
}
