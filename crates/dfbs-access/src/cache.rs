//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
//! Single-entry snapshot caches for effective permissions and the allowlist flag.
//!
//! Each cache holds at most one entry. A lookup only succeeds for the exact key the entry
//! was stored under, so switching identity behaves like a fresh miss. Entries never
//! expire; they are replaced whole or removed by [`SnapshotCache::clear`].
//!
//! Fetches go through [`SnapshotCache::begin_fetch`] / [`SnapshotCache::complete`]. A
//! completion is dropped when the cache was cleared after the ticket was issued, or when
//! a newer write already landed, so a slow response can neither resurrect data after
//! logout nor overwrite fresher data.
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dfbs_session::{IdentityContext, UserId};
use parking_lot::RwLock;

/// Set of effective permission keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    keys: HashSet<String>,
}

impl PermissionSet {
    /// Empty set (deny everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is granted. The key is trimmed; blank keys never match.
    pub fn contains(&self, key: &str) -> bool {
        let key = key.trim();
        !key.is_empty() && self.keys.contains(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set grants nothing.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate the keys in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Keys in sorted order, for display.
    pub fn sorted(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.iter().collect();
        keys.sort_unstable();
        keys
    }
}

impl<S: AsRef<str>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let keys = iter
            .into_iter()
            .map(|key| key.as_ref().trim().to_owned())
            .filter(|key| !key.is_empty())
            .collect();
        Self { keys }
    }
}

/// Receipt for an in-flight fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket<K> {
    key: K,
    sequence: u64,
    epoch: u64,
}

impl<K> FetchTicket<K> {
    /// Key the fetch was issued for.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Monotonic write sequence reserved by the fetch.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Cache epoch at the time the fetch began.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    sequence: u64,
}

#[derive(Debug)]
struct Slot<K, V> {
    entry: Option<Entry<K, V>>,
    epoch: u64,
    next_sequence: u64,
}

impl<K, V> Default for Slot<K, V> {
    fn default() -> Self {
        Self {
            entry: None,
            epoch: 0,
            next_sequence: 1,
        }
    }
}

impl<K, V> Slot<K, V> {
    fn reserve(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

/// Cloneable handle to a single-entry cache.
pub struct SnapshotCache<K, V> {
    slot: Arc<RwLock<Slot<K, V>>>,
}

impl<K, V> Clone for SnapshotCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<K, V> Default for SnapshotCache<K, V> {
    fn default() -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot::default())),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for SnapshotCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("SnapshotCache")
            .field("key", &slot.entry.as_ref().map(|entry| &entry.key))
            .field("epoch", &slot.epoch)
            .finish()
    }
}

impl<K, V> SnapshotCache<K, V>
where
    K: Clone + Eq,
    V: Clone,
{
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for exactly `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.slot
            .read()
            .entry
            .as_ref()
            .filter(|entry| &entry.key == key)
            .map(|entry| entry.value.clone())
    }

    /// Replace any entry with `value` under `key`.
    pub fn set(&self, key: K, value: V) {
        let mut slot = self.slot.write();
        let sequence = slot.reserve();
        slot.entry = Some(Entry {
            key,
            value,
            sequence,
        });
    }

    /// Remove the entry and invalidate all outstanding tickets.
    pub fn clear(&self) {
        let mut slot = self.slot.write();
        slot.entry = None;
        slot.epoch += 1;
    }

    /// Reserve a write for a fetch of `key`.
    pub fn begin_fetch(&self, key: K) -> FetchTicket<K> {
        let mut slot = self.slot.write();
        let sequence = slot.reserve();
        FetchTicket {
            key,
            sequence,
            epoch: slot.epoch,
        }
    }

    /// Store a fetch result unless the ticket is stale. Returns whether it was stored.
    pub fn complete(&self, ticket: FetchTicket<K>, value: V) -> bool {
        let mut slot = self.slot.write();
        if ticket.epoch != slot.epoch {
            return false;
        }
        if let Some(entry) = &slot.entry {
            if entry.sequence > ticket.sequence {
                return false;
            }
        }
        slot.entry = Some(Entry {
            key: ticket.key,
            value,
            sequence: ticket.sequence,
        });
        true
    }

    /// Key of the current entry.
    pub fn key(&self) -> Option<K> {
        self.slot.read().entry.as_ref().map(|entry| entry.key.clone())
    }

    /// Whether no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.slot.read().entry.is_none()
    }

    /// Number of clears so far.
    pub fn epoch(&self) -> u64 {
        self.slot.read().epoch
    }
}

/// Effective permissions of the active identity context.
pub type PermissionCache = SnapshotCache<IdentityContext, PermissionSet>;

/// Allowlist membership of the logged-in user.
pub type AllowFlagCache = SnapshotCache<UserId, bool>;
