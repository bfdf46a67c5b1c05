//! Content-addressed store of encoded tables
//!
//! Functions whose encoded tables are byte-identical share one stored copy.
//! The first function to register a byte string owns it; later ones get the
//! same [`TableId`] back and add nothing to the stored size.
//!
//! Bytes live once, in a single pool. The index maps a content hash to the
//! entries carrying that hash and is always confirmed against the pool.

use ahash::RandomState;
use std::collections::HashMap;

/// Handle to a table stored in a [`TableArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u32);

impl TableId {
    /// Position of the table in registration order
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct TableEntry {
    offset: usize,
    len: usize,
    owner: String,
}

/// Deduplicating arena of canonical table encodings
#[derive(Debug, Clone, Default)]
pub struct TableArena {
    pool: Vec<u8>,
    entries: Vec<TableEntry>,
    index: HashMap<u64, Vec<TableId>, RandomState>,
    hasher: RandomState,
    lookups: usize,
}

impl TableArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `encoded` on behalf of `owner`.
    ///
    /// Returns the table's id and whether this call stored it. Lookup and
    /// insertion are one step; a concurrent version would need the same
    /// insert-if-absent atomicity.
    pub fn intern(&mut self, encoded: &[u8], owner: &str) -> (TableId, bool) {
        self.lookups += 1;
        let hash = self.hasher.hash_one(encoded);
        let bucket = self.index.entry(hash).or_default();
        for &id in bucket.iter() {
            let entry = &self.entries[id.index()];
            if &self.pool[entry.offset..entry.offset + entry.len] == encoded {
                return (id, false);
            }
        }

        let id = TableId(self.entries.len() as u32);
        self.entries.push(TableEntry {
            offset: self.pool.len(),
            len: encoded.len(),
            owner: owner.to_string(),
        });
        self.pool.extend_from_slice(encoded);
        bucket.push(id);
        (id, true)
    }

    /// Canonical bytes behind `id`
    pub fn get(&self, id: TableId) -> Option<&[u8]> {
        self.entries
            .get(id.index())
            .map(|e| &self.pool[e.offset..e.offset + e.len])
    }

    /// Function that first registered `id`
    pub fn owner(&self, id: TableId) -> Option<&str> {
        self.entries.get(id.index()).map(|e| e.owner.as_str())
    }

    /// Number of distinct tables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes of all distinct tables
    pub fn stored_bytes(&self) -> usize {
        self.pool.len()
    }

    /// Number of registrations that found an existing table
    pub fn hits(&self) -> usize {
        self.lookups - self.entries.len()
    }
}
