//! Containment index
//!
//! [`ContainmentIndex`] stores labelled prefixes for both address families and
//! answers "which stored prefixes contain this address". Overlapping and
//! nested prefixes are all kept; a query returns every one of them.
//!
//! # Result order
//!
//! Matches are returned by ascending prefix length (least specific first).
//! Entries with the same prefix are returned in insertion order. The first
//! match is therefore the widest covering block and the last match is the
//! most specific one.
//!
//! # Address families
//!
//! IPv4 queries only see IPv4 entries and IPv6 queries only see IPv6 entries.
//! IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are IPv6 queries.

mod trie;

pub use trie::{AddressBits, PrefixTrie};

use crate::prefix::{AddressFamily, NetworkPrefix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// A prefix paired with its label (country code)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub prefix: NetworkPrefix,
    pub label: String,
}

impl Entry {
    pub fn new(prefix: NetworkPrefix, label: impl Into<String>) -> Self {
        Self {
            prefix,
            label: label.into(),
        }
    }
}

/// Dual-family prefix containment index
#[derive(Debug, Clone, Default)]
pub struct ContainmentIndex {
    entries: Vec<Entry>,
    v4: PrefixTrie<u32>,
    v6: PrefixTrie<u128>,
}

impl ContainmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Duplicates and overlaps are kept independently.
    pub fn insert(&mut self, entry: Entry) {
        let id = self.entries.len();
        match entry.prefix {
            NetworkPrefix::V4 { addr, len } => self.v4.insert(addr, len, id),
            NetworkPrefix::V6 { addr, len } => self.v6.insert(addr, len, id),
        }
        self.entries.push(entry);
    }

    /// Every stored entry whose prefix contains `address`
    pub fn containing_networks(&self, address: &IpAddr) -> Vec<&Entry> {
        let ids = match address {
            IpAddr::V4(a) => self.v4.covering(u32::from(*a)),
            IpAddr::V6(a) => self.v6.covering(u128::from(*a)),
        };
        ids.into_iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries of the given family
    pub fn family_len(&self, family: AddressFamily) -> usize {
        match family {
            AddressFamily::V4 => self.v4.len(),
            AddressFamily::V6 => self.v6.len(),
        }
    }

    /// All entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Distinct labels, sorted
    pub fn labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.label.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Total trie nodes across both families
    pub fn node_count(&self) -> usize {
        self.v4.node_count() + self.v6.node_count()
    }
}

impl Extend<Entry> for ContainmentIndex {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

impl FromIterator<Entry> for ContainmentIndex {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut index = ContainmentIndex::new();
        index.extend(iter);
        index
    }
}
