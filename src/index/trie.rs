//! Binary prefix trie over fixed-width address keys
//!
//! Nodes are stored in a flat arena and refer to each other by index. A node
//! sits at depth `d` when it represents the first `d` bits of an address, and
//! every entry inserted with prefix length `d` is attached to the node at that
//! depth. Walking the bits of a full address from the root therefore visits
//! exactly the nodes of all prefixes that contain it, shortest first.

use std::marker::PhantomData;

/// Fixed-width address key, read from the most significant bit
pub trait AddressBits: Copy {
    /// Key width in bits
    const WIDTH: u8;

    /// Bit `i` counted from the most significant end (`0..WIDTH`)
    fn bit(&self, i: u8) -> bool;
}

impl AddressBits for u32 {
    const WIDTH: u8 = 32;

    fn bit(&self, i: u8) -> bool {
        (self >> (31 - u32::from(i))) & 1 == 1
    }
}

impl AddressBits for u128 {
    const WIDTH: u8 = 128;

    fn bit(&self, i: u8) -> bool {
        (self >> (127 - u32::from(i))) & 1 == 1
    }
}

#[derive(Debug, Clone, Default)]
struct Node {
    children: [Option<usize>; 2],
    /// Entry ids in insertion order
    entries: Vec<usize>,
}

/// Trie mapping prefixes of `K` to lists of entry ids
#[derive(Debug, Clone)]
pub struct PrefixTrie<K: AddressBits> {
    nodes: Vec<Node>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K: AddressBits> Default for PrefixTrie<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AddressBits> PrefixTrie<K> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
            len: 0,
            _key: PhantomData,
        }
    }

    /// Attach `entry_id` to the node for `key/prefix_len`, creating the path as needed.
    ///
    /// `prefix_len` is clamped to the key width; only the top `prefix_len`
    /// bits of `key` are read.
    pub fn insert(&mut self, key: K, prefix_len: u8, entry_id: usize) {
        let depth = prefix_len.min(K::WIDTH);
        let mut cur = 0;
        for i in 0..depth {
            let side = usize::from(key.bit(i));
            cur = match self.nodes[cur].children[side] {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(Node::default());
                    self.nodes[cur].children[side] = Some(next);
                    next
                }
            };
        }
        self.nodes[cur].entries.push(entry_id);
        self.len += 1;
    }

    /// Ids of every entry whose prefix contains the full-width address `key`.
    ///
    /// Ids come out by ascending prefix length, then insertion order.
    pub fn covering(&self, key: K) -> Vec<usize> {
        let mut found = Vec::new();
        let mut cur = 0;
        found.extend_from_slice(&self.nodes[cur].entries);
        for i in 0..K::WIDTH {
            let side = usize::from(key.bit(i));
            match self.nodes[cur].children[side] {
                Some(next) => {
                    cur = next;
                    found.extend_from_slice(&self.nodes[cur].entries);
                }
                None => break,
            }
        }
        found
    }

    /// Number of entries stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of trie nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_order() {
        let k: u32 = 0x8000_0001;
        assert!(k.bit(0));
        assert!(!k.bit(1));
        assert!(k.bit(31));

        let k: u128 = 1 << 127;
        assert!(k.bit(0));
        assert!(!k.bit(127));
    }

    #[test]
    fn test_covering_walks_root_to_leaf() {
        let mut trie = PrefixTrie::<u32>::new();
        // 10.0.0.0/8 and 10.1.0.0/16
        trie.insert(0x0A00_0000, 8, 0);
        trie.insert(0x0A01_0000, 16, 1);
        trie.insert(0x0A01_0000, 16, 2);

        assert_eq!(trie.covering(0x0A01_0203), vec![0, 1, 2]);
        assert_eq!(trie.covering(0x0A02_0203), vec![0]);
        assert!(trie.covering(0x0B00_0000).is_empty());
        assert_eq!(trie.len(), 3);
    }

    #[test]
    fn test_zero_length_prefix_matches_everything() {
        let mut trie = PrefixTrie::<u128>::new();
        trie.insert(0, 0, 7);
        assert_eq!(trie.covering(u128::MAX), vec![7]);
        assert_eq!(trie.covering(0), vec![7]);
        assert_eq!(trie.node_count(), 1);
    }

    #[test]
    fn test_host_routes() {
        let mut trie = PrefixTrie::<u32>::new();
        trie.insert(0xC000_0201, 32, 0);
        assert_eq!(trie.covering(0xC000_0201), vec![0]);
        assert!(trie.covering(0xC000_0202).is_empty());
        assert_eq!(trie.node_count(), 33);
    }
}
