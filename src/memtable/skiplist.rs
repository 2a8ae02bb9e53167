use rand::Rng;

use crate::error::Result;
use crate::iterator::RunIterator;

/// Maximum height of the skip list. LevelDB uses 12.
pub const MAX_HEIGHT: usize = 12;

/// A single node in the skip list.
///
/// Each node has `height` forward pointers. Level 0 contains all nodes
/// (a regular linked list). Higher levels skip over nodes, enabling
/// O(log n) average-case search.
///
/// ```text
/// Level 3:  HEAD ──────────────────────────────► 50 ──────────► NIL
/// Level 2:  HEAD ──────────► 20 ────────────────► 50 ──────────► NIL
/// Level 1:  HEAD ──► 10 ──► 20 ────► 35 ────────► 50 ──► 60 ──► NIL
/// Level 0:  HEAD ──► 10 ──► 20 ──► 25 ──► 35 ──► 50 ──► 60 ──► 70 ► NIL
/// ```
///
/// Nodes live in an arena (`SkipList::nodes`) and link to each other by
/// index, so there is no unsafe code and no per-node boxing.
struct SkipNode<K, V> {
    key: K,
    value: V,
    forward: Vec<Option<usize>>,
}

/// A probabilistic sorted map.
///
/// Average case: O(log n) insert, O(log n) lookup, O(n) iteration.
/// Nodes are never removed; a memory run is dropped as a whole once it
/// has been merged to disk.
pub struct SkipList<K, V> {
    /// Head sentinel forward pointers, one per level.
    head: [Option<usize>; MAX_HEIGHT],
    nodes: Vec<SkipNode<K, V>>,
    /// Current max level in use.
    height: usize,
}

impl<K: Ord + Copy, V: Copy> SkipList<K, V> {
    pub fn new() -> Self {
        SkipList {
            head: [None; MAX_HEIGHT],
            nodes: Vec::new(),
            height: 1,
        }
    }

    /// Insert a key-value pair. Overwrites if key already exists.
    /// Returns true when a new key was added.
    ///
    /// Algorithm:
    ///   1. Find the insertion point at each level (track predecessors)
    ///   2. Generate a random height for the new node (coin flip per level)
    ///   3. Splice into the list at each level up to the node's height
    pub fn insert(&mut self, key: K, value: V) -> bool {
        // `None` in `update` stands for the head sentinel.
        let mut update: [Option<usize>; MAX_HEIGHT] = [None; MAX_HEIGHT];
        let mut cursor: Option<usize> = None;

        for level in (0..self.height).rev() {
            while let Some(next) = self.next_of(cursor, level) {
                if self.nodes[next].key < key {
                    cursor = Some(next);
                } else {
                    break;
                }
            }
            update[level] = cursor;
        }

        if let Some(existing) = self.next_of(cursor, 0) {
            if self.nodes[existing].key == key {
                self.nodes[existing].value = value;
                return false;
            }
        }

        let height = random_height();
        if height > self.height {
            // Levels above the old height start from the head.
            self.height = height;
        }

        let idx = self.nodes.len();
        let mut forward = Vec::with_capacity(height);
        for (level, pred) in update.iter().enumerate().take(height) {
            forward.push(self.next_of(*pred, level));
            self.set_next(*pred, level, Some(idx));
        }
        self.nodes.push(SkipNode {
            key,
            value,
            forward,
        });
        true
    }

    /// Look up a key. Walk right while the next key is smaller, then drop a
    /// level; at level 0 the next node either matches or the key is absent.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut cursor: Option<usize> = None;
        for level in (0..self.height).rev() {
            while let Some(next) = self.next_of(cursor, level) {
                if self.nodes[next].key < *key {
                    cursor = Some(next);
                } else {
                    break;
                }
            }
        }

        self.next_of(cursor, 0)
            .map(|idx| &self.nodes[idx])
            .filter(|node| node.key == *key)
            .map(|node| &node.value)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cursor over all entries in key order, positioned at the first one.
    pub fn iter(&self) -> SkipListIterator<'_, K, V> {
        SkipListIterator {
            list: self,
            current: self.head[0],
        }
    }

    fn next_of(&self, node: Option<usize>, level: usize) -> Option<usize> {
        match node {
            None => self.head[level],
            Some(idx) => self.nodes[idx].forward[level],
        }
    }

    fn set_next(&mut self, node: Option<usize>, level: usize, next: Option<usize>) {
        match node {
            None => self.head[level] = next,
            Some(idx) => self.nodes[idx].forward[level] = next,
        }
    }
}

impl<K: Ord + Copy, V: Copy> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Each level has a 1/4 probability (LevelDB uses 1/4, not 1/2).
fn random_height() -> usize {
    let mut rng = rand::thread_rng();
    let mut height = 1;
    while height < MAX_HEIGHT && rng.gen_ratio(1, 4) {
        height += 1;
    }
    height
}

/// Iterator over skip list entries in sorted order.
///
/// Simply follows level 0 forward pointers.
pub struct SkipListIterator<'a, K, V> {
    list: &'a SkipList<K, V>,
    current: Option<usize>,
}

impl<K: Ord + Copy, V: Copy> RunIterator<K, V> for SkipListIterator<'_, K, V> {
    fn key(&self) -> K {
        match self.current {
            Some(idx) => self.list.nodes[idx].key,
            None => panic!("SkipListIterator::key called on exhausted iterator"),
        }
    }

    fn value(&self) -> V {
        match self.current {
            Some(idx) => self.list.nodes[idx].value,
            None => panic!("SkipListIterator::value called on exhausted iterator"),
        }
    }

    fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    fn next(&mut self) -> Result<()> {
        if let Some(idx) = self.current {
            self.current = self.list.nodes[idx].forward[0];
        }
        Ok(())
    }
}
