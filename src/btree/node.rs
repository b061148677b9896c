use std::cmp::Ordering;

use crate::record::RecordLocation;

use super::BPlusKey;

/// Byte offset of a node in the index file (0 is the header, never a node)
pub type NodeOffset = u64;

/// Node kind tag as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Internal = 0,
    Leaf = 1,
}

impl NodeKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(NodeKind::Internal),
            1 => Some(NodeKind::Leaf),
            _ => None,
        }
    }
}

/// Internal node: separator keys and child offsets
///
/// Invariant: `children.len() == keys.len() + 1`. Keys under `children[i]`
/// are `>= keys[i - 1]` and `<= keys[i]`; a key equal to `keys[i]` only sits
/// left of it when a leaf split cut through a run of duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalNode {
    pub keys: Vec<BPlusKey>,
    pub children: Vec<NodeOffset>,
}

impl InternalNode {
    pub fn new(keys: Vec<BPlusKey>, children: Vec<NodeOffset>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len());
        Self { keys, children }
    }

    /// Number of separator keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Child to descend into when inserting `key`; ties route right
    pub fn child_index_for_insert(&self, key: BPlusKey) -> usize {
        self.keys
            .partition_point(|k| k.total_cmp(&key) != Ordering::Greater)
    }

    /// Leftmost child that may hold `key`; ties route left
    pub fn child_index_for_lower_bound(&self, key: BPlusKey) -> usize {
        self.keys
            .partition_point(|k| k.total_cmp(&key) == Ordering::Less)
    }

    /// Record that `children[index]` split, with `right` holding keys `>= separator`
    pub fn insert_child(&mut self, index: usize, separator: BPlusKey, right: NodeOffset) {
        self.keys.insert(index, separator);
        self.children.insert(index + 1, right);
    }

    /// Split an overflowing node around its middle key
    ///
    /// Returns the promoted key and the new right sibling; the promoted key
    /// is kept by neither half.
    pub fn split(&mut self) -> (BPlusKey, InternalNode) {
        let mid = self.keys.len() / 2;

        let right_keys = self.keys.split_off(mid + 1);
        let right_children = self.children.split_off(mid + 1);
        let promoted = self.keys.pop().unwrap_or_default();

        (promoted, InternalNode::new(right_keys, right_children))
    }
}

/// Leaf node: sorted (key, location) entries linked to the next leaf
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LeafNode {
    pub keys: Vec<BPlusKey>,
    pub values: Vec<RecordLocation>,
    pub next: Option<NodeOffset>,
}

impl LeafNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(keys: Vec<BPlusKey>, values: Vec<RecordLocation>) -> Self {
        debug_assert_eq!(keys.len(), values.len());
        Self {
            keys,
            values,
            next: None,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert in sorted position, after any equal keys
    pub fn insert(&mut self, key: BPlusKey, value: RecordLocation) {
        let pos = self
            .keys
            .partition_point(|k| k.total_cmp(&key) != Ordering::Greater);
        self.keys.insert(pos, key);
        self.values.insert(pos, value);
    }

    pub fn min_key(&self) -> Option<BPlusKey> {
        self.keys.first().copied()
    }

    pub fn max_key(&self) -> Option<BPlusKey> {
        self.keys.last().copied()
    }

    /// Split off everything after the first `keep` entries into a new right leaf
    ///
    /// The right leaf inherits this leaf's `next`; the caller links this leaf
    /// to the right one once it has an offset.
    pub fn split(&mut self, keep: usize) -> LeafNode {
        let right_keys = self.keys.split_off(keep);
        let right_values = self.values.split_off(keep);

        let mut right = LeafNode::with_entries(right_keys, right_values);
        right.next = self.next.take();
        right
    }
}

/// B+ tree node (either internal or leaf)
#[derive(Debug, Clone, PartialEq)]
pub enum BPlusNode {
    Internal(InternalNode),
    Leaf(LeafNode),
}

impl BPlusNode {
    /// Empty node of the given kind
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Internal => BPlusNode::Internal(InternalNode {
                keys: Vec::new(),
                children: Vec::new(),
            }),
            NodeKind::Leaf => BPlusNode::Leaf(LeafNode::new()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            BPlusNode::Internal(_) => NodeKind::Internal,
            BPlusNode::Leaf(_) => NodeKind::Leaf,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BPlusNode::Leaf(_))
    }

    /// Number of keys held
    pub fn key_count(&self) -> usize {
        match self {
            BPlusNode::Internal(node) => node.len(),
            BPlusNode::Leaf(node) => node.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(i: usize) -> RecordLocation {
        RecordLocation::new(i / 10, i % 10)
    }

    #[test]
    fn test_leaf_node_insert() {
        let mut leaf = LeafNode::new();

        leaf.insert(0.5, loc(0));
        leaf.insert(0.3, loc(1));
        leaf.insert(0.7, loc(2));
        leaf.insert(0.3, loc(3)); // Duplicate key lands after the first 0.3

        assert_eq!(leaf.len(), 4);
        assert_eq!(leaf.keys, vec![0.3, 0.3, 0.5, 0.7]);
        assert_eq!(leaf.values, vec![loc(1), loc(3), loc(0), loc(2)]);
    }

    #[test]
    fn test_leaf_node_split() {
        let mut leaf = LeafNode::new();
        for i in 0..5 {
            leaf.insert(i as f32, loc(i));
        }
        leaf.next = Some(4096);

        let right = leaf.split(3);

        assert_eq!(leaf.keys, vec![0.0, 1.0, 2.0]);
        assert_eq!(right.keys, vec![3.0, 4.0]);
        assert_eq!(right.min_key(), Some(3.0));
        assert_eq!(leaf.max_key(), Some(2.0));
        assert_eq!(right.next, Some(4096));
        assert_eq!(leaf.next, None);
    }

    #[test]
    fn test_internal_node_routing() {
        let node = InternalNode::new(vec![0.3, 0.5, 0.7], vec![10, 20, 30, 40]);

        assert_eq!(node.child_index_for_insert(0.1), 0);
        assert_eq!(node.child_index_for_insert(0.3), 1); // == separator, go right
        assert_eq!(node.child_index_for_insert(0.4), 1);
        assert_eq!(node.child_index_for_insert(0.7), 3);
        assert_eq!(node.child_index_for_insert(0.9), 3);

        assert_eq!(node.child_index_for_lower_bound(0.1), 0);
        assert_eq!(node.child_index_for_lower_bound(0.3), 0); // == separator, go left
        assert_eq!(node.child_index_for_lower_bound(0.4), 1);
        assert_eq!(node.child_index_for_lower_bound(0.7), 2);
        assert_eq!(node.child_index_for_lower_bound(0.9), 3);
    }

    #[test]
    fn test_internal_node_insert_child() {
        let mut node = InternalNode::new(vec![0.5], vec![10, 20]);

        node.insert_child(0, 0.2, 15);
        assert_eq!(node.keys, vec![0.2, 0.5]);
        assert_eq!(node.children, vec![10, 15, 20]);

        node.insert_child(2, 0.8, 25);
        assert_eq!(node.keys, vec![0.2, 0.5, 0.8]);
        assert_eq!(node.children, vec![10, 15, 20, 25]);
    }

    #[test]
    fn test_internal_node_split() {
        let mut node = InternalNode::new(vec![1.0, 2.0, 3.0, 4.0], vec![10, 20, 30, 40, 50]);

        let (promoted, right) = node.split();

        assert_eq!(promoted, 3.0);
        assert_eq!(node.keys, vec![1.0, 2.0]);
        assert_eq!(node.children, vec![10, 20, 30]);
        assert_eq!(right.keys, vec![4.0]);
        assert_eq!(right.children, vec![40, 50]);
    }

    #[test]
    fn test_internal_node_split_order_three() {
        let mut node = InternalNode::new(vec![1.0, 2.0, 3.0], vec![10, 20, 30, 40]);

        let (promoted, right) = node.split();

        assert_eq!(promoted, 2.0);
        assert_eq!(node.keys, vec![1.0]);
        assert_eq!(node.children, vec![10, 20]);
        assert_eq!(right.keys, vec![3.0]);
        assert_eq!(right.children, vec![30, 40]);
    }

    #[test]
    fn test_node_kind_byte() {
        assert_eq!(NodeKind::from_byte(0), Some(NodeKind::Internal));
        assert_eq!(NodeKind::from_byte(1), Some(NodeKind::Leaf));
        assert_eq!(NodeKind::from_byte(7), None);
        assert_eq!(BPlusNode::empty(NodeKind::Leaf).kind(), NodeKind::Leaf);
    }
}
