//! Disk-resident B+ tree over one `f32` record field
//!
//! Every node lives in a fixed-width slot of the index file and is addressed
//! by its byte offset. Slot 0 holds the metadata header (order, height, root
//! offset, entry count), so offset 0 doubles as the "no next leaf" marker.
//!
//! The tree supports:
//! - Duplicate keys (no ordering guarantee among equal keys)
//! - Inclusive range queries via linked leaves, with node-visit accounting
//! - Append-only growth: nodes are never moved or reclaimed, a split only
//!   overwrites the slot of the node it splits
//!
//! Deletion and rebalancing are not supported.

mod error;
mod node;
mod serialization;

pub use error::{BPlusTreeError, BPlusTreeResult};
pub use node::{BPlusNode, InternalNode, LeafNode, NodeKind, NodeOffset};
pub use serialization::NodeLayout;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use log::{debug, info, warn};

use crate::file::{FileError, SlotFile, SlotId};
use crate::record::RecordLocation;

use serialization::{
    BPlusTreeMetadata, HEADER_PREFIX_SIZE, deserialize_metadata, deserialize_order,
    serialize_metadata,
};

/// Key type for the B+ tree (the FG_PCT_home column)
pub type BPlusKey = f32;

/// Default order: 16 children per internal node, 15 entries per leaf
pub const DEFAULT_ORDER: usize = 16;

/// Whether `key` lies in the inclusive range `[lower, upper]`, using the tree's key order
pub fn key_in_range(key: BPlusKey, lower: BPlusKey, upper: BPlusKey) -> bool {
    key.total_cmp(&lower) != Ordering::Less && key.total_cmp(&upper) != Ordering::Greater
}

/// Locations found by a range search plus the number of nodes read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeScan {
    pub locations: Vec<RecordLocation>,
    pub nodes_visited: usize,
}

/// B+ tree stored in an index file
///
/// Order `m` means:
/// - Internal nodes have at most `m` children and `m - 1` separators
/// - Leaf nodes have at most `m - 1` entries
/// - A leaf split keeps the lower `ceil(m/2)` entries in place
pub struct BPlusTree {
    file: SlotFile,
    layout: NodeLayout,
    root: NodeOffset,
    height: usize,
    entry_count: usize,
    metadata_dirty: bool,
}

impl BPlusTree {
    /// Create a new index file holding an empty tree (a single empty leaf root)
    pub fn create<P: AsRef<Path>>(path: P, order: usize) -> BPlusTreeResult<Self> {
        if order < 3 {
            return Err(BPlusTreeError::InvalidOrder(order));
        }

        let layout = NodeLayout::new(order);
        let file = SlotFile::create(path, layout.node_size())?;

        let mut tree = Self {
            file,
            layout,
            root: 0,
            height: 0,
            entry_count: 0,
            metadata_dirty: true,
        };

        // Reserve slot 0 before any node is appended
        tree.write_metadata()?;
        tree.root = tree.create_node(NodeKind::Leaf)?;
        tree.height = 1;
        tree.write_metadata()?;

        Ok(tree)
    }

    /// Open an existing index file
    pub fn open<P: AsRef<Path>>(path: P) -> BPlusTreeResult<Self> {
        let path = path.as_ref();
        let order = Self::read_stored_order(path)?;
        if order < 3 {
            return Err(BPlusTreeError::InvalidOrder(order));
        }

        let layout = NodeLayout::new(order);
        let mut file = SlotFile::open(path, layout.node_size())?;

        let mut buf = vec![0u8; layout.node_size()];
        file.read_slot(0, &mut buf)?;
        let metadata = deserialize_metadata(&buf)?;

        let tree = Self {
            file,
            layout,
            root: metadata.root_offset,
            height: metadata.height,
            entry_count: metadata.entry_count,
            metadata_dirty: false,
        };
        tree.slot_of(tree.root)?;

        debug!(
            "opened index {} (order {}, height {}, {} entries)",
            path.display(),
            order,
            tree.height,
            tree.entry_count
        );

        Ok(tree)
    }

    /// Create an index and insert every `(key, location)` pair
    pub fn build<P, I>(path: P, order: usize, entries: I) -> BPlusTreeResult<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = (BPlusKey, RecordLocation)>,
    {
        let mut tree = Self::create(path, order)?;
        for (key, location) in entries {
            tree.insert(key, location)?;
        }
        tree.sync()?;

        info!(
            "built index with {} entries: order {}, height {}, {} nodes",
            tree.entry_count,
            tree.order(),
            tree.height,
            tree.node_count()
        );

        Ok(tree)
    }

    pub fn order(&self) -> usize {
        self.layout.order()
    }

    /// Number of levels (1 for a single leaf)
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of entries in the tree
    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Offset of the current root node
    pub fn root_offset(&self) -> NodeOffset {
        self.root
    }

    /// Number of nodes in the index file
    pub fn node_count(&self) -> usize {
        self.file.slot_count().saturating_sub(1)
    }

    // ========== Node Management ==========

    /// Append an empty node of the given kind, returning its offset
    pub fn create_node(&mut self, kind: NodeKind) -> BPlusTreeResult<NodeOffset> {
        let buf = self.layout.serialize_node(&BPlusNode::empty(kind))?;
        let slot = self.file.append_slot(&buf)?;
        Ok(self.file.offset_of(slot))
    }

    /// Read the node at `offset`
    pub fn read_node(&mut self, offset: NodeOffset) -> BPlusTreeResult<BPlusNode> {
        let slot = self.slot_of(offset)?;
        let mut buf = vec![0u8; self.layout.node_size()];
        self.file.read_slot(slot, &mut buf)?;
        self.layout.deserialize_node(&buf, offset)
    }

    /// Overwrite the node at `offset` in place
    fn write_node(&mut self, offset: NodeOffset, node: &BPlusNode) -> BPlusTreeResult<()> {
        let slot = self.slot_of(offset)?;
        let buf = self.layout.serialize_node(node)?;
        self.file.write_slot(slot, &buf)?;
        Ok(())
    }

    fn read_leaf(&mut self, offset: NodeOffset) -> BPlusTreeResult<LeafNode> {
        match self.read_node(offset)? {
            BPlusNode::Leaf(leaf) => Ok(leaf),
            BPlusNode::Internal(_) => Err(BPlusTreeError::UnexpectedNodeKind {
                offset,
                found: NodeKind::Internal,
            }),
        }
    }

    fn slot_of(&self, offset: NodeOffset) -> BPlusTreeResult<SlotId> {
        let node_size = self.layout.node_size() as u64;
        if offset == 0 || offset % node_size != 0 {
            return Err(BPlusTreeError::CorruptedNode {
                offset,
                reason: format!("offset is not a node slot (node size {})", node_size),
            });
        }
        Ok((offset / node_size) as SlotId)
    }

    fn read_stored_order(path: &Path) -> BPlusTreeResult<usize> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FileError::FileNotFound(path.display().to_string()).into());
            }
            Err(e) => return Err(FileError::Io(e).into()),
        };

        let mut prefix = [0u8; HEADER_PREFIX_SIZE];
        match file.read_exact(&mut prefix) {
            Ok(()) => deserialize_order(&prefix),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(BPlusTreeError::InvalidMagic),
            Err(e) => Err(FileError::Io(e).into()),
        }
    }

    fn write_metadata(&mut self) -> BPlusTreeResult<()> {
        let metadata = BPlusTreeMetadata {
            order: self.layout.order(),
            height: self.height,
            root_offset: self.root,
            entry_count: self.entry_count,
        };
        let buf = serialize_metadata(&metadata, self.layout.node_size());
        self.file.write_slot(0, &buf)?;
        self.metadata_dirty = false;
        Ok(())
    }

    /// Persist the header and flush the index file
    pub fn sync(&mut self) -> BPlusTreeResult<()> {
        if self.metadata_dirty {
            self.write_metadata()?;
        }
        self.file.sync()?;
        Ok(())
    }

    // ========== Insert Operations ==========

    /// Insert a key-location pair
    pub fn insert(&mut self, key: BPlusKey, location: RecordLocation) -> BPlusTreeResult<()> {
        if key.is_nan() {
            return Err(BPlusTreeError::InvalidKey(key));
        }

        // Internal nodes from the root down, with the child index taken at each
        let mut path: Vec<(NodeOffset, InternalNode, usize)> = Vec::with_capacity(self.height);
        let mut current = self.root;

        let mut leaf = loop {
            match self.read_node(current)? {
                BPlusNode::Internal(node) => {
                    if node.children.is_empty() {
                        return Err(BPlusTreeError::CorruptedNode {
                            offset: current,
                            reason: "internal node without children".to_string(),
                        });
                    }
                    let child_idx = node.child_index_for_insert(key);
                    let child = node.children[child_idx];
                    path.push((current, node, child_idx));
                    current = child;
                }
                BPlusNode::Leaf(leaf) => break leaf,
            }
        };

        leaf.insert(key, location);
        self.entry_count += 1;
        self.metadata_dirty = true;

        if leaf.len() <= self.layout.max_keys() {
            return self.write_node(current, &BPlusNode::Leaf(leaf));
        }

        self.split_leaf(current, leaf, path)
    }

    /// Split an overflowing leaf and push the separator upward
    fn split_leaf(
        &mut self,
        leaf_offset: NodeOffset,
        mut leaf: LeafNode,
        path: Vec<(NodeOffset, InternalNode, usize)>,
    ) -> BPlusTreeResult<()> {
        let keep = self.layout.order().div_ceil(2);
        let right = leaf.split(keep);
        let separator = right.min_key().ok_or_else(|| {
            BPlusTreeError::InvalidState("leaf split produced an empty right node".to_string())
        })?;

        // Write the new leaf before linking it so the chain never points at garbage
        let right_offset = self.create_node(NodeKind::Leaf)?;
        self.write_node(right_offset, &BPlusNode::Leaf(right))?;
        leaf.next = Some(right_offset);
        self.write_node(leaf_offset, &BPlusNode::Leaf(leaf))?;

        self.insert_into_parent(path, leaf_offset, separator, right_offset)
    }

    /// Insert a separator into the parent after a split, splitting upward as needed
    fn insert_into_parent(
        &mut self,
        mut path: Vec<(NodeOffset, InternalNode, usize)>,
        mut left: NodeOffset,
        mut separator: BPlusKey,
        mut right: NodeOffset,
    ) -> BPlusTreeResult<()> {
        while let Some((parent_offset, mut parent, child_idx)) = path.pop() {
            parent.insert_child(child_idx, separator, right);

            if parent.len() <= self.layout.max_keys() {
                return self.write_node(parent_offset, &BPlusNode::Internal(parent));
            }

            let (promoted, right_node) = parent.split();
            let right_offset = self.create_node(NodeKind::Internal)?;
            self.write_node(right_offset, &BPlusNode::Internal(right_node))?;
            self.write_node(parent_offset, &BPlusNode::Internal(parent))?;

            left = parent_offset;
            separator = promoted;
            right = right_offset;
        }

        // Split the root - create new root
        let new_root = self.create_node(NodeKind::Internal)?;
        let root_node = InternalNode::new(vec![separator], vec![left, right]);
        self.write_node(new_root, &BPlusNode::Internal(root_node))?;

        self.root = new_root;
        self.height += 1;
        self.write_metadata()?;

        debug!("root split: new root at {} (height {})", new_root, self.height);

        Ok(())
    }

    // ========== Search Operations ==========

    /// Range search: every location whose key lies in `[lower, upper]`
    ///
    /// Descends to the leftmost leaf that may hold `lower`, then follows next
    /// links until a key exceeds `upper`. Every node read is counted.
    pub fn search(&mut self, lower: BPlusKey, upper: BPlusKey) -> BPlusTreeResult<RangeScan> {
        for bound in [lower, upper] {
            if bound.is_nan() {
                return Err(BPlusTreeError::InvalidKey(bound));
            }
        }

        let mut scan = RangeScan::default();
        if lower.total_cmp(&upper) == Ordering::Greater {
            return Ok(scan);
        }

        let mut current = self.root;
        let mut leaf = loop {
            let node = self.read_node(current)?;
            scan.nodes_visited += 1;
            match node {
                BPlusNode::Internal(node) => {
                    if node.children.is_empty() {
                        return Err(BPlusTreeError::CorruptedNode {
                            offset: current,
                            reason: "internal node without children".to_string(),
                        });
                    }
                    current = node.children[node.child_index_for_lower_bound(lower)];
                }
                BPlusNode::Leaf(leaf) => break leaf,
            }
        };

        let node_count = self.node_count();
        loop {
            for (key, location) in leaf.keys.iter().zip(&leaf.values) {
                if key.total_cmp(&upper) == Ordering::Greater {
                    return Ok(scan);
                }
                if key.total_cmp(&lower) != Ordering::Less {
                    scan.locations.push(*location);
                }
            }

            let Some(next) = leaf.next else {
                return Ok(scan);
            };
            if scan.nodes_visited >= node_count {
                return Err(BPlusTreeError::InvalidState(
                    "leaf chain longer than the index".to_string(),
                ));
            }
            leaf = self.read_leaf(next)?;
            scan.nodes_visited += 1;
        }
    }

    /// Every entry in ascending key order, by walking the leaf chain
    pub fn entries(&mut self) -> BPlusTreeResult<Vec<(BPlusKey, RecordLocation)>> {
        let mut current = self.root;
        loop {
            match self.read_node(current)? {
                BPlusNode::Internal(node) => match node.children.first() {
                    Some(&child) => current = child,
                    None => {
                        return Err(BPlusTreeError::CorruptedNode {
                            offset: current,
                            reason: "internal node without children".to_string(),
                        });
                    }
                },
                BPlusNode::Leaf(_) => break,
            }
        }

        let mut results = Vec::with_capacity(self.entry_count);
        let mut next = Some(current);
        let mut visited = 0;
        while let Some(offset) = next {
            visited += 1;
            if visited > self.node_count() {
                return Err(BPlusTreeError::InvalidState(
                    "leaf chain longer than the index".to_string(),
                ));
            }
            let leaf = self.read_leaf(offset)?;
            results.extend(leaf.keys.iter().copied().zip(leaf.values.iter().copied()));
            next = leaf.next;
        }

        Ok(results)
    }

    /// Depth of every leaf reachable from the root (root depth is 1)
    pub fn leaf_depths(&mut self) -> BPlusTreeResult<Vec<usize>> {
        let mut depths = Vec::new();
        let mut stack = vec![(self.root, 1usize)];

        while let Some((offset, depth)) = stack.pop() {
            if depth > self.node_count() {
                return Err(BPlusTreeError::InvalidState(
                    "tree deeper than its node count".to_string(),
                ));
            }
            match self.read_node(offset)? {
                BPlusNode::Internal(node) => {
                    for &child in node.children.iter().rev() {
                        stack.push((child, depth + 1));
                    }
                }
                BPlusNode::Leaf(_) => depths.push(depth),
            }
        }

        Ok(depths)
    }
}

impl Drop for BPlusTree {
    fn drop(&mut self) {
        if self.metadata_dirty
            && let Err(e) = self.write_metadata()
        {
            warn!(
                "failed to persist index header for {}: {}",
                self.file.path().display(),
                e
            );
        }
    }
}
