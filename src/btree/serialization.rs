//! Serialization and deserialization for index file slots

use crate::record::RecordLocation;

use super::BPlusKey;
use super::error::{BPlusTreeError, BPlusTreeResult};
use super::node::{BPlusNode, InternalNode, LeafNode, NodeKind, NodeOffset};

/// Magic number for index files: "BPIX" in ASCII
pub const MAGIC_NUMBER: u32 = 0x42504958;

/// Current index file version
pub const VERSION: u32 = 1;

/// Bytes of the header prefix needed to recover the node size
pub const HEADER_PREFIX_SIZE: usize = 12;

const METADATA_SIZE: usize = 32;
const NODE_HEADER_SIZE: usize = 8;
const KEY_SIZE: usize = 4;
const OFFSET_SIZE: usize = 8;
const LOCATION_SIZE: usize = 8;

/// Per-order node geometry
///
/// ```text
/// [kind: u8][reserved: 3][key_count: i32][keys: f32 x (order-1)]
///   internal: [child_offsets: u64 x order]
///   leaf:     [(block: u32, slot: u32) x (order-1)][next_leaf: u64]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    order: usize,
}

impl NodeLayout {
    pub fn new(order: usize) -> Self {
        Self { order }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Max keys per node
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// On-disk width of every slot in the index file
    pub fn node_size(&self) -> usize {
        (NODE_HEADER_SIZE + KEY_SIZE * self.max_keys() + OFFSET_SIZE * self.order)
            .max(METADATA_SIZE)
    }

    fn payload_start(&self) -> usize {
        NODE_HEADER_SIZE + KEY_SIZE * self.max_keys()
    }

    fn next_leaf_start(&self) -> usize {
        self.payload_start() + LOCATION_SIZE * self.max_keys()
    }

    /// Serialize a node into one slot
    pub fn serialize_node(&self, node: &BPlusNode) -> BPlusTreeResult<Vec<u8>> {
        let mut buf = vec![0u8; self.node_size()];

        let key_count = node.key_count();
        if key_count > self.max_keys() {
            return Err(BPlusTreeError::InvalidState(format!(
                "node with {} keys exceeds order {}",
                key_count, self.order
            )));
        }

        buf[0] = node.kind() as u8;
        buf[4..8].copy_from_slice(&(key_count as i32).to_le_bytes());

        let keys = match node {
            BPlusNode::Internal(n) => &n.keys,
            BPlusNode::Leaf(n) => &n.keys,
        };
        let mut offset = NODE_HEADER_SIZE;
        for key in keys {
            buf[offset..offset + KEY_SIZE].copy_from_slice(&key.to_le_bytes());
            offset += KEY_SIZE;
        }

        let mut offset = self.payload_start();
        match node {
            BPlusNode::Internal(n) => {
                for child in &n.children {
                    buf[offset..offset + OFFSET_SIZE].copy_from_slice(&child.to_le_bytes());
                    offset += OFFSET_SIZE;
                }
            }
            BPlusNode::Leaf(n) => {
                for location in &n.values {
                    buf[offset..offset + 4]
                        .copy_from_slice(&(location.block_id as u32).to_le_bytes());
                    buf[offset + 4..offset + 8]
                        .copy_from_slice(&(location.slot_id as u32).to_le_bytes());
                    offset += LOCATION_SIZE;
                }
                let next = self.next_leaf_start();
                buf[next..next + OFFSET_SIZE]
                    .copy_from_slice(&n.next.unwrap_or(0).to_le_bytes());
            }
        }

        Ok(buf)
    }

    /// Deserialize the node stored at `at`
    pub fn deserialize_node(&self, buf: &[u8], at: NodeOffset) -> BPlusTreeResult<BPlusNode> {
        if buf.len() != self.node_size() {
            return Err(BPlusTreeError::CorruptedNode {
                offset: at,
                reason: format!("expected {} bytes, got {}", self.node_size(), buf.len()),
            });
        }

        let kind = NodeKind::from_byte(buf[0]).ok_or(BPlusTreeError::InvalidNodeType {
            offset: at,
            kind: buf[0],
        })?;

        let key_count = read_i32(buf, 4);
        if key_count < 0 || key_count as usize > self.max_keys() {
            return Err(BPlusTreeError::CorruptedNode {
                offset: at,
                reason: format!("key_count {} outside 0..={}", key_count, self.max_keys()),
            });
        }
        let key_count = key_count as usize;

        let keys: Vec<BPlusKey> = (0..key_count)
            .map(|i| f32::from_le_bytes(read_array(buf, NODE_HEADER_SIZE + i * KEY_SIZE)))
            .collect();

        let start = self.payload_start();
        let node = match kind {
            NodeKind::Internal => {
                // An internal node with no keys only exists between create_node and its first write
                let child_count = if key_count == 0 { 0 } else { key_count + 1 };
                let children = (0..child_count)
                    .map(|i| read_u64(buf, start + i * OFFSET_SIZE))
                    .collect();
                BPlusNode::Internal(InternalNode { keys, children })
            }
            NodeKind::Leaf => {
                let values = (0..key_count)
                    .map(|i| {
                        let pos = start + i * LOCATION_SIZE;
                        RecordLocation::new(
                            read_u32(buf, pos) as usize,
                            read_u32(buf, pos + 4) as usize,
                        )
                    })
                    .collect();
                let next = match read_u64(buf, self.next_leaf_start()) {
                    0 => None,
                    offset => Some(offset),
                };
                let mut leaf = LeafNode::with_entries(keys, values);
                leaf.next = next;
                BPlusNode::Leaf(leaf)
            }
        };

        Ok(node)
    }
}

/// Metadata stored in slot 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BPlusTreeMetadata {
    pub order: usize,
    pub height: usize,
    pub root_offset: NodeOffset,
    pub entry_count: usize,
}

/// Serialize metadata into a full slot
///
/// ```text
/// [magic: u32][version: u32][order: u32][height: u32][root_offset: u64][entry_count: u64]
/// ```
pub fn serialize_metadata(metadata: &BPlusTreeMetadata, slot_size: usize) -> Vec<u8> {
    let mut buf = vec![0u8; slot_size.max(METADATA_SIZE)];

    buf[0..4].copy_from_slice(&MAGIC_NUMBER.to_le_bytes());
    buf[4..8].copy_from_slice(&VERSION.to_le_bytes());
    buf[8..12].copy_from_slice(&(metadata.order as u32).to_le_bytes());
    buf[12..16].copy_from_slice(&(metadata.height as u32).to_le_bytes());
    buf[16..24].copy_from_slice(&metadata.root_offset.to_le_bytes());
    buf[24..32].copy_from_slice(&(metadata.entry_count as u64).to_le_bytes());

    buf
}

/// Validate magic and version and return the stored order
pub fn deserialize_order(buf: &[u8]) -> BPlusTreeResult<usize> {
    if buf.len() < HEADER_PREFIX_SIZE {
        return Err(BPlusTreeError::InvalidMagic);
    }

    if read_u32(buf, 0) != MAGIC_NUMBER {
        return Err(BPlusTreeError::InvalidMagic);
    }

    let version = read_u32(buf, 4);
    if version != VERSION {
        return Err(BPlusTreeError::UnsupportedVersion(version));
    }

    Ok(read_u32(buf, 8) as usize)
}

/// Deserialize metadata from slot 0
pub fn deserialize_metadata(buf: &[u8]) -> BPlusTreeResult<BPlusTreeMetadata> {
    let order = deserialize_order(buf)?;
    if buf.len() < METADATA_SIZE {
        return Err(BPlusTreeError::InvalidState(format!(
            "metadata slot too small: {} bytes",
            buf.len()
        )));
    }

    Ok(BPlusTreeMetadata {
        order,
        height: read_u32(buf, 12) as usize,
        root_offset: read_u64(buf, 16),
        entry_count: read_u64(buf, 24) as usize,
    })
}

fn read_array(buf: &[u8], at: usize) -> [u8; 4] {
    [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(read_array(buf, at))
}

fn read_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_le_bytes(read_array(buf, at))
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
