//! Node codec: a pure, allocation-free interpreter over a fixed 4096-byte
//! buffer, the maximum size any valid RAC index node can occupy.

use byteorder::{LE, ReadBytesExt};

use crate::common::byte_source::ByteSource;
use crate::range::Range;
use crate::{Error, Result};

/// Maximum possible node size: `node_size(255)`.
pub const MAX_NODE_SIZE: usize = 16 * 255 + 16;

const MAGIC: [u8; 3] = [0x72, 0xC3, 0x63];
/// `tTag` values in this range are reserved and never valid.
const RESERVED_TAG_LOW: u8 = 0xC0;
/// `tTag` value marking a branch slot (child is another node).
const BRANCH_TAG: u8 = 0xFE;

/// Size in bytes of a node with the given arity.
#[must_use]
pub fn node_size(arity: u8) -> usize {
    16 * usize::from(arity) + 16
}

fn u48le(buf: &[u8], offset: usize) -> u64 {
    (&buf[offset..offset + 6])
        .read_uint::<LE>(6)
        .expect("6-byte slice read cannot fail")
}

/// In-memory view of one index node: a scratch buffer plus the accessors
/// defined over it in terms of its own arity byte.
///
/// The buffer is a single region reused on every load; see the crate-level
/// "lifecycle" note. Accessors never panic: every offset they touch is at most
/// `node_size(arity) - 1`, which is always `< MAX_NODE_SIZE` for `arity in 1..=255`.
pub struct Node {
    buf: [u8; MAX_NODE_SIZE],
}

impl Default for Node {
    fn default() -> Self {
        Self {
            buf: [0; MAX_NODE_SIZE],
        }
    }
}

impl Node {
    /// Reads the 4-byte node header (magic + arity) at `offset`, then the rest
    /// of the node once arity is known, never reading past `limit` (the
    /// container length, or the parent's declared `CSpace` ceiling during
    /// descent). Returns the node's arity.
    ///
    /// # Errors
    /// - If arity is 0, or the node (per its own declared arity) would not fit
    ///   entirely below `limit` [`Error::InvalidIndexNode`].
    /// - If the byte-source fails to supply the requested bytes.
    pub fn load<S: ByteSource>(&mut self, source: &mut S, offset: u64, limit: u64) -> Result<u8> {
        source.read_exact_at(&mut self.buf[0..4], offset)?;
        let arity = self.buf[3];
        if arity == 0 {
            return Err(Error::InvalidIndexNode("node arity is zero"));
        }
        let size = node_size(arity);
        if offset
            .checked_add(size as u64)
            .is_none_or(|end| end > limit)
        {
            return Err(Error::InvalidIndexNode(
                "node does not fit within its declared bound",
            ));
        }
        source.read_exact_at(&mut self.buf[4..size], offset + 4)?;
        Ok(arity)
    }

    /// Arity `A` of the currently loaded node (1..=255).
    #[must_use]
    pub fn arity(&self) -> u8 {
        self.buf[3]
    }

    /// Codec identifier, non-zero once validated.
    #[must_use]
    pub fn codec(&self) -> u8 {
        let a = usize::from(self.arity());
        self.buf[8 * a + 7]
    }

    /// Container version, non-zero once validated; only 1 is supported.
    #[must_use]
    pub fn version(&self) -> u8 {
        let a = usize::from(self.arity());
        self.buf[16 * a + 14]
    }

    /// Ceiling of this node's `CSpace` pointer table (relative, add a bias to
    /// get an absolute container offset).
    #[must_use]
    pub fn c_ptr_max(&self) -> u64 {
        let a = usize::from(self.arity());
        u48le(&self.buf, 16 * a + 8)
    }

    /// Ceiling of this node's `DSpace` pointer table, relative to this node.
    #[must_use]
    pub fn d_ptr_max(&self) -> u64 {
        let a = usize::from(self.arity());
        u48le(&self.buf, 8 * a)
    }

    /// Absolute `DSpace` offset of slot `i` (0..=arity), given the bias
    /// accumulated from the root to this node.
    #[must_use]
    pub fn d_off(&self, i: usize, d_bias: u64) -> u64 {
        if i == 0 {
            d_bias
        } else {
            d_bias + u48le(&self.buf, 8 * i)
        }
    }

    /// Absolute `CSpace` offset of slot `i`'s primary pointer (0..arity), given
    /// the bias accumulated from the root to this node.
    #[must_use]
    pub fn c_off(&self, i: usize, c_bias: u64) -> u64 {
        let a = usize::from(self.arity());
        c_bias + u48le(&self.buf, 8 * i + 8 * a + 8)
    }

    /// Compressed-length hint for slot `i`, in 1024-byte units; 0 means
    /// "unbounded, defer to the node's `cPtrMax`".
    #[must_use]
    pub fn c_len(&self, i: usize) -> u8 {
        let a = usize::from(self.arity());
        self.buf[8 * i + 8 * a + 14]
    }

    /// Raw secondary index tag of slot `i`.
    #[must_use]
    pub fn s_tag(&self, i: usize) -> u8 {
        let a = usize::from(self.arity());
        self.buf[8 * i + 8 * a + 15]
    }

    /// Raw tertiary index tag of slot `i`, the branch/leaf discriminator.
    #[must_use]
    pub fn t_tag(&self, i: usize) -> u8 {
        self.buf[8 * i + 7]
    }

    /// True when slot `i` points at a compressed chunk rather than a child node.
    #[must_use]
    pub fn is_leaf(&self, i: usize) -> bool {
        self.t_tag(i) != BRANCH_TAG
    }

    /// `CSpace` span covering slot `i`'s primary bytes, given the bias
    /// accumulated from the root to this node.
    ///
    /// For `i >= arity` (a secondary/tertiary tag pointing past the table,
    /// meaning "absent"), returns a zero-size range anchored at this node's
    /// `CSpace` ceiling.
    #[must_use]
    pub fn c_off_range(&self, i: usize, c_bias: u64) -> Range {
        let ceiling = c_bias + self.c_ptr_max();
        if i >= usize::from(self.arity()) {
            return Range::empty_at(ceiling);
        }
        let start = self.c_off(i, c_bias);
        let len = self.c_len(i);
        let high = if len == 0 {
            ceiling
        } else {
            ceiling.min(start + 1024 * u64::from(len))
        };
        Range::new(start, high)
    }

    /// Enforces every structural invariant from the container layout: magic,
    /// duplicate arity footer, reserved bytes, tag validity, non-zero
    /// codec/version, monotonic `DPtr` table, bounded `CPtr` table, and the CRC.
    ///
    /// Does not check root-specific (`cPtrMax == container length`) or
    /// parent/child consistency invariants; those are enforced by the root
    /// locator and the descent engine respectively, since they require
    /// context this node alone doesn't have.
    #[must_use]
    pub fn validate(&self) -> bool {
        let arity = self.arity();
        let a = usize::from(arity);
        let size = node_size(arity);

        if self.buf[0..3] != MAGIC {
            return false;
        }
        if self.buf[size - 1] != arity {
            return false;
        }
        for i in 0..a {
            if self.buf[8 * i + 6] != 0 {
                return false;
            }
            let tag = self.t_tag(i);
            if (RESERVED_TAG_LOW..BRANCH_TAG).contains(&tag) {
                return false;
            }
        }
        if self.buf[8 * a + 6] != 0 {
            return false;
        }
        if self.codec() == 0 || self.version() == 0 {
            return false;
        }

        let mut prev_d = 0u64;
        for i in 1..=a {
            let d = self.d_off(i, 0);
            if d < prev_d {
                return false;
            }
            prev_d = d;
        }

        let c_ptr_max = self.c_ptr_max();
        for i in 0..a {
            if self.c_off(i, 0) > c_ptr_max {
                return false;
            }
        }

        self.checksum_ok()
    }

    fn checksum_ok(&self) -> bool {
        let size = node_size(self.arity());
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.buf[6..size]);
        let crc = hasher.finalize();
        // XOR-fold of a u32 is guaranteed to fit in u16.
        #[allow(clippy::cast_possible_truncation)]
        let folded = ((crc >> 16) ^ (crc & 0xFFFF)) as u16;
        let stored = u16::from_le_bytes([self.buf[4], self.buf[5]]);
        folded == stored
    }
}

#[cfg(test)]
/// Hand-assembles valid (and selectively corrupted) node buffers, field by
/// field, matching the layout table bit-for-bit. Not part of the public API:
/// the spec excludes a RAC writer from scope, so this stays test-only.
pub(crate) struct NodeBuilder {
    arity: u8,
    d_ptrs: Vec<u64>,
    c_ptrs: Vec<u64>,
    t_tags: Vec<u8>,
    s_tags: Vec<u8>,
    c_lens: Vec<u8>,
    c_ptr_max: u64,
    codec: u8,
    version: u8,
}

#[cfg(test)]
impl NodeBuilder {
    pub(crate) fn new(arity: u8) -> Self {
        Self {
            arity,
            d_ptrs: vec![0; arity as usize + 1],
            c_ptrs: vec![0; arity as usize + 1],
            t_tags: vec![0x01; arity as usize],
            s_tags: vec![0xFF; arity as usize],
            c_lens: vec![0; arity as usize],
            c_ptr_max: 0,
            codec: 1,
            version: 1,
        }
    }

    pub(crate) fn d_ptr(mut self, i: usize, value: u64) -> Self {
        self.d_ptrs[i] = value;
        self
    }

    pub(crate) fn c_ptr(mut self, i: usize, value: u64) -> Self {
        self.c_ptrs[i] = value;
        self
    }

    pub(crate) fn t_tag(mut self, i: usize, value: u8) -> Self {
        self.t_tags[i] = value;
        self
    }

    pub(crate) fn s_tag(mut self, i: usize, value: u8) -> Self {
        self.s_tags[i] = value;
        self
    }

    pub(crate) fn c_ptr_max(mut self, value: u64) -> Self {
        self.c_ptr_max = value;
        self
    }

    pub(crate) fn codec(mut self, value: u8) -> Self {
        self.codec = value;
        self
    }

    pub(crate) fn version(mut self, value: u8) -> Self {
        self.version = value;
        self
    }

    fn put_u48(buf: &mut [u8], offset: usize, value: u64) {
        buf[offset..offset + 6].copy_from_slice(&value.to_le_bytes()[0..6]);
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let a = self.arity as usize;
        let size = node_size(self.arity);
        let mut buf = vec![0u8; size];
        buf[0..3].copy_from_slice(&MAGIC);
        buf[3] = self.arity;
        for i in 1..=a {
            Self::put_u48(&mut buf, 8 * i, self.d_ptrs[i]);
        }
        for i in 0..a {
            buf[8 * i + 7] = self.t_tags[i];
        }
        Self::put_u48(&mut buf, 8 * a, self.d_ptrs[a]);
        buf[8 * a + 7] = self.codec;
        for i in 0..a {
            Self::put_u48(&mut buf, 8 * a + 8 * i + 8, self.c_ptrs[i]);
            buf[8 * a + 8 * i + 14] = self.c_lens[i];
            buf[8 * a + 8 * i + 15] = self.s_tags[i];
        }
        Self::put_u48(&mut buf, 16 * a + 8, self.c_ptr_max);
        buf[16 * a + 14] = self.version;
        buf[16 * a + 15] = self.arity;

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&buf[6..size]);
        let crc = hasher.finalize();
        // XOR-fold of a u32 is guaranteed to fit in u16.
        #[allow(clippy::cast_possible_truncation)]
        let folded = ((crc >> 16) ^ (crc & 0xFFFF)) as u16;
        buf[4..6].copy_from_slice(&folded.to_le_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load_from(bytes: &[u8]) -> Node {
        let mut source = Cursor::new(bytes.to_vec());
        let mut node = Node::default();
        node.load(&mut source, 0, bytes.len() as u64).unwrap();
        node
    }

    #[test]
    fn test_minimal_leaf_node_validates() {
        let bytes = NodeBuilder::new(1)
            .d_ptr(1, 100)
            .c_ptr(0, 0)
            .c_ptr_max(50)
            .build();
        let node = load_from(&bytes);
        assert!(node.validate());
        assert_eq!(node.d_ptr_max(), 100);
        assert_eq!(node.c_ptr_max(), 50);
        assert!(node.is_leaf(0));
    }

    #[test]
    fn test_branch_tag_discriminates() {
        let bytes = NodeBuilder::new(2)
            .d_ptr(1, 10)
            .d_ptr(2, 20)
            .t_tag(0, 0xFE)
            .t_tag(1, 0x01)
            .build();
        let node = load_from(&bytes);
        assert!(node.validate());
        assert!(!node.is_leaf(0));
        assert!(node.is_leaf(1));
    }

    #[test]
    fn test_reserved_tag_rejected() {
        let bytes = NodeBuilder::new(1).d_ptr(1, 10).t_tag(0, 0xC5).build();
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_leaf_tag_0xff_is_valid_absent_sentinel() {
        let bytes = NodeBuilder::new(1).d_ptr(1, 10).t_tag(0, 0xFF).build();
        let node = load_from(&bytes);
        assert!(node.validate());
        assert!(node.is_leaf(0));
    }

    #[test]
    fn test_node_level_reserved_byte_rejected() {
        let mut bytes = NodeBuilder::new(1).d_ptr(1, 10).build();
        let a = 1usize;
        let size = bytes.len();
        bytes[8 * a + 6] = 0xAB;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&bytes[6..size]);
        let crc = hasher.finalize();
        #[allow(clippy::cast_possible_truncation)]
        let folded = ((crc >> 16) ^ (crc & 0xFFFF)) as u16;
        bytes[4..6].copy_from_slice(&folded.to_le_bytes());
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_non_monotonic_dptr_rejected() {
        let bytes = NodeBuilder::new(2)
            .d_ptr(1, 50)
            .d_ptr(2, 10) // goes backwards
            .build();
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_cptr_over_max_rejected() {
        let bytes = NodeBuilder::new(1)
            .d_ptr(1, 10)
            .c_ptr(0, 100)
            .c_ptr_max(50)
            .build();
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_corrupt_crc_rejected() {
        let mut bytes = NodeBuilder::new(1).d_ptr(1, 10).build();
        bytes[4] ^= 0xFF;
        bytes[5] ^= 0xFF;
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_duplicate_arity_mismatch_rejected() {
        let mut bytes = NodeBuilder::new(1).d_ptr(1, 10).build();
        let last = bytes.len() - 1;
        bytes[last] = 2;
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_zero_codec_rejected() {
        let bytes = NodeBuilder::new(1).d_ptr(1, 10).codec(0).build();
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_zero_version_rejected() {
        let bytes = NodeBuilder::new(1).d_ptr(1, 10).version(0).build();
        let node = load_from(&bytes);
        assert!(!node.validate());
    }

    #[test]
    fn test_c_off_range_bounded_by_clen() {
        let mut builder = NodeBuilder::new(1).d_ptr(1, 10).c_ptr(0, 0).c_ptr_max(10_000);
        builder.c_lens[0] = 2; // 2048 bytes
        let bytes = builder.build();
        let node = load_from(&bytes);
        let range = node.c_off_range(0, 0);
        assert_eq!(range, Range::new(0, 2048));
    }

    #[test]
    fn test_c_off_range_past_arity_is_absent() {
        let bytes = NodeBuilder::new(1).d_ptr(1, 10).c_ptr_max(500).build();
        let node = load_from(&bytes);
        let range = node.c_off_range(5, 0);
        assert_eq!(range, Range::empty_at(500));
    }
}
