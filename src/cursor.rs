//! Cursor / descent engine: walks from the root to the leaf containing a
//! requested `DSpace` offset, and yields successive leaf chunks in order.

use crate::chunk::Chunk;
use crate::common::byte_source::ByteSource;
use crate::node::Node;
use crate::range::Range;
use crate::root::RootInfo;
use crate::{Error, Result};

/// Maintains the current position in decompressed space and the path state
/// needed to resume iteration without retaining a pool of loaded nodes.
///
/// Each `seek_to_chunk_containing` restarts the walk from the root on the
/// following `next_chunk` call; see the crate-level state-machine note.
pub struct Cursor {
    needs_resolve: bool,
    seek_position: i64,
    curr_node: Node,
    curr_c_bias: u64,
    curr_d_bias: u64,
    next_slot: usize,
    err: Option<Error>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            needs_resolve: true,
            seek_position: 0,
            curr_node: Node::default(),
            curr_c_bias: 0,
            curr_d_bias: 0,
            next_slot: 0,
            err: None,
        }
    }
}

impl Cursor {
    /// Requests that the next chunk yielded cover `d`. Cheap: performs no I/O,
    /// just records the target and marks the cursor as needing to descend.
    ///
    /// # Errors
    /// - If `d` is negative [`Error::Seek`], latched as the reader's sticky error.
    pub fn seek_to_chunk_containing(&mut self, d: i64) -> Result<()> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        if d < 0 {
            let err = Error::Seek(d);
            self.err = Some(err.clone());
            return Err(err);
        }
        self.seek_position = d;
        self.needs_resolve = true;
        Ok(())
    }

    /// Yields the next non-empty chunk in `DSpace` order, or `Ok(None)` at
    /// end-of-stream. Empty leaves are skipped but still advance the cursor's
    /// position.
    ///
    /// # Errors
    /// - Any descent or node-validation failure [`Error::InvalidIndexNode`],
    ///   latched as the reader's sticky error.
    /// - Byte-source I/O failures, likewise latched.
    pub fn next_chunk<S: ByteSource>(
        &mut self,
        source: &mut S,
        root: &RootInfo,
    ) -> Result<Option<Chunk>> {
        if let Some(e) = &self.err {
            return Err(e.clone());
        }
        match self.next_chunk_inner(source, root) {
            Ok(chunk) => Ok(chunk),
            Err(e) => {
                self.err = Some(e.clone());
                Err(e)
            }
        }
    }

    fn next_chunk_inner<S: ByteSource>(
        &mut self,
        source: &mut S,
        root: &RootInfo,
    ) -> Result<Option<Chunk>> {
        loop {
            if self.needs_resolve {
                let Ok(position) = u64::try_from(self.seek_position) else {
                    return Ok(None);
                };
                if position >= root.decompressed_size {
                    return Ok(None);
                }
                self.needs_resolve = false;
                self.descend(source, root)?;
            }

            while self.next_slot < usize::from(self.curr_node.arity()) {
                let i = self.next_slot;
                self.next_slot += 1;
                let d_low = self.curr_node.d_off(i, self.curr_d_bias);
                let d_high = self.curr_node.d_off(i + 1, self.curr_d_bias);
                self.seek_position = i64::try_from(d_high).unwrap_or(i64::MAX);
                if d_low == d_high {
                    continue;
                }
                return Ok(Some(self.build_chunk(i, d_low, d_high)));
            }
            self.needs_resolve = true;
        }
    }

    fn build_chunk(&self, i: usize, d_low: u64, d_high: u64) -> Chunk {
        let c_bias = self.curr_c_bias;
        let s_tag = self.curr_node.s_tag(i);
        let t_tag = self.curr_node.t_tag(i);
        Chunk {
            d_range: Range::new(d_low, d_high),
            c_primary: self.curr_node.c_off_range(i, c_bias),
            c_secondary: self.curr_node.c_off_range(usize::from(s_tag), c_bias),
            c_tertiary: self.curr_node.c_off_range(usize::from(t_tag), c_bias),
            s_tag,
            t_tag,
            codec: self.curr_node.codec(),
        }
    }

    /// Walks from the root to the leaf slot containing `seek_position`,
    /// validating each child against its parent along the way.
    fn descend<S: ByteSource>(&mut self, source: &mut S, root: &RootInfo) -> Result<()> {
        let mut c_bias = 0u64;
        let mut d_bias = 0u64;
        self.curr_node
            .load(source, root.c_offset, root.container_len)
            .map_err(|_| Error::InvalidIndexNode("root node no longer loads during descent"))?;
        if !self.curr_node.validate() {
            return Err(Error::InvalidIndexNode(
                "root node failed validation during descent",
            ));
        }
        let mut window = self.curr_node.c_ptr_max();

        loop {
            let position = u64::try_from(self.seek_position).unwrap_or(0);
            let i = self.find_chunk_containing(position, d_bias);
            if self.curr_node.is_leaf(i) {
                self.next_slot = i;
                self.curr_c_bias = c_bias;
                self.curr_d_bias = d_bias;
                return Ok(());
            }

            let parent_codec = self.curr_node.codec();
            let parent_version = self.curr_node.version();
            let parent_c_off_max = c_bias + self.curr_node.c_ptr_max();
            let child_c_offset = self.curr_node.c_off(i, c_bias);
            let s_tag = usize::from(self.curr_node.s_tag(i));
            let child_c_bias = if s_tag < usize::from(self.curr_node.arity()) {
                self.curr_node.c_off(s_tag, c_bias)
            } else {
                c_bias
            };
            let subtree_d_bias = self.curr_node.d_off(i, d_bias);
            let child_d_size = self.curr_node.d_off(i + 1, d_bias) - subtree_d_bias;

            self.load_and_validate(
                source,
                child_c_offset,
                parent_codec,
                parent_version,
                parent_c_off_max,
                child_c_bias,
                child_d_size,
            )?;

            let child_window = self.curr_node.c_ptr_max();
            if child_window >= window {
                return Err(Error::InvalidIndexNode(
                    "child CSpace window did not shrink during descent",
                ));
            }
            window = child_window;

            c_bias = child_c_bias;
            d_bias = subtree_d_bias;
        }
    }

    /// Smallest slot index `i` with `dOff(i+1, d_bias) > d`, via binary search
    /// over the node's `DPtr` table (non-decreasing by validated invariant).
    fn find_chunk_containing(&self, d: u64, d_bias: u64) -> usize {
        let arity = usize::from(self.curr_node.arity());
        let mut lo = 0usize;
        let mut hi = arity;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.curr_node.d_off(mid + 1, d_bias) > d {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        lo
    }

    #[allow(clippy::too_many_arguments)]
    fn load_and_validate<S: ByteSource>(
        &mut self,
        source: &mut S,
        child_c_offset: u64,
        parent_codec: u8,
        parent_version: u8,
        parent_c_off_max: u64,
        child_c_bias: u64,
        child_d_size: u64,
    ) -> Result<()> {
        self.curr_node
            .load(source, child_c_offset, parent_c_off_max)
            .map_err(|_| Error::InvalidIndexNode("child node does not fit under parent ceiling"))?;
        if !self.curr_node.validate() {
            return Err(Error::InvalidIndexNode("child node failed validation"));
        }
        let child_codec = self.curr_node.codec();
        if parent_codec | child_codec != parent_codec {
            return Err(Error::InvalidIndexNode(
                "child codec is not a subset of its parent's",
            ));
        }
        if parent_version < self.curr_node.version() {
            return Err(Error::InvalidIndexNode(
                "child version exceeds its parent's",
            ));
        }
        if parent_c_off_max < child_c_bias + self.curr_node.c_ptr_max() {
            return Err(Error::InvalidIndexNode(
                "child CSpace ceiling exceeds parent's declared bound",
            ));
        }
        if self.curr_node.d_ptr_max() != child_d_size {
            return Err(Error::InvalidIndexNode(
                "child dPtrMax disagrees with parent's declared DSpace size",
            ));
        }
        Ok(())
    }
}
