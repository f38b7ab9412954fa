//! The reader's output value: one leaf entry resolved to compressed spans.

use crate::range::Range;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
/// One leaf entry of the index, combining a `DSpace` range with up to three
/// `CSpace` ranges and the codec identifier inherited from its containing node.
///
/// Returned by value from [`crate::reader::RacReader::next_chunk`]; it holds no
/// borrow on the reader's internal scratch buffer, per the "lifecycle" rule
/// that node buffers are overwritten on every load.
pub struct Chunk {
    /// `DSpace` range this chunk covers.
    pub d_range: Range,
    /// `CSpace` range of the chunk's primary compressed bytes.
    pub c_primary: Range,
    /// `CSpace` range of optional auxiliary bytes (e.g. a shared dictionary);
    /// empty when unused.
    pub c_secondary: Range,
    /// `CSpace` range of a second optional auxiliary region; empty when unused.
    pub c_tertiary: Range,
    /// Raw secondary index tag from the leaf, exposed for callers that need it.
    pub s_tag: u8,
    /// Raw tertiary index tag from the leaf, exposed for callers that need it.
    pub t_tag: u8,
    /// Codec identifier inherited from the containing node.
    pub codec: u8,
}
