//! Public entry point: ties the byte source, root locator, and cursor together.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::chunk::Chunk;
use crate::common::byte_source::ByteSource;
use crate::cursor::Cursor;
use crate::root::{self, RootInfo};
use crate::{Error, Result};

/// Minimum container length: the smallest a valid node (arity 1) can be.
const MIN_CONTAINER_LEN: u64 = 32;

/// Reader over a Random Access Compressed container: a seekable index that
/// resolves a logical (decompressed-space) offset to the compressed chunks
/// needed to materialize it.
///
/// Single-owner, not concurrent-safe: all operations run on one caller-supplied
/// thread, and the reader mutates one internal 4096-byte node buffer on every
/// load. See the crate-level documentation for a full overview.
///
/// # Examples
///
/// ```
/// use rac_reader::{RacReader, Result};
/// use std::io::Cursor;
///
/// fn read_all(bytes: Vec<u8>) -> Result<()> {
///     let len = bytes.len() as u64;
///     let mut reader = RacReader::new(Cursor::new(bytes), len)?;
///     reader.seek_to_chunk_containing(0)?;
///     while let Some(chunk) = reader.next_chunk()? {
///         let _ = chunk.d_range;
///     }
///     Ok(())
/// }
/// ```
pub struct RacReader<S> {
    byte_source: S,
    root: RootInfo,
    cursor: Cursor,
}

impl<S: ByteSource> RacReader<S> {
    /// Builds a reader over `byte_source`, an already-open seekable container
    /// of `compressed_size` bytes, locating the index root eagerly.
    ///
    /// # Errors
    /// - If `compressed_size` is below the minimum valid node size (32 bytes)
    ///   [`Error::Config`].
    /// - If no valid index root is found at either placement
    ///   [`Error::InvalidContainer`].
    /// - If the root's version is not 1 [`Error::UnsupportedVersion`].
    /// - If the byte-source fails while locating the root.
    pub fn new(mut byte_source: S, compressed_size: u64) -> Result<Self> {
        if compressed_size < MIN_CONTAINER_LEN {
            return Err(Error::Config(
                "container length is below the minimum valid node size",
            ));
        }
        let root = root::locate(&mut byte_source, compressed_size)?;
        Ok(Self {
            byte_source,
            root,
            cursor: Cursor::default(),
        })
    }

    /// Total size of the logical decompressed stream.
    #[must_use]
    pub fn decompressed_size(&self) -> u64 {
        self.root.decompressed_size
    }

    /// Requests that the next chunk yielded by [`next_chunk`](Self::next_chunk)
    /// cover decompressed-space offset `d`. Cheap: performs no I/O.
    ///
    /// # Errors
    /// - If `d` is negative [`Error::Seek`].
    pub fn seek_to_chunk_containing(&mut self, d: i64) -> Result<()> {
        self.cursor.seek_to_chunk_containing(d)
    }

    /// Returns the next non-empty chunk in decompressed-space order, or
    /// `Ok(None)` once the cursor has passed the last chunk.
    ///
    /// # Errors
    /// - Any structural or parent/child validation failure encountered while
    ///   descending the index [`Error::InvalidIndexNode`].
    /// - Byte-source I/O failures.
    pub fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        self.cursor.next_chunk(&mut self.byte_source, &self.root)
    }
}

impl RacReader<BufReader<File>> {
    /// Opens `path` and builds a reader over it, using the file's length as
    /// the container size.
    ///
    /// # Errors
    /// - If the file cannot be opened or its length cannot be determined.
    /// - Any error [`RacReader::new`] can return.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let compressed_size = file.metadata()?.len();
        Self::new(BufReader::new(file), compressed_size)
    }
}
