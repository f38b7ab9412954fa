//! Extension to any seekable reader for reading an exact span at an absolute offset.
//!
//! This module provides one primitive, [`ByteSource::read_exact_at`], used by
//! every node load in the reader. Two capabilities are unified behind it:
//!
//! * Sources that support **positional reads** (reading at an offset without
//!   disturbing the stream's current position) use that path directly.
//! * Everything else falls back to seek-then-read-until-full.
//!
//! A short read exactly at EOF that still fills the buffer completely is not an
//! error; anything short of a full buffer is.

use std::fs::File;
use std::io::{BufReader, Read, Result as IoResult, Seek, SeekFrom};
use std::io::Cursor as IoCursor;

use crate::Result;

/// Trait for byte sources that can fill a buffer from an absolute offset.
///
/// Implemented generically for any [`Read`] + [`Seek`] via seek-then-read, and
/// specialized for [`std::fs::File`] on Unix via positional reads, which do not
/// perturb the file's shared cursor. This reader is documented single-owner
/// (one in-flight call at a time, never concurrent), so there is no correctness
/// reason to withhold the positional-read fast path the way some upstream
/// callers historically have.
pub trait ByteSource {
    /// Fills `buf` completely with the bytes starting at `offset`.
    ///
    /// # Errors
    /// - If the underlying source does not have enough bytes at `offset` to
    ///   fill `buf`, or the underlying I/O operation fails.
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()>;
}

fn seek_then_read<R: Read + Seek>(source: &mut R, buf: &mut [u8], offset: u64) -> IoResult<()> {
    source.seek(SeekFrom::Start(offset))?;
    source.read_exact(buf)
}

#[cfg(unix)]
impl ByteSource for File {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        use std::os::unix::fs::FileExt;
        FileExt::read_exact_at(self, buf, offset).map_err(Into::into)
    }
}

#[cfg(not(unix))]
impl ByteSource for File {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        seek_then_read(self, buf, offset).map_err(Into::into)
    }
}

impl<R: Read + Seek> ByteSource for BufReader<R> {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        seek_then_read(self, buf, offset).map_err(Into::into)
    }
}

impl<T: AsRef<[u8]>> ByteSource for IoCursor<T> {
    fn read_exact_at(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        seek_then_read(self, buf, offset).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    /// Verifies that a read in the middle of a buffer returns exactly the
    /// requested span, not the whole source.
    fn test_read_exact_at_middle() {
        let data = b"0123456789".to_vec();
        let mut source = Cursor::new(data);
        let mut buf = [0u8; 4];
        source.read_exact_at(&mut buf, 3).unwrap();
        assert_eq!(&buf, b"3456");
    }

    #[test]
    /// A read that would run past the end of the source fails rather than
    /// returning a partially filled buffer.
    fn test_read_exact_at_past_eof_fails() {
        let data = b"abc".to_vec();
        let mut source = Cursor::new(data);
        let mut buf = [0u8; 4];
        assert!(source.read_exact_at(&mut buf, 0).is_err());
    }

    #[test]
    /// A read that exactly reaches EOF with a full buffer is not an error.
    fn test_read_exact_at_exact_eof_ok() {
        let data = b"abcd".to_vec();
        let mut source = Cursor::new(data);
        let mut buf = [0u8; 4];
        source.read_exact_at(&mut buf, 0).unwrap();
        assert_eq!(&buf, b"abcd");
    }
}
