//! Common errors used throughout `rac-reader`.

use std::io::Error as StdIoError;
use std::result::Result as StdResult;
use thiserror::Error;

#[derive(Error, Debug)]
/// Standard error type used throughout `rac-reader`.
///
/// Every variant is sticky: once a [`crate::reader::RacReader`] method returns
/// one of these, every later call on the same reader returns a clone of it.
/// End-of-stream is deliberately not a variant here; [`next_chunk`](crate::reader::RacReader::next_chunk)
/// signals it as `Ok(None)` since it is neither sticky nor a failure.
pub enum Error {
    /// Construction-time configuration was invalid: a container length below
    /// the minimum valid node size (32 bytes).
    #[error("invalid reader configuration: {0}")]
    Config(&'static str),
    /// I/O error from the byte-source, surfaced unchanged.
    #[error("I/O error reading container")]
    Io(#[from] StdIoError),
    /// No valid index root node was found at either the head or tail placement.
    #[error("invalid container: {0}")]
    InvalidContainer(&'static str),
    /// A node failed a structural invariant, or a child node failed
    /// parent/child consistency with its parent during descent.
    #[error("invalid index node: {0}")]
    InvalidIndexNode(&'static str),
    /// The root node's version is not 1, the only version this reader
    /// understands.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),
    /// `seek_to_chunk_containing` was called with a negative offset.
    #[error("invalid seek target {0}")]
    Seek(i64),
}

impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::Config(s) => Self::Config(s),
            // io::Error isn't Clone; preserve kind and message for the sticky copy.
            Self::Io(e) => Self::Io(StdIoError::new(e.kind(), e.to_string())),
            Self::InvalidContainer(s) => Self::InvalidContainer(s),
            Self::InvalidIndexNode(s) => Self::InvalidIndexNode(s),
            Self::UnsupportedVersion(v) => Self::UnsupportedVersion(*v),
            Self::Seek(d) => Self::Seek(*d),
        }
    }
}

/// Standard result type used throughout `rac-reader`.
pub type Result<T> = StdResult<T, Error>;
