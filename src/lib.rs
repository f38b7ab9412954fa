#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::absolute_paths)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::all)]
#![warn(rustdoc::redundant_explicit_links)]
#![warn(clippy::needless_doctest_main)]
#![warn(clippy::default_constructed_unit_structs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(rustdoc::private_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/*!
Seekable reader for Random Access Compressed (RAC) containers.

A RAC container is a persistent, on-disk, multi-way tree: interior nodes
delegate ranges of decompressed ("`DSpace`") bytes to children, and leaves point
at compressed ("`CSpace`") spans in the container. This crate parses and
validates that tree and resolves any `DSpace` offset to the minimal set of
chunks covering it, without trusting a single field it hasn't yet validated.

## Getting started

```
use rac_reader::{RacReader, Result};
use std::io::Cursor;

fn read_all(bytes: Vec<u8>) -> Result<()> {
    let len = bytes.len() as u64;
    let mut reader = RacReader::new(Cursor::new(bytes), len)?;

    reader.seek_to_chunk_containing(0)?;
    while let Some(chunk) = reader.next_chunk()? {
        // `chunk.c_primary` is the CSpace span to hand to an external codec,
        // keyed by `chunk.codec`; decompression itself is out of scope here.
        let _ = (chunk.d_range, chunk.c_primary, chunk.codec);
    }
    Ok(())
}
```

## Opening a file directly

```rust,no_run
use rac_reader::{RacReader, Result};

fn open_container() -> Result<()> {
    let mut reader = RacReader::open("container.rac")?;
    reader.seek_to_chunk_containing(4096)?;
    if let Some(chunk) = reader.next_chunk()? {
        assert!(chunk.d_range.contains(4096));
    }
    Ok(())
}
```

## Scope

This crate surfaces chunks and the codec identifier inherited by each; it does
not decompress chunk payloads, write RAC containers, or stitch chunk outputs
together into a contiguous random-access stream. It assumes a single owner per
reader and container format version 1.
*/

pub mod chunk;
pub mod common;
pub mod cursor;
pub mod node;
pub mod range;
pub mod reader;
pub mod root;

#[doc(inline)]
pub use crate::chunk::Chunk;
#[doc(inline)]
pub use crate::common::errors::{Error, Result};
#[doc(inline)]
pub use crate::range::Range;
#[doc(inline)]
pub use crate::reader::RacReader;
