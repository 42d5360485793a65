//! Self-indexing, block-compressed interval stream.
//!
//! A [`Writer`] ingests a strictly coordinate-sorted stream of user records,
//! compresses them into BGZF blocks via [`noodles_bgzf`], and on [`Writer::close`]
//! appends a spatial index mapping block coverage intervals to block virtual
//! offsets. A [`Reader`] recovers that index from a trailer pointer in the
//! file's final empty BGZF block and supports both full iteration and overlap
//! queries against arbitrary genomic ranges.
//!
//! The concrete record type is never fixed by this crate: callers implement
//! [`Record`] to say how their type serializes to bytes, what genomic
//! [`CollatingInterval`] it occupies, and how to deserialize it back.

mod block_stream;
mod wire;
pub mod dictionary;
pub mod error;
pub mod index;
pub mod interval;
pub mod reader;
pub mod record;
pub mod trailer;
pub mod vpos;
pub mod writer;

pub use dictionary::{Contig, SequenceDictionary};
pub use error::BcisError;
pub use index::{IndexEntry, IntervalTree};
pub use interval::CollatingInterval;
pub use reader::{OverlapQuery, Reader, ReaderBuilder, RecordIter};
pub use record::Record;
pub use vpos::VirtualOffset;
pub use writer::{Writer, WriterBuilder};

/// Result type returned by every fallible public operation in this crate.
pub type Result<T> = std::result::Result<T, BcisError>;

/// The version tag written into every file header.
pub const FORMAT_VERSION: &str = "1";
