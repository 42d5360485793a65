//! Error kinds surfaced by writers and readers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every way a [`crate::Writer`] or [`crate::Reader`] operation can fail.
#[derive(Error, Debug)]
pub enum BcisError {
    /// A collating interval named a contig absent from the dictionary.
    #[error("unknown contig {name:?}")]
    UnknownContig { name: String },

    /// A collating interval violated `1 <= start <= end <= contig.length`.
    #[error("interval ({contig_index}, {start}, {end}) out of bounds for contig of length {contig_length}")]
    OutOfBounds {
        contig_index: u32,
        start: u32,
        end: u32,
        contig_length: u32,
    },

    /// A record was written whose interval precedes the previously written one.
    #[error("record out of order: {next:?} precedes previously written {last:?}")]
    NotSorted {
        last: crate::interval::CollatingInterval,
        next: crate::interval::CollatingInterval,
    },

    /// An I/O failure while writing the payload, index, or trailer.
    #[error("write failed at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An I/O failure while reading the payload, index, or trailer.
    #[error("read failed at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The final 40 bytes of the file did not match the trailer template.
    #[error("corrupt trailer: {reason}")]
    CorruptTrailer { reason: &'static str },

    /// An index entry referenced an unknown contig, or the index section was malformed.
    #[error("corrupt index: {reason}")]
    CorruptIndex { reason: String },

    /// The file's class tag did not match the class tag requested by the reader.
    #[error("class mismatch: file declares {found:?}, reader expected {expected:?}")]
    ClassMismatch { found: String, expected: String },
}

impl BcisError {
    pub(crate) fn write_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BcisError::WriteFailed { path: path.into(), source }
    }

    pub(crate) fn read_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BcisError::ReadFailed { path: path.into(), source }
    }
}
