//! The collaborator contract every payload type must satisfy.

use std::io::{self, Read, Write};

use crate::interval::CollatingInterval;

/// A user record that can be serialized into the block stream and knows the
/// genomic interval it occupies.
///
/// `write_to` plays the role of the serializer: it writes the record's bytes
/// and returns the interval the writer should collate on. `read_from` plays
/// the role of the deserializer: given a reader positioned at the start of a
/// record, it must consume exactly the bytes `write_to` would have produced.
pub trait Record: Sized {
    /// Identifies this record type in the file header's class tag. Checked
    /// by [`crate::reader::Reader`] against the file's declared class tag,
    /// surfacing [`crate::error::BcisError::ClassMismatch`] on a mismatch.
    const CLASS_TAG: &'static str;

    /// The collating interval this record occupies.
    fn interval(&self) -> CollatingInterval;

    /// Writes this record to `sink` and returns its collating interval.
    ///
    /// Implementations must not seek the sink.
    fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<CollatingInterval>;

    /// Reads exactly one record from `reader`.
    fn read_from<R: Read>(reader: &mut R) -> io::Result<Self>;
}
