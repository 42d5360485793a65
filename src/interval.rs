//! Collating intervals: the `(contig, start, end)` ordering and overlap key
//! shared by records and index entries.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::dictionary::SequenceDictionary;
use crate::error::BcisError;

/// On-disk size of a [`CollatingInterval`]: `u32` contig index + `u32` start + `u32` end.
pub const WIRE_SIZE: usize = 12;

/// A `(contig_index, start, end)` triple, 1-based and closed on both ends.
///
/// Total order is lexicographic on `(contig_index, start, end)`, which is
/// also the order records must be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollatingInterval {
    contig_index: u32,
    start: u32,
    end: u32,
}

impl CollatingInterval {
    /// Constructs an interval, validating it against `contig_length`.
    pub fn new(contig_index: u32, start: u32, end: u32, contig_length: u32) -> Result<Self, BcisError> {
        if start < 1 || start > end || end > contig_length {
            return Err(BcisError::OutOfBounds {
                contig_index,
                start,
                end,
                contig_length,
            });
        }
        Ok(CollatingInterval { contig_index, start, end })
    }

    /// Constructs an interval by resolving `name` against `dictionary`.
    pub fn from_name(
        dictionary: &SequenceDictionary,
        name: &str,
        start: u32,
        end: u32,
    ) -> Result<Self, BcisError> {
        let contig = dictionary
            .contig_by_name(name)
            .ok_or_else(|| BcisError::UnknownContig { name: name.to_string() })?;
        Self::new(contig.index, start, end, contig.length)
    }

    /// Constructs an interval without validating bounds.
    ///
    /// Used internally when reconstructing intervals already validated at
    /// write time (index entries, tree lookups) or in tests.
    pub const fn new_unchecked(contig_index: u32, start: u32, end: u32) -> Self {
        CollatingInterval { contig_index, start, end }
    }

    pub const fn contig_index(self) -> u32 {
        self.contig_index
    }

    pub const fn start(self) -> u32 {
        self.start
    }

    pub const fn end(self) -> u32 {
        self.end
    }

    fn contig_matched(self, other: Self) -> bool {
        self.contig_index == other.contig_index
    }

    /// True iff both intervals are on the same contig and their ranges intersect.
    pub fn overlaps(self, other: Self) -> bool {
        self.contig_matched(other) && self.start <= other.end && other.start <= self.end
    }

    /// True iff `self` fully contains `other` on the same contig.
    pub fn contains(self, other: Self) -> bool {
        self.contig_matched(other) && other.start >= self.start && other.end <= self.end
    }

    /// True iff `self` lies entirely upstream of `other`: on an earlier
    /// contig, or on the same contig and ending before `other` starts.
    pub fn upstream_of(self, other: Self) -> bool {
        self.contig_index < other.contig_index
            || (self.contig_index == other.contig_index && self.end < other.start)
    }

    /// A hash stable across implementations: `241*(241*(241*c + s) + e)`.
    pub fn collating_hash(self) -> u64 {
        let c = self.contig_index as u64;
        let s = self.start as u64;
        let e = self.end as u64;
        241u64
            .wrapping_mul(241u64.wrapping_mul(241u64.wrapping_mul(c).wrapping_add(s)).wrapping_add(e))
    }

    /// Writes the 12-byte wire form: `u32` contig index, `u32` start, `u32` end, all little-endian.
    pub fn write_to<W: Write>(self, w: &mut W) -> io::Result<()> {
        w.write_u32::<LittleEndian>(self.contig_index)?;
        w.write_u32::<LittleEndian>(self.start)?;
        w.write_u32::<LittleEndian>(self.end)?;
        Ok(())
    }

    /// Reads the 12-byte wire form written by [`CollatingInterval::write_to`].
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let contig_index = r.read_u32::<LittleEndian>()?;
        let start = r.read_u32::<LittleEndian>()?;
        let end = r.read_u32::<LittleEndian>()?;
        Ok(CollatingInterval { contig_index, start, end })
    }
}

impl std::fmt::Display for CollatingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.contig_index, self.start, self.end)
    }
}
