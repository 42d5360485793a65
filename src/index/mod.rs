//! The spatial index: one entry per `(block, contig)` span, plus the
//! in-memory tree used to enumerate overlappers at query time.

pub mod tree;

pub use tree::IntervalTree;

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::interval::CollatingInterval;
use crate::vpos::VirtualOffset;

/// On-disk size of an [`IndexEntry`]: 12-byte interval + 8-byte virtual offset.
pub const WIRE_SIZE: usize = 20;

/// A single index entry: the tightest `(contig, [min_start, max_end])` span
/// observed among records that began writing inside the block at `vpos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub interval: CollatingInterval,
    pub vpos: VirtualOffset,
}

impl IndexEntry {
    pub fn new(interval: CollatingInterval, vpos: VirtualOffset) -> Self {
        IndexEntry { interval, vpos }
    }

    /// Writes the 20-byte wire form: interval, then `u64` virtual offset, little-endian.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.interval.write_to(w)?;
        w.write_u64::<LittleEndian>(self.vpos.raw())?;
        Ok(())
    }

    /// Reads the 20-byte wire form written by [`IndexEntry::write_to`].
    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let interval = CollatingInterval::read_from(r)?;
        let vpos = VirtualOffset::from_raw(r.read_u64::<LittleEndian>()?);
        Ok(IndexEntry { interval, vpos })
    }
}
