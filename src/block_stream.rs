//! Thin adapters around [`noodles_bgzf`] exposing exactly the surface the
//! writer and reader need: current virtual offset, forced block flush, and a
//! raw-bytes escape hatch for the trailer, which must bypass the compressor
//! entirely.

use std::io::{self, Read, Seek, Write};

use noodles_bgzf as bgzf;

use crate::vpos::VirtualOffset;

/// Wraps a BGZF writer, tracking virtual offsets as records are written.
pub struct BlockWriter<W: Write> {
    inner: bgzf::Writer<W>,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W) -> Self {
        BlockWriter { inner: bgzf::Writer::new(inner) }
    }

    /// The virtual offset the next byte written will land at.
    pub fn position(&self) -> VirtualOffset {
        self.inner.virtual_position().into()
    }

    /// Forces the current block to close and be written out, without
    /// emitting a BGZF end-of-file marker.
    pub fn flush_block(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Seals the compressor and hands back the raw underlying stream,
    /// skipping `noodles_bgzf`'s own terminator block. The caller is
    /// expected to write its own trailer directly afterwards.
    ///
    /// The caller must have just flushed (so no buffered data is lost).
    pub fn into_raw(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner.into_inner())
    }
}

impl<W: Write> Write for BlockWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Wraps a BGZF reader over a seekable stream.
pub struct BlockReader<R: Read> {
    inner: bgzf::Reader<R>,
}

impl<R: Read> BlockReader<R> {
    pub fn new(inner: R) -> Self {
        BlockReader { inner: bgzf::Reader::new(inner) }
    }

    pub fn position(&self) -> VirtualOffset {
        self.inner.virtual_position().into()
    }
}

impl<R: Read + Seek> BlockReader<R> {
    pub fn seek_to(&mut self, pos: VirtualOffset) -> io::Result<()> {
        self.inner.seek(pos.into())?;
        Ok(())
    }
}

impl<R: Read> Read for BlockReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
