//! Drives block-boundary detection and index accumulation as records are
//! written, and emits the index section and trailer on close.

use std::fs::File;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, info};

use crate::block_stream::BlockWriter;
use crate::dictionary::SequenceDictionary;
use crate::error::BcisError;
use crate::interval::CollatingInterval;
use crate::record::Record;
use crate::trailer;
use crate::vpos::VirtualOffset;
use crate::wire;

/// The current block's tracking record: its starting virtual offset and the
/// tightest `(contig, [min_start, max_end])` span observed so far.
struct BlockSpan {
    vpos: VirtualOffset,
    contig: u32,
    start: u32,
    end: u32,
}

/// Typed construction options for a [`Writer`], standing in for the CLI
/// flags or environment variables this crate does not expose.
pub struct WriterBuilder {
    class_tag: Option<String>,
    dictionary: Option<SequenceDictionary>,
    path: Option<PathBuf>,
}

impl WriterBuilder {
    pub fn new() -> Self {
        WriterBuilder { class_tag: None, dictionary: None, path: None }
    }

    /// Overrides the class tag written into the header. Defaults to
    /// `Rec::CLASS_TAG`; mainly useful for exercising `ClassMismatch` in tests.
    pub fn class_tag(mut self, tag: impl Into<String>) -> Self {
        self.class_tag = Some(tag.into());
        self
    }

    pub fn dictionary(mut self, dictionary: SequenceDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }

    /// Attaches a path used only for error context; has no effect on the format.
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn build<W: Write, Rec: Record>(self, inner: W) -> crate::Result<Writer<W, Rec>> {
        let dictionary = self.dictionary.unwrap_or_default();
        let path = self.path.unwrap_or_else(|| PathBuf::from("<stream>"));
        let class_tag = self.class_tag.unwrap_or_else(|| Rec::CLASS_TAG.to_string());

        let mut writer = Writer {
            block: BlockWriter::new(inner),
            last_interval: None,
            current_block: None,
            index_entries: Vec::new(),
            path,
            _marker: PhantomData,
        };
        writer.write_header(&class_tag, &dictionary)?;
        info!("bcis writer opened, class_tag={class_tag:?}, contigs={}", dictionary.len());
        Ok(writer)
    }
}

impl Default for WriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a strictly coordinate-sorted stream of `Rec` into a self-indexing
/// block-compressed container.
pub struct Writer<W: Write, Rec: Record> {
    block: BlockWriter<W>,
    last_interval: Option<CollatingInterval>,
    current_block: Option<BlockSpan>,
    index_entries: Vec<crate::index::IndexEntry>,
    path: PathBuf,
    _marker: PhantomData<Rec>,
}

impl<W: Write, Rec: Record> Writer<W, Rec> {
    /// Opens a writer over `inner` with default options.
    pub fn new(inner: W, dictionary: SequenceDictionary) -> crate::Result<Self> {
        WriterBuilder::new().dictionary(dictionary).build(inner)
    }

    fn write_header(&mut self, class_tag: &str, dictionary: &SequenceDictionary) -> crate::Result<()> {
        wire::write_utf(&mut self.block, class_tag).map_err(|e| self.write_err(e))?;
        wire::write_utf(&mut self.block, crate::FORMAT_VERSION).map_err(|e| self.write_err(e))?;
        self.block
            .write_u32::<LittleEndian>(dictionary.len() as u32)
            .map_err(|e| self.write_err(e))?;
        for contig in dictionary.contigs() {
            self.block
                .write_u32::<LittleEndian>(contig.length)
                .map_err(|e| self.write_err(e))?;
            wire::write_utf(&mut self.block, &contig.name).map_err(|e| self.write_err(e))?;
        }
        self.block.flush_block().map_err(|e| self.write_err(e))
    }

    fn start_block(&mut self, vpos: VirtualOffset, interval: CollatingInterval) {
        self.current_block = Some(BlockSpan {
            vpos,
            contig: interval.contig_index(),
            start: interval.start(),
            end: interval.end(),
        });
    }

    fn flush_pending(&mut self) {
        if let Some(span) = self.current_block.take() {
            let interval = CollatingInterval::new_unchecked(span.contig, span.start, span.end);
            debug!("index entry: {interval} -> block at {}", span.vpos.block_offset());
            self.index_entries
                .push(crate::index::IndexEntry::new(interval, span.vpos));
        }
    }

    /// Writes one record, maintaining block-boundary-aware index tracking.
    ///
    /// Fails with [`BcisError::NotSorted`] if `record`'s collating interval
    /// precedes the previously written one.
    pub fn write(&mut self, record: &Rec) -> crate::Result<()> {
        let v_before = self.block.position();
        let interval = record.write_to(&mut self.block).map_err(|e| self.write_err(e))?;

        if let Some(last) = self.last_interval {
            if interval < last {
                return Err(BcisError::NotSorted { last, next: interval });
            }
        }

        let starting_new_block = self.current_block.is_none();
        match &mut self.current_block {
            None => self.start_block(v_before, interval),
            Some(span) if span.contig == interval.contig_index() => {
                span.end = span.end.max(interval.end());
            }
            Some(_) => {
                self.flush_pending();
                self.start_block(v_before, interval);
            }
        }
        self.last_interval = Some(interval);

        if starting_new_block {
            return Ok(());
        }

        let v_after = self.block.position();
        if !v_before.same_block(v_after) {
            self.flush_pending();
        }
        Ok(())
    }

    /// Seals the payload, writes the index section and the 40-byte trailer,
    /// and returns the underlying stream.
    pub fn close(mut self) -> crate::Result<W> {
        self.flush_pending();
        self.block.flush_block().map_err(|e| self.write_err(e))?;
        let index_vpos = self.block.position();

        self.block
            .write_u32::<LittleEndian>(self.index_entries.len() as u32)
            .map_err(|e| self.write_err(e))?;
        for entry in &self.index_entries {
            entry.write_to(&mut self.block).map_err(|e| self.write_err(e))?;
        }
        self.block.flush_block().map_err(|e| self.write_err(e))?;

        let trailer_bytes = trailer::patch(index_vpos.raw());
        let mut inner = self.block.into_raw().map_err(|e| BcisError::write_failed(self.path.clone(), e))?;
        inner
            .write_all(&trailer_bytes)
            .and_then(|()| inner.flush())
            .map_err(|e| BcisError::write_failed(self.path.clone(), e))?;

        info!(
            "bcis writer closed, {} index entries, index_vpos={}",
            self.index_entries.len(),
            index_vpos.raw()
        );
        Ok(inner)
    }

    fn write_err(&self, source: std::io::Error) -> BcisError {
        BcisError::write_failed(self.path.clone(), source)
    }
}

impl<Rec: Record> Writer<File, Rec> {
    /// Opens a writer backed by a newly created file at `path`.
    pub fn create(path: impl AsRef<Path>, dictionary: SequenceDictionary) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| BcisError::write_failed(path, e))?;
        WriterBuilder::new()
            .dictionary(dictionary)
            .path(path)
            .build(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use std::io::{self, Read};

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestRecord {
        interval: CollatingInterval,
        tag: u8,
    }

    impl Record for TestRecord {
        const CLASS_TAG: &'static str = "test-record";

        fn interval(&self) -> CollatingInterval {
            self.interval
        }

        fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<CollatingInterval> {
            self.interval.write_to(sink)?;
            sink.write_all(&[self.tag])?;
            Ok(self.interval)
        }

        fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
            let interval = CollatingInterval::read_from(reader)?;
            let mut tag = [0u8; 1];
            reader.read_exact(&mut tag)?;
            Ok(TestRecord { interval, tag: tag[0] })
        }
    }

    fn dictionary() -> SequenceDictionary {
        SequenceDictionary::new([("chr1".to_string(), 1000), ("chr2".to_string(), 500)])
    }

    #[test]
    fn rejects_out_of_order_write() {
        let mut w: Writer<Vec<u8>, TestRecord> = Writer::new(Vec::new(), dictionary()).unwrap();
        let r1 = TestRecord { interval: CollatingInterval::new_unchecked(0, 150, 300), tag: 1 };
        let r2 = TestRecord { interval: CollatingInterval::new_unchecked(0, 100, 200), tag: 2 };
        w.write(&r1).unwrap();
        let err = w.write(&r2).unwrap_err();
        assert!(matches!(err, BcisError::NotSorted { .. }));
    }

    #[test]
    fn close_produces_trailer_with_positive_index_offset() {
        let mut w: Writer<Vec<u8>, TestRecord> = Writer::new(Vec::new(), dictionary()).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(0, 100, 200), tag: 1 }).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(0, 150, 300), tag: 2 }).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(1, 10, 50), tag: 3 }).unwrap();
        let bytes = w.close().unwrap();

        assert!(bytes.len() > trailer::TRAILER_SIZE);
        let trailer_start = bytes.len() - trailer::TRAILER_SIZE;
        let mut trailer_bytes = [0u8; trailer::TRAILER_SIZE];
        trailer_bytes.copy_from_slice(&bytes[trailer_start..]);
        let index_vpos = trailer::verify_and_extract(&trailer_bytes).unwrap();
        assert!(index_vpos > 0);
    }

    #[test]
    fn one_index_entry_per_contig_when_all_fit_one_block() {
        let mut w: Writer<Vec<u8>, TestRecord> = Writer::new(Vec::new(), dictionary()).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(0, 100, 200), tag: 1 }).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(0, 150, 300), tag: 2 }).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(1, 10, 50), tag: 3 }).unwrap();
        // contig 0 -> contig 1 transition forces one flush; close() flushes the rest.
        assert_eq!(w.index_entries.len(), 1);
        w.flush_pending();
        assert_eq!(w.index_entries.len(), 2);
    }
}
