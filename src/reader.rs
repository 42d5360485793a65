//! Trailer recovery, dictionary read, lazy index load, seek-and-decode
//! overlap queries, and full iteration.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info};

use crate::block_stream::BlockReader;
use crate::dictionary::SequenceDictionary;
use crate::error::BcisError;
use crate::index::{IndexEntry, IntervalTree};
use crate::interval::CollatingInterval;
use crate::record::Record;
use crate::trailer;
use crate::vpos::VirtualOffset;
use crate::wire;

/// Typed construction options for a [`Reader`], standing in for the CLI
/// flags or environment variables this crate does not expose.
pub struct ReaderBuilder {
    expected_class_tag: Option<String>,
}

impl ReaderBuilder {
    pub fn new() -> Self {
        ReaderBuilder { expected_class_tag: None }
    }

    /// Overrides the class tag the reader checks the file against. Defaults
    /// to `Rec::CLASS_TAG`.
    pub fn expected_class_tag(mut self, tag: impl Into<String>) -> Self {
        self.expected_class_tag = Some(tag.into());
        self
    }

    /// Opens `path`: reads the trailer, the header, and the dictionary, then
    /// returns a reader positioned to iterate payload records.
    pub fn open<Rec: Record>(self, path: impl AsRef<Path>) -> crate::Result<Reader<Rec>> {
        let path = path.as_ref().to_path_buf();

        let mut raw = File::open(&path).map_err(|e| BcisError::read_failed(&path, e))?;
        let file_len = raw.metadata().map_err(|e| BcisError::read_failed(&path, e))?.len();
        if file_len < trailer::TRAILER_SIZE as u64 {
            return Err(BcisError::CorruptTrailer { reason: "file shorter than the trailer block" });
        }
        raw.seek(SeekFrom::End(-(trailer::TRAILER_SIZE as i64)))
            .map_err(|e| BcisError::read_failed(&path, e))?;
        let mut trailer_bytes = [0u8; trailer::TRAILER_SIZE];
        raw.read_exact(&mut trailer_bytes).map_err(|e| BcisError::read_failed(&path, e))?;
        let index_vpos = VirtualOffset::from_raw(trailer::verify_and_extract(&trailer_bytes)?);

        raw.seek(SeekFrom::Start(0)).map_err(|e| BcisError::read_failed(&path, e))?;
        let mut cursor = BlockReader::new(raw);

        let class_tag = wire::read_utf(&mut cursor).map_err(|e| BcisError::read_failed(&path, e))?;
        let _version_tag = wire::read_utf(&mut cursor).map_err(|e| BcisError::read_failed(&path, e))?;
        let expected = self.expected_class_tag.unwrap_or_else(|| Rec::CLASS_TAG.to_string());
        if class_tag != expected {
            return Err(BcisError::ClassMismatch { found: class_tag, expected });
        }

        let n_contigs = cursor.read_u32::<LittleEndian>().map_err(|e| BcisError::read_failed(&path, e))?;
        let mut entries = Vec::with_capacity(n_contigs as usize);
        for _ in 0..n_contigs {
            let length = cursor.read_u32::<LittleEndian>().map_err(|e| BcisError::read_failed(&path, e))?;
            let name = wire::read_utf(&mut cursor).map_err(|e| BcisError::read_failed(&path, e))?;
            entries.push((name, length));
        }
        let dictionary = SequenceDictionary::new(entries);
        let data_vpos = cursor.position();

        info!(
            "bcis reader opened {path:?}: class_tag={class_tag:?}, contigs={}",
            dictionary.len()
        );

        Ok(Reader {
            path,
            class_tag,
            dictionary: Arc::new(dictionary),
            index_vpos,
            data_vpos,
            index: Arc::new(OnceLock::new()),
            _marker: PhantomData,
        })
    }
}

impl Default for ReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a self-indexing block-compressed container of `Rec` records.
///
/// Cloning a reader (via [`Reader::try_clone`]) shares the dictionary and the
/// lazily-loaded index but opens an independent file cursor, so concurrent
/// iterators never interfere with one another.
pub struct Reader<Rec: Record> {
    path: PathBuf,
    class_tag: String,
    dictionary: Arc<SequenceDictionary>,
    index_vpos: VirtualOffset,
    data_vpos: VirtualOffset,
    index: Arc<OnceLock<IntervalTree<VirtualOffset>>>,
    _marker: PhantomData<Rec>,
}

impl<Rec: Record> Reader<Rec> {
    /// Opens `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        ReaderBuilder::new().open(path)
    }

    pub fn dictionary(&self) -> &SequenceDictionary {
        &self.dictionary
    }

    pub fn class_tag(&self) -> &str {
        &self.class_tag
    }

    /// All contig names in dictionary order, whether or not they have any
    /// indexed blocks.
    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.dictionary.sequence_names()
    }

    /// Opens an independent cursor onto the same file, sharing the
    /// dictionary and the (possibly not-yet-loaded) index.
    pub fn try_clone(&self) -> crate::Result<Self> {
        Ok(Reader {
            path: self.path.clone(),
            class_tag: self.class_tag.clone(),
            dictionary: Arc::clone(&self.dictionary),
            index_vpos: self.index_vpos,
            data_vpos: self.data_vpos,
            index: Arc::clone(&self.index),
            _marker: PhantomData,
        })
    }

    fn open_cursor_at(&self, vpos: VirtualOffset) -> crate::Result<BlockReader<File>> {
        let raw = File::open(&self.path).map_err(|e| BcisError::read_failed(&self.path, e))?;
        let mut cursor = BlockReader::new(raw);
        cursor.seek_to(vpos).map_err(|e| BcisError::read_failed(&self.path, e))?;
        Ok(cursor)
    }

    /// Iterates every record in the file, in file order.
    pub fn iter(&self) -> crate::Result<RecordIter<Rec>> {
        let cursor = self.open_cursor_at(self.data_vpos)?;
        Ok(RecordIter {
            cursor,
            index_vpos: self.index_vpos,
            path: self.path.clone(),
            _marker: PhantomData,
        })
    }

    fn ensure_index(&self) -> crate::Result<&IntervalTree<VirtualOffset>> {
        if let Some(tree) = self.index.get() {
            return Ok(tree);
        }
        let mut tree = self.load_index()?;
        tree.build_all();
        // A racing clone may have published its own, equivalent tree first;
        // `get_or_init` makes the publication atomic either way, and the
        // loser's freshly-built tree is simply dropped.
        Ok(self.index.get_or_init(|| tree))
    }

    fn load_index(&self) -> crate::Result<IntervalTree<VirtualOffset>> {
        let mut cursor = self.open_cursor_at(self.index_vpos)?;
        let n_entries = cursor.read_u32::<LittleEndian>().map_err(|e| BcisError::read_failed(&self.path, e))?;
        let mut tree = IntervalTree::new();
        for _ in 0..n_entries {
            let entry = IndexEntry::read_from(&mut cursor).map_err(|e| BcisError::read_failed(&self.path, e))?;
            if self.dictionary.contig_by_index(entry.interval.contig_index()).is_none() {
                return Err(BcisError::CorruptIndex {
                    reason: format!("index entry names unknown contig {}", entry.interval.contig_index()),
                });
            }
            tree.put(entry.interval, entry.vpos);
        }
        debug!("bcis index loaded from {:?}: {n_entries} entries", self.path);
        Ok(tree)
    }

    /// Queries by contig name, as resolved against this reader's dictionary.
    pub fn query(&self, contig: &str, start: u32, end: u32) -> crate::Result<OverlapQuery<Rec>> {
        let query = CollatingInterval::from_name(&self.dictionary, contig, start, end)?;
        self.query_interval(query)
    }

    /// Queries by an already-resolved collating interval.
    pub fn query_interval(&self, query: CollatingInterval) -> crate::Result<OverlapQuery<Rec>> {
        let tree = self.ensure_index()?;
        let entries: Vec<IndexEntry> = tree
            .overlappers_ref(query)
            .into_iter()
            .map(|(interval, &vpos)| IndexEntry::new(interval, vpos))
            .collect();
        debug!("query {query}: {} candidate blocks", entries.len());

        let raw = File::open(&self.path).map_err(|e| BcisError::read_failed(&self.path, e))?;
        let cursor = BlockReader::new(raw);
        Ok(OverlapQuery {
            cursor,
            query,
            index_vpos: self.index_vpos,
            entries: entries.into_iter(),
            current_done: true,
            path: self.path.clone(),
            _marker: PhantomData,
        })
    }
}

/// Full-file iterator produced by [`Reader::iter`].
pub struct RecordIter<Rec: Record> {
    cursor: BlockReader<File>,
    index_vpos: VirtualOffset,
    path: PathBuf,
    _marker: PhantomData<Rec>,
}

impl<Rec: Record> Iterator for RecordIter<Rec> {
    type Item = crate::Result<Rec>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.position() >= self.index_vpos {
            return None;
        }
        match Rec::read_from(&mut self.cursor) {
            Ok(record) => Some(Ok(record)),
            Err(e) => Some(Err(BcisError::read_failed(&self.path, e))),
        }
    }
}

/// Overlap-query iterator produced by [`Reader::query`] / [`Reader::query_interval`].
///
/// Entries are visited in interval-tree enumeration order, not coordinate
/// order; records within a single visited run are yielded in file order.
pub struct OverlapQuery<Rec: Record> {
    cursor: BlockReader<File>,
    query: CollatingInterval,
    index_vpos: VirtualOffset,
    entries: std::vec::IntoIter<IndexEntry>,
    /// True when the current index entry's block has yielded everything it
    /// can (or no entry has been seeked to yet) and the next call should
    /// advance to the next entry.
    current_done: bool,
    path: PathBuf,
    _marker: PhantomData<Rec>,
}

impl<Rec: Record> Iterator for OverlapQuery<Rec> {
    type Item = crate::Result<Rec>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_done {
                let entry = self.entries.next()?;
                if let Err(e) = self.cursor.seek_to(entry.vpos) {
                    return Some(Err(BcisError::read_failed(&self.path, e)));
                }
                self.current_done = false;
            }

            if self.cursor.position() >= self.index_vpos {
                self.current_done = true;
                continue;
            }

            let record = match Rec::read_from(&mut self.cursor) {
                Ok(record) => record,
                Err(e) => return Some(Err(BcisError::read_failed(&self.path, e))),
            };
            let interval = record.interval();

            if interval.overlaps(self.query) {
                return Some(Ok(record));
            }
            if self.query.upstream_of(interval) {
                self.current_done = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::SequenceDictionary;
    use crate::writer::Writer;
    use std::io::{self, Write};
    use tempfile::NamedTempFile;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

    fn write_sample(path: &std::path::Path) {
        let dictionary = SequenceDictionary::new([("chr1".to_string(), 1000), ("chr2".to_string(), 500)]);
        let mut w: Writer<File, TestRecord> = Writer::create(path, dictionary).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(0, 100, 200), tag: 1 }).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(0, 150, 300), tag: 2 }).unwrap();
        w.write(&TestRecord { interval: CollatingInterval::new_unchecked(1, 10, 50), tag: 3 }).unwrap();
        w.close().unwrap();
    }

    #[test]
    fn full_iteration_round_trips_in_order() {
        let file = NamedTempFile::new().unwrap();
        write_sample(file.path());

        let reader: Reader<TestRecord> = Reader::open(file.path()).unwrap();
        let records: Vec<TestRecord> = reader.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].tag, 1);
        assert_eq!(records[1].tag, 2);
        assert_eq!(records[2].tag, 3);
    }

    #[test]
    fn query_finds_only_overlapping_records() {
        let file = NamedTempFile::new().unwrap();
        write_sample(file.path());

        let reader: Reader<TestRecord> = Reader::open(file.path()).unwrap();
        let hits: Vec<TestRecord> = reader.query("chr1", 250, 260).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tag, 2);

        let hits: Vec<TestRecord> = reader.query("chr2", 1, 100).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tag, 3);

        let hits: Vec<TestRecord> = reader.query("chr1", 500, 600).unwrap().map(|r| r.unwrap()).collect();
        assert!(hits.is_empty());
    }

    #[test]
    fn class_mismatch_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        write_sample(file.path());

        let err = ReaderBuilder::new()
            .expected_class_tag("something-else")
            .open::<TestRecord>(file.path())
            .unwrap_err();
        assert!(matches!(err, BcisError::ClassMismatch { .. }));
    }

    #[test]
    fn mutated_trailer_prefix_is_rejected_at_open() {
        let file = NamedTempFile::new().unwrap();
        write_sample(file.path());

        let mut bytes = std::fs::read(file.path()).unwrap();
        let len = bytes.len();
        bytes[len - trailer::TRAILER_SIZE] = 0x00;
        std::fs::write(file.path(), &bytes).unwrap();

        let err = Reader::<TestRecord>::open(file.path()).unwrap_err();
        assert!(matches!(err, BcisError::CorruptTrailer { .. }));
    }

    #[test]
    fn clone_shares_index_and_dictionary() {
        let file = NamedTempFile::new().unwrap();
        write_sample(file.path());

        let reader: Reader<TestRecord> = Reader::open(file.path()).unwrap();
        let _ = reader.query("chr1", 100, 200).unwrap().count();
        let clone = reader.try_clone().unwrap();
        assert!(reader.index.get().is_some());
        assert!(clone.index.get().is_some());

        let hits: Vec<TestRecord> = clone.query("chr2", 1, 100).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(hits.len(), 1);
    }
}
