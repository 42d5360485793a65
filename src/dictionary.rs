//! The sequence dictionary: an ordered list of contigs with a name lookup.

use rustc_hash::FxHashMap;

/// A named reference sequence of fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub name: String,
    pub length: u32,
    /// Position of this contig in the dictionary; matches `CollatingInterval::contig_index`.
    pub index: u32,
}

/// An ordered list of contigs, with a name→index lookup.
///
/// Written into the file header at write time; reconstructed from that same
/// header at read time. The dictionary is authoritative even if some of its
/// contigs are never referenced by any block (see `sequence_names` in
/// [`crate::reader::Reader`]).
#[derive(Debug, Clone, Default)]
pub struct SequenceDictionary {
    contigs: Vec<Contig>,
    by_name: FxHashMap<String, u32>,
}

impl SequenceDictionary {
    /// Builds a dictionary from an ordered `(name, length)` list.
    pub fn new(entries: impl IntoIterator<Item = (String, u32)>) -> Self {
        let mut contigs = Vec::new();
        let mut by_name = FxHashMap::default();
        for (index, (name, length)) in entries.into_iter().enumerate() {
            let index = index as u32;
            by_name.insert(name.clone(), index);
            contigs.push(Contig { name, length, index });
        }
        SequenceDictionary { contigs, by_name }
    }

    pub fn len(&self) -> usize {
        self.contigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    /// All contig names, in dictionary order. May include names with no
    /// records or index entries; the dictionary does not filter itself.
    pub fn sequence_names(&self) -> impl Iterator<Item = &str> {
        self.contigs.iter().map(|c| c.name.as_str())
    }

    pub fn contig_by_name(&self, name: &str) -> Option<&Contig> {
        self.by_name.get(name).map(|&i| &self.contigs[i as usize])
    }

    pub fn contig_by_index(&self, index: u32) -> Option<&Contig> {
        self.contigs.get(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_index() {
        let dict = SequenceDictionary::new([("chr1".to_string(), 1000), ("chr2".to_string(), 500)]);
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.contig_by_name("chr2").unwrap().index, 1);
        assert_eq!(dict.contig_by_index(0).unwrap().name, "chr1");
        assert!(dict.contig_by_name("chr3").is_none());
    }
}
