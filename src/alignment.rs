//! Word alignments between a source sentence (f) and a target sentence (e).
//!
//! Extraction only ever needs the two directional lookups, so the engine is
//! written against the [`WordAlignment`] trait; [`SymmetricAlignment`] is the
//! in-memory implementation the readers produce.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("alignment point {f}-{e} is outside a {f_len}x{e_len} sentence pair")]
    OutOfRange {
        f: usize,
        e: usize,
        f_len: usize,
        e_len: usize,
    },
}

/// Symmetric view of a word alignment.
pub trait WordAlignment {
    /// Number of source words.
    fn source_len(&self) -> usize;

    /// Number of target words.
    fn target_len(&self) -> usize;

    /// Source positions aligned to target position `e`, sorted ascending.
    fn e2f(&self, e: usize) -> &[usize];

    /// Target positions aligned to source position `f`, sorted ascending.
    fn f2e(&self, f: usize) -> &[usize];

    /// True if source position `f` has no alignment link.
    fn is_source_unaligned(&self, f: usize) -> bool {
        self.f2e(f).is_empty()
    }
}

/// Alignment stored as two adjacency lists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymmetricAlignment {
    f2e: Vec<Vec<usize>>,
    e2f: Vec<Vec<usize>>,
}

impl SymmetricAlignment {
    /// Empty alignment for a sentence pair of the given lengths.
    pub fn new(f_len: usize, e_len: usize) -> Self {
        SymmetricAlignment {
            f2e: vec![Vec::new(); f_len],
            e2f: vec![Vec::new(); e_len],
        }
    }

    /// Build an alignment from `(f, e)` points.
    pub fn from_pairs(
        f_len: usize,
        e_len: usize,
        pairs: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self, AlignmentError> {
        let mut alignment = SymmetricAlignment::new(f_len, e_len);
        for (f, e) in pairs {
            alignment.add(f, e)?;
        }
        Ok(alignment)
    }

    /// Add the link `f-e`. Duplicate links are ignored.
    pub fn add(&mut self, f: usize, e: usize) -> Result<(), AlignmentError> {
        if f >= self.f2e.len() || e >= self.e2f.len() {
            return Err(AlignmentError::OutOfRange {
                f,
                e,
                f_len: self.f2e.len(),
                e_len: self.e2f.len(),
            });
        }
        insert_sorted(&mut self.f2e[f], e);
        insert_sorted(&mut self.e2f[e], f);
        Ok(())
    }

    /// Total number of links.
    pub fn link_count(&self) -> usize {
        self.f2e.iter().map(Vec::len).sum()
    }
}

fn insert_sorted(list: &mut Vec<usize>, value: usize) {
    if let Err(pos) = list.binary_search(&value) {
        list.insert(pos, value);
    }
}

impl WordAlignment for SymmetricAlignment {
    fn source_len(&self) -> usize {
        self.f2e.len()
    }

    fn target_len(&self) -> usize {
        self.e2f.len()
    }

    fn e2f(&self, e: usize) -> &[usize] {
        self.e2f.get(e).map_or(&[][..], Vec::as_slice)
    }

    fn f2e(&self, f: usize) -> &[usize] {
        self.f2e.get(f).map_or(&[][..], Vec::as_slice)
    }
}
