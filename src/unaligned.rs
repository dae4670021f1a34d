//! Subsets of unaligned RHS positions.
//!
//! A rule instance may absorb source words that carry no alignment. Each
//! such word can either stay in the rule's RHS or be left out, but only from
//! the edges inward: a word may be dropped when it sits at either end of the
//! RHS, next to a non-terminal, or next to a word that was already dropped.

use crate::rule::RhsSymbol;
use bit_set::BitSet;
use std::hash::{Hash, Hasher};

/// One kept subset of a base set of unaligned RHS positions.
#[derive(Clone, Debug)]
pub struct UnalignedWordSet<'r> {
    rhs: &'r [RhsSymbol],
    base: &'r BitSet,
    kept: BitSet,
}

impl<'r> UnalignedWordSet<'r> {
    /// The set keeping every position of `base`.
    pub fn full(rhs: &'r [RhsSymbol], base: &'r BitSet) -> Self {
        UnalignedWordSet {
            rhs,
            base,
            kept: base.clone(),
        }
    }

    /// Positions still in the RHS.
    pub fn kept(&self) -> &BitSet {
        &self.kept
    }

    /// Positions left out of the RHS.
    pub fn dropped(&self) -> BitSet {
        let mut dropped = self.base.clone();
        dropped.difference_with(&self.kept);
        dropped
    }

    pub fn is_dropped(&self, i: usize) -> bool {
        self.base.contains(i) && !self.kept.contains(i)
    }

    fn can_drop(&self, i: usize) -> bool {
        let last = self.rhs.len().saturating_sub(1);
        if i == 0 || i >= last {
            return true;
        }
        [i - 1, i + 1]
            .into_iter()
            .any(|j| self.rhs[j].is_non_terminal() || self.is_dropped(j))
    }

    /// Every subset that drops exactly one more position.
    pub fn size_minus_one_sets(&self) -> Vec<UnalignedWordSet<'r>> {
        self.kept
            .iter()
            .filter(|&i| self.can_drop(i))
            .map(|i| {
                let mut kept = self.kept.clone();
                kept.remove(i);
                UnalignedWordSet {
                    rhs: self.rhs,
                    base: self.base,
                    kept,
                }
            })
            .collect()
    }
}

impl PartialEq for UnalignedWordSet<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.kept == other.kept
    }
}

impl Eq for UnalignedWordSet<'_> {}

impl Hash for UnalignedWordSet<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kept.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::SymbolId;
    use rustc_hash::FxHashSet;

    fn t(id: u32) -> RhsSymbol {
        RhsSymbol::Terminal(SymbolId::from_u32(id))
    }

    fn nt(lhs: u16) -> RhsSymbol {
        RhsSymbol::NonTerminal {
            label: SymbolId::from_u32(100),
            lhs,
        }
    }

    fn bits(items: &[usize]) -> BitSet {
        items.iter().copied().collect()
    }

    fn kept_sets(sets: &[UnalignedWordSet<'_>]) -> Vec<Vec<usize>> {
        sets.iter().map(|s| s.kept().iter().collect()).collect()
    }

    #[test]
    fn test_edges_drop_first() {
        // u0 a u2 u3 a: only u0 touches an edge.
        let rhs = [t(0), t(1), t(2), t(3), t(4)];
        let base = bits(&[0, 2, 3]);
        let full = UnalignedWordSet::full(&rhs, &base);

        assert_eq!(kept_sets(&full.size_minus_one_sets()), vec![vec![2, 3]]);
    }

    #[test]
    fn test_last_position_is_an_edge() {
        let rhs = [t(0), t(1), t(2)];
        let base = bits(&[2]);
        let full = UnalignedWordSet::full(&rhs, &base);
        let smaller = full.size_minus_one_sets();

        assert_eq!(smaller.len(), 1);
        assert!(smaller[0].is_dropped(2));
        assert_eq!(smaller[0].dropped().iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_non_terminal_neighbor_allows_drop() {
        // a u x0 u a
        let rhs = [t(0), t(1), nt(3), t(2), t(3)];
        let base = bits(&[1, 3]);
        let full = UnalignedWordSet::full(&rhs, &base);

        assert_eq!(kept_sets(&full.size_minus_one_sets()), vec![vec![3], vec![1]]);
    }

    #[test]
    fn test_interior_word_stays() {
        let rhs = [t(0), t(1), t(2)];
        let base = bits(&[1]);
        let full = UnalignedWordSet::full(&rhs, &base);
        assert!(full.size_minus_one_sets().is_empty());
    }

    #[test]
    fn test_dropped_neighbor_unlocks_position() {
        // u u u a
        let rhs = [t(0), t(1), t(2), t(3)];
        let base = bits(&[0, 1, 2]);
        let full = UnalignedWordSet::full(&rhs, &base);

        let step1 = full.size_minus_one_sets();
        assert_eq!(kept_sets(&step1), vec![vec![1, 2]]);
        let step2 = step1[0].size_minus_one_sets();
        assert_eq!(kept_sets(&step2), vec![vec![2]]);
    }

    #[test]
    fn test_equality_uses_kept_positions() {
        let rhs = [t(0), t(1)];
        let base = bits(&[0, 1]);
        let full = UnalignedWordSet::full(&rhs, &base);

        let mut seen = FxHashSet::default();
        for set in full.size_minus_one_sets() {
            for smaller in set.size_minus_one_sets() {
                seen.insert(smaller);
            }
        }
        // Both paths reach the empty set.
        assert_eq!(seen.len(), 1);
    }
}
