//! Candidate rules rooted at frontier nodes.

use crate::align_tree::{AlignmentTree, TreeError};
use crate::alignment::WordAlignment;
use crate::intern::SymbolId;
use crate::rule::{LhsSlot, RhsSymbol, Rule};
use crate::tree::NodeId;
use bit_set::BitSet;

/// Per-sentence inputs shared by every instance of the sentence.
#[derive(Clone, Copy)]
pub struct InstanceContext<'a> {
    pub tree: &'a AlignmentTree,
    /// Interned [`AlignmentTree::node_string`] of every node.
    pub labels: &'a [SymbolId],
    /// Interned source words.
    pub source: &'a [SymbolId],
    pub alignment: &'a dyn WordAlignment,
}

/// A rule rooted at a frontier node, before unaligned-word variants.
#[derive(Clone, Debug)]
pub struct RuleInstance {
    pub rule: Rule,
    pub root: NodeId,
    /// Frontier nodes rewritten as non-terminals, in LHS order.
    pub boundaries: Vec<NodeId>,
    /// RHS positions holding source words with no alignment.
    pub unaligned_rhs: BitSet,
}

impl RuleInstance {
    /// Build the instance at `root` covering source positions `low..=high`.
    ///
    /// Frontier descendants become non-terminals unless their id is in
    /// `composition`, in which case the LHS continues through them.
    pub fn new(
        ctx: InstanceContext<'_>,
        root: NodeId,
        composition: &BitSet,
        low: usize,
        high: usize,
    ) -> Result<Self, TreeError> {
        let tree = ctx.tree;

        let mut lhs_struct: Vec<u16> = Vec::new();
        let mut lhs_labels: Vec<SymbolId> = Vec::new();
        let mut boundaries: Vec<(NodeId, LhsSlot)> = Vec::new();

        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            let slot = lhs_struct.len();
            if slot > usize::from(LhsSlot::MAX) {
                return Err(TreeError::RuleTooLarge {
                    node: root,
                    size: slot + 1 + stack.len(),
                });
            }
            lhs_labels.push(ctx.labels[n]);

            let is_boundary = n != root
                && !tree.is_leaf(n)
                && tree.is_frontier(n)
                && !composition.contains(n);

            if is_boundary {
                lhs_struct.push(0);
                boundaries.push((n, slot as LhsSlot));
            } else {
                let children = tree.children(n);
                lhs_struct.push(u16::try_from(children.len()).map_err(|_| {
                    TreeError::RuleTooLarge {
                        node: root,
                        size: children.len(),
                    }
                })?);
                stack.extend(children.iter().rev());
            }
        }

        let mut spans = Vec::with_capacity(boundaries.len());
        for &(n, slot) in &boundaries {
            let (b_low, b_high) = tree.fspan_bounds(n)?;
            spans.push((b_low, b_high, n, slot));
        }
        spans.sort_unstable();

        let mut rhs = Vec::new();
        let mut unaligned_rhs = BitSet::new();
        let mut next = spans.iter().peekable();
        let mut f = low;
        while f <= high {
            match next.peek() {
                Some(&&(b_low, b_high, n, slot)) if b_low == f => {
                    rhs.push(RhsSymbol::NonTerminal {
                        label: ctx.labels[n],
                        lhs: slot,
                    });
                    next.next();
                    f = b_high + 1;
                }
                _ => {
                    if ctx.alignment.f2e(f).is_empty() {
                        unaligned_rhs.insert(rhs.len());
                    }
                    rhs.push(RhsSymbol::Terminal(ctx.source[f]));
                    f += 1;
                }
            }
        }

        Ok(RuleInstance {
            rule: Rule::new(lhs_struct.into(), lhs_labels.into(), rhs.into_boxed_slice()),
            root,
            boundaries: boundaries.into_iter().map(|(n, _)| n).collect(),
            unaligned_rhs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::SymmetricAlignment;
    use crate::intern::StringInterner;
    use crate::parser::parse_tree;
    use crate::tree::PercolationTable;

    struct Sentence {
        tree: AlignmentTree,
        alignment: SymmetricAlignment,
        labels: Vec<SymbolId>,
        source: Vec<SymbolId>,
        interner: StringInterner,
    }

    impl Sentence {
        fn new(tree: &str, source: &str, pairs: &[(usize, usize)]) -> Self {
            let interner = StringInterner::new();
            let tree = parse_tree(tree).unwrap();
            let words: Vec<&str> = source.split_whitespace().collect();
            let alignment =
                SymmetricAlignment::from_pairs(words.len(), tree.leaf_count(), pairs.iter().copied())
                    .unwrap();
            let mut at = AlignmentTree::new(&tree, &PercolationTable::english());
            at.annotate(&alignment).unwrap();

            let labels = (0..at.len()).map(|n| interner.intern(&at.node_string(n))).collect();
            let source = words.iter().map(|w| interner.intern(w)).collect();
            Sentence {
                tree: at,
                alignment,
                labels,
                source,
                interner,
            }
        }

        fn ctx(&self) -> InstanceContext<'_> {
            InstanceContext {
                tree: &self.tree,
                labels: &self.labels,
                source: &self.source,
                alignment: &self.alignment,
            }
        }

        fn xrs(&self, root: NodeId, composition: &[usize], low: usize, high: usize) -> String {
            let composition: BitSet = composition.iter().copied().collect();
            let inst = RuleInstance::new(self.ctx(), root, &composition, low, high).unwrap();
            inst.rule.to_xrs_string(&self.interner, false)
        }
    }

    #[test]
    fn test_minimal_instance() {
        // NP=0 DT=1 the=2 NN=3 dog=4
        let s = Sentence::new("(NP (DT the) (NN dog))", "le chien", &[(0, 0), (1, 1)]);
        let inst = RuleInstance::new(s.ctx(), 0, &BitSet::new(), 0, 1).unwrap();

        assert_eq!(inst.boundaries, vec![1, 3]);
        assert!(inst.unaligned_rhs.is_empty());
        assert_eq!(inst.rule.to_xrs_string(&s.interner, false), "NP(x0:DT x1:NN) -> x0 x1");
        assert_eq!(s.xrs(1, &[], 0, 0), "DT(\"the\") -> \"le\"");
    }

    #[test]
    fn test_composed_instance() {
        let s = Sentence::new("(NP (DT the) (NN dog))", "le chien", &[(0, 0), (1, 1)]);
        assert_eq!(s.xrs(0, &[1], 0, 1), "NP(DT(\"the\") x0:NN) -> \"le\" x0");
        assert_eq!(s.xrs(0, &[1, 3], 0, 1), "NP(DT(\"the\") NN(\"dog\")) -> \"le\" \"chien\"");
    }

    #[test]
    fn test_rhs_follows_source_order() {
        // S=0 NP=1 NN=2 dog=3 VP=4 VBZ=5 barks=6
        let s = Sentence::new("(S (NP (NN dog)) (VP (VBZ barks)))", "aboie chien", &[(0, 1), (1, 0)]);
        assert_eq!(s.xrs(0, &[], 0, 1), "S(x0:NP x1:VP) -> x1 x0");
    }

    #[test]
    fn test_unaligned_positions_recorded() {
        let s = Sentence::new("(NP (DT the) (NN dog))", "le chien", &[(1, 1)]);
        // Expanded to cover the unaligned "le".
        let inst = RuleInstance::new(s.ctx(), 0, &BitSet::new(), 0, 1).unwrap();

        assert_eq!(inst.boundaries, vec![3]);
        assert_eq!(inst.unaligned_rhs.iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(
            inst.rule.to_xrs_string(&s.interner, false),
            "NP(DT(\"the\") x0:NN) -> \"le\" x0"
        );
    }

    #[test]
    fn test_leaves_are_lowercased() {
        let s = Sentence::new("(NP (NNP Paris))", "Paris", &[(0, 0)]);
        assert_eq!(s.xrs(0, &[], 0, 0), "NP(x0:NNP) -> x0");
        assert_eq!(s.xrs(1, &[], 0, 0), "NNP(\"paris\") -> \"Paris\"");
    }
}
