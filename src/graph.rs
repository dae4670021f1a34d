//! Per-sentence rule extraction.
//!
//! An [`AlignmentGraph`] ties one target tree to its source sentence and word
//! alignment, runs the span passes, and walks the frontier nodes depth first
//! to produce minimal and composed rules following Galley et al. (2004, 2006).

use crate::align_tree::{AlignmentTree, TreeError};
use crate::alignment::WordAlignment;
use crate::config::ExtractorConfig;
use crate::instance::{InstanceContext, RuleInstance};
use crate::intern::{StringInterner, SymbolId};
use crate::parser::ParseError;
use crate::rule::Rule;
use crate::tree::{HeadFinder, NodeId, ParseTree};
use bit_set::BitSet;
use log::{debug, info, warn};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Errors that abort extraction for one sentence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("tree has {leaves} leaves but the alignment covers {target_len} target words")]
    LeafCountMismatch { leaves: usize, target_len: usize },
    #[error("sentence has {words} source words but the alignment covers {source_len}")]
    SourceLengthMismatch { words: usize, source_len: usize },
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("sentence {line}: {source}")]
    Sentence {
        line: usize,
        #[source]
        source: Box<ExtractError>,
    },
}

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub nodes_visited: usize,
    pub frontier_nodes: usize,
    pub instances: usize,
    pub rules: usize,
    /// Instances whose unaligned words exceeded the variant limit.
    pub truncated_variant_searches: usize,
    /// Frontier nodes whose composition search stopped at the limit.
    pub capped_composition_searches: usize,
}

impl ExtractionStats {
    /// Add another run's counters to these.
    pub fn absorb(&mut self, other: &ExtractionStats) {
        self.nodes_visited += other.nodes_visited;
        self.frontier_nodes += other.frontier_nodes;
        self.instances += other.instances;
        self.rules += other.rules;
        self.truncated_variant_searches += other.truncated_variant_searches;
        self.capped_composition_searches += other.capped_composition_searches;
    }
}

/// A target tree aligned to its source sentence.
pub struct AlignmentGraph<A: WordAlignment> {
    tree: AlignmentTree,
    alignment: A,
    source: Vec<String>,
    minimal_rules: Vec<Option<Rule>>,
    stats: ExtractionStats,
}

impl<A: WordAlignment> AlignmentGraph<A> {
    /// Decorate `tree` with the alignment and find its frontier nodes.
    ///
    /// `raw_target`, when given, is compared against the tree's yield; a
    /// mismatch is only logged.
    pub fn new(
        alignment: A,
        source: Vec<String>,
        tree: &ParseTree,
        raw_target: Option<&str>,
        heads: &dyn HeadFinder,
    ) -> Result<Self, ExtractError> {
        let leaves = tree.leaf_count();
        if leaves != alignment.target_len() {
            return Err(ExtractError::LeafCountMismatch {
                leaves,
                target_len: alignment.target_len(),
            });
        }
        if source.len() != alignment.source_len() {
            return Err(ExtractError::SourceLengthMismatch {
                words: source.len(),
                source_len: alignment.source_len(),
            });
        }

        if let Some(raw) = raw_target {
            let words = tree.yield_words();
            if !raw.split_whitespace().eq(words.iter().copied()) {
                warn!("tree yield {:?} differs from target sentence {:?}", words.join(" "), raw);
            }
        }

        let mut at = AlignmentTree::new(tree, heads);
        at.annotate(&alignment)?;

        Ok(AlignmentGraph {
            minimal_rules: vec![None; at.len()],
            tree: at,
            alignment,
            source,
            stats: ExtractionStats::default(),
        })
    }

    pub fn tree(&self) -> &AlignmentTree {
        &self.tree
    }

    pub fn alignment(&self) -> &A {
        &self.alignment
    }

    pub fn source(&self) -> &[String] {
        &self.source
    }

    /// Counters from the last [`Self::extract_rules`] call.
    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    /// The minimal rule rooted at `n`, once extraction has visited it.
    pub fn minimal_rule(&self, n: NodeId) -> Option<&Rule> {
        self.minimal_rules.get(n).and_then(Option::as_ref)
    }

    /// Grow `[low, high]` over neighbouring source words with no alignment.
    fn expand_span(&self, mut low: usize, mut high: usize) -> (usize, usize) {
        while low > 0 && self.alignment.is_source_unaligned(low - 1) {
            low -= 1;
        }
        while high + 1 < self.source.len() && self.alignment.is_source_unaligned(high + 1) {
            high += 1;
        }
        (low, high)
    }

    /// Extract every minimal rule, the composed rules allowed by
    /// `config.max_compositions`, and their unaligned-word variants.
    pub fn extract_rules(
        &mut self,
        interner: &StringInterner,
        config: &ExtractorConfig,
    ) -> Result<FxHashSet<Rule>, ExtractError> {
        let labels: Vec<SymbolId> = (0..self.tree.len())
            .map(|n| interner.intern(&self.tree.node_string(n)))
            .collect();
        let source: Vec<SymbolId> = self.source.iter().map(|w| interner.intern(w)).collect();

        let mut stats = ExtractionStats::default();
        let mut minimal_rules = vec![None; self.tree.len()];
        let mut rules = FxHashSet::default();

        let ctx = InstanceContext {
            tree: &self.tree,
            labels: &labels,
            source: &source,
            alignment: &self.alignment,
        };

        let root = self.tree.root();
        let mut visited = BitSet::with_capacity(self.tree.len());
        visited.insert(root);
        let mut stack = vec![root];

        while let Some(n) = stack.pop() {
            stats.nodes_visited += 1;
            if self.tree.is_leaf(n) {
                continue;
            }
            if !self.tree.is_frontier(n) {
                for &c in self.tree.children(n).iter().rev() {
                    if visited.insert(c) {
                        stack.push(c);
                    }
                }
                continue;
            }

            stats.frontier_nodes += 1;
            let (low, high) = self.tree.fspan_bounds(n)?;
            let (low, high) = self.expand_span(low, high);

            let mut closed: FxHashSet<BitSet> = FxHashSet::default();
            closed.insert(BitSet::new());
            let mut open = vec![BitSet::new()];
            let mut capped = false;

            while let Some(composition) = open.pop() {
                let instance = RuleInstance::new(ctx, n, &composition, low, high)?;
                stats.instances += 1;

                if instance.unaligned_rhs.len() > config.max_unaligned_rhs {
                    stats.truncated_variant_searches += 1;
                }
                for rule in instance
                    .rule
                    .all_rhs_variants(&instance.unaligned_rhs, config.max_unaligned_rhs)
                {
                    debug!("rule at node {}: {}", n, rule.xrs(interner, config.syncat_rhs));
                    rules.insert(rule);
                }

                let can_grow = composition.len() < config.max_compositions;
                for &b in &instance.boundaries {
                    if visited.insert(b) {
                        stack.push(b);
                    }
                    if can_grow {
                        let mut bigger = composition.clone();
                        bigger.insert(b);
                        if closed.insert(bigger.clone()) {
                            open.push(bigger);
                        }
                    } else if config.max_compositions > 0 {
                        capped = true;
                    }
                }

                if composition.is_empty() {
                    minimal_rules[n] = Some(instance.rule);
                }
            }

            if capped {
                stats.capped_composition_searches += 1;
            }
        }

        stats.rules = rules.len();
        if stats.truncated_variant_searches > 0 {
            info!(
                "{} of {} rule instances had more than {} unaligned RHS words",
                stats.truncated_variant_searches, stats.instances, config.max_unaligned_rhs
            );
        }
        if stats.capped_composition_searches > 0 {
            info!(
                "composition stopped at {} nodes for {} of {} frontier nodes",
                config.max_compositions, stats.capped_composition_searches, stats.frontier_nodes
            );
        }

        self.minimal_rules = minimal_rules;
        self.stats = stats;
        Ok(rules)
    }
}
