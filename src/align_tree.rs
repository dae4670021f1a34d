//! Target trees decorated with source spans.
//!
//! An [`AlignmentTree`] copies a [`ParseTree`] into parallel arrays keyed by
//! [`NodeId`] and adds, per node:
//! - the head child, head word and head tag;
//! - `fspan`: source positions aligned to any word in the node's yield;
//! - `fcomplement`: source positions aligned to words outside the subtree;
//! - the frontier flag.
//!
//! The three annotation passes must run in order, once each:
//! [`AlignmentTree::set_fspans`], [`AlignmentTree::set_fcomplement_spans`],
//! [`AlignmentTree::set_frontier_nodes`].

use crate::alignment::WordAlignment;
use crate::tree::{HeadFinder, NodeId, ParseTree};
use bit_set::BitSet;
use log::debug;
use std::fmt;
use thiserror::Error;

/// Which annotation pass ran last.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpanPass {
    Unset,
    FSpans,
    ComplementSpans,
    Frontier,
}

impl fmt::Display for SpanPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpanPass::Unset => "unset",
            SpanPass::FSpans => "fspans",
            SpanPass::ComplementSpans => "complement spans",
            SpanPass::Frontier => "frontier",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {node} has an empty source span")]
    EmptySpan { node: NodeId },
    #[error("annotation passes out of order: tree must be at stage {expected}, found {found}")]
    PassOrder { expected: SpanPass, found: SpanPass },
    #[error("rule rooted at node {node} has {size} LHS nodes, more than a rule can hold")]
    RuleTooLarge { node: NodeId, size: usize },
}

/// A target tree with alignment-derived annotations.
#[derive(Clone, Debug)]
pub struct AlignmentTree {
    labels: Vec<String>,
    children: Vec<Vec<NodeId>>,
    parent: Vec<Option<NodeId>>,
    head_child: Vec<Option<usize>>,
    head_leaf: Vec<Option<NodeId>>,
    leaves: Vec<NodeId>,
    fspan: Vec<BitSet>,
    fcomplement: Vec<BitSet>,
    frontier: Vec<bool>,
    pass: SpanPass,
}

impl AlignmentTree {
    /// Build the arena from a parse tree, computing heads with `heads`.
    pub fn new(tree: &ParseTree, heads: &dyn HeadFinder) -> Self {
        let len = tree.len();
        let mut labels = Vec::with_capacity(len);
        let mut children = Vec::with_capacity(len);
        let mut parent = vec![None; len];
        let mut head_child = Vec::with_capacity(len);

        for n in 0..len {
            labels.push(tree.label(n).to_string());
            children.push(tree.children(n).to_vec());
            for &c in tree.children(n) {
                parent[c] = Some(n);
            }
            head_child.push(heads.head_child(tree, n));
        }

        // Children have larger ids, so a reverse sweep sees them first.
        let mut head_leaf = vec![None; len];
        for n in (0..len).rev() {
            let head = if children[n].is_empty() {
                Some(n)
            } else {
                head_child[n]
                    .and_then(|i: usize| children[n].get(i).copied())
                    .and_then(|c| head_leaf[c])
            };
            head_leaf[n] = head;
        }

        AlignmentTree {
            leaves: tree.leaves(),
            labels,
            children,
            parent,
            head_child,
            head_leaf,
            fspan: vec![BitSet::new(); len],
            fcomplement: vec![BitSet::new(); len],
            frontier: vec![false; len],
            pass: SpanPass::Unset,
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, n: NodeId) -> &str {
        &self.labels[n]
    }

    pub fn children(&self, n: NodeId) -> &[NodeId] {
        &self.children[n]
    }

    pub fn parent(&self, n: NodeId) -> Option<NodeId> {
        self.parent[n]
    }

    pub fn is_leaf(&self, n: NodeId) -> bool {
        self.children[n].is_empty()
    }

    /// Leaves in left-to-right order; the i-th leaf is target word i.
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    pub fn pass(&self) -> SpanPass {
        self.pass
    }

    /// Index of the head child among `children(n)`.
    pub fn head_child(&self, n: NodeId) -> Option<usize> {
        self.head_child[n]
    }

    /// The leaf that heads `n`.
    pub fn head_leaf(&self, n: NodeId) -> Option<NodeId> {
        self.head_leaf[n]
    }

    /// The word heading `n`.
    pub fn head_word(&self, n: NodeId) -> Option<&str> {
        self.head_leaf[n].map(|leaf| self.label(leaf))
    }

    /// The part-of-speech tag of the word heading `n`.
    pub fn head_tag(&self, n: NodeId) -> Option<&str> {
        self.head_leaf[n]
            .and_then(|leaf| self.parent[leaf])
            .map(|tag| self.label(tag))
    }

    /// Text used for `n` in rules: leaves are lowercased.
    pub fn node_string(&self, n: NodeId) -> String {
        if self.is_leaf(n) {
            self.labels[n].to_lowercase()
        } else {
            self.labels[n].clone()
        }
    }

    pub fn fspan(&self, n: NodeId) -> &BitSet {
        &self.fspan[n]
    }

    pub fn fcomplement_span(&self, n: NodeId) -> &BitSet {
        &self.fcomplement[n]
    }

    pub fn is_frontier(&self, n: NodeId) -> bool {
        self.frontier[n]
    }

    /// Smallest source position in `fspan(n)`.
    pub fn low_fspan(&self, n: NodeId) -> Result<usize, TreeError> {
        self.fspan[n]
            .iter()
            .next()
            .ok_or(TreeError::EmptySpan { node: n })
    }

    /// Largest source position in `fspan(n)`.
    pub fn high_fspan(&self, n: NodeId) -> Result<usize, TreeError> {
        self.fspan[n]
            .iter()
            .last()
            .ok_or(TreeError::EmptySpan { node: n })
    }

    /// `(low, high)` of `fspan(n)`.
    pub fn fspan_bounds(&self, n: NodeId) -> Result<(usize, usize), TreeError> {
        Ok((self.low_fspan(n)?, self.high_fspan(n)?))
    }

    pub(crate) fn add_to_fspan(&mut self, n: NodeId, f: usize) {
        self.fspan[n].insert(f);
    }

    pub(crate) fn add_to_fcomplement_span(&mut self, n: NodeId, f: usize) {
        self.fcomplement[n].insert(f);
    }

    fn advance_pass(&mut self, from: SpanPass, to: SpanPass) -> Result<(), TreeError> {
        if self.pass != from {
            return Err(TreeError::PassOrder {
                expected: from,
                found: self.pass,
            });
        }
        self.pass = to;
        Ok(())
    }

    /// Bottom-up: each leaf takes the source positions of its target word,
    /// each internal node the union of its children.
    pub fn set_fspans<A: WordAlignment + ?Sized>(&mut self, alignment: &A) -> Result<(), TreeError> {
        self.advance_pass(SpanPass::Unset, SpanPass::FSpans)?;

        for e in 0..self.leaves.len() {
            let leaf = self.leaves[e];
            for &f in alignment.e2f(e) {
                self.add_to_fspan(leaf, f);
            }
        }

        for n in (0..self.len()).rev() {
            // Children come after their parent in the arena.
            let (head, tail) = self.fspan.split_at_mut(n + 1);
            for &c in &self.children[n] {
                head[n].union_with(&tail[c - n - 1]);
            }
        }
        Ok(())
    }

    /// Top-down: a child's complement is its parent's complement plus the
    /// spans of its siblings.
    pub fn set_fcomplement_spans(&mut self) -> Result<(), TreeError> {
        self.advance_pass(SpanPass::FSpans, SpanPass::ComplementSpans)?;

        for n in 0..self.len() {
            let kids = self.children[n].clone();
            for &c in &kids {
                let mut complement = self.fcomplement[n].clone();
                for &sibling in kids.iter().filter(|&&s| s != c) {
                    complement.union_with(&self.fspan[sibling]);
                }
                for f in complement.iter() {
                    self.add_to_fcomplement_span(c, f);
                }
            }
        }
        Ok(())
    }

    /// A node is a frontier node when its span is non-empty and the closed
    /// interval it covers shares no position with its complement span.
    pub fn set_frontier_nodes(&mut self) -> Result<(), TreeError> {
        self.advance_pass(SpanPass::ComplementSpans, SpanPass::Frontier)?;

        for n in 0..self.len() {
            let frontier = match self.fspan_bounds(n) {
                Ok((low, high)) => !self.fcomplement[n]
                    .iter()
                    .any(|f| low <= f && f <= high),
                Err(_) => false,
            };
            self.frontier[n] = frontier;
            if frontier {
                debug!("frontier node {} ({})", n, self.labels[n]);
            }
        }
        Ok(())
    }

    /// Run all three passes.
    pub fn annotate<A: WordAlignment + ?Sized>(&mut self, alignment: &A) -> Result<(), TreeError> {
        self.set_fspans(alignment)?;
        self.set_fcomplement_spans()?;
        self.set_frontier_nodes()
    }

    /// Bracketed rendering with spans and frontier marks, for diagnostics.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        self.write_debug(self.root(), &mut out);
        out
    }

    fn write_debug(&self, n: NodeId, out: &mut String) {
        use std::fmt::Write;
        let span: Vec<usize> = self.fspan[n].iter().collect();
        let mark = if self.frontier[n] { "*" } else { "" };
        if self.is_leaf(n) {
            let _ = write!(out, "{}{}{:?}", self.node_string(n), mark, span);
            return;
        }
        let _ = write!(out, "({}{}{:?}", self.labels[n], mark, span);
        for &c in &self.children[n] {
            out.push(' ');
            self.write_debug(c, out);
        }
        out.push(')');
    }
}
