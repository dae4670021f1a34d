//! Target-side constituency trees and head finding.
//!
//! A [`ParseTree`] is a rooted, ordered, labeled tree stored as an arena in
//! pre-order: the root is node 0 and every parent precedes its children.
//! Leaves are the target words.

use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a node inside a tree arena.
pub type NodeId = usize;

/// A single node of a [`ParseTree`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseNode {
    pub label: String,
    pub children: Vec<NodeId>,
}

/// A bare parse tree as produced by a parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTree {
    nodes: Vec<ParseNode>,
}

impl ParseTree {
    /// Create a single-node tree (a word).
    pub fn leaf(label: impl Into<String>) -> Self {
        ParseTree {
            nodes: vec![ParseNode {
                label: label.into(),
                children: Vec::new(),
            }],
        }
    }

    /// Create a tree whose root has the given subtrees as children.
    pub fn node(label: impl Into<String>, children: Vec<ParseTree>) -> Self {
        let mut nodes = vec![ParseNode {
            label: label.into(),
            children: Vec::new(),
        }];

        for child in children {
            let offset = nodes.len();
            nodes[0].children.push(offset);
            nodes.extend(child.nodes.into_iter().map(|mut n| {
                for c in &mut n.children {
                    *c += offset;
                }
                n
            }));
        }

        ParseTree { nodes }
    }

    /// Create a pre-terminal: `(tag word)`.
    pub fn preterminal(tag: impl Into<String>, word: impl Into<String>) -> Self {
        ParseTree::node(tag, vec![ParseTree::leaf(word)])
    }

    pub fn root(&self) -> NodeId {
        0
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn label(&self, node: NodeId) -> &str {
        &self.nodes[node].label
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes[node].children.is_empty()
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> {
        // Pre-order numbering makes ascending ids left-to-right for leaves.
        (0..self.nodes.len()).filter(|&n| self.is_leaf(n)).collect()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.children.is_empty()).count()
    }

    /// The words of the tree, left to right.
    pub fn yield_words(&self) -> Vec<&str> {
        self.leaves().into_iter().map(|n| self.label(n)).collect()
    }

    fn fmt_node(&self, node: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf(node) {
            return write!(f, "{}", self.label(node));
        }
        write!(f, "({}", self.label(node))?;
        for &child in self.children(node) {
            write!(f, " ")?;
            self.fmt_node(child, f)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(self.root(), f)
    }
}

// ============================================================================
// Head finding
// ============================================================================

/// Selects the head child of an internal node.
///
/// Implementations encode head-percolation rules; they are consulted once
/// per internal node when an alignment tree is built.
pub trait HeadFinder {
    /// Index (into `tree.children(node)`) of the head child, if any.
    fn head_child(&self, tree: &ParseTree, node: NodeId) -> Option<usize>;
}

/// Search direction over a node's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

/// Table-driven head percolation.
///
/// For a category, the priority list is tried in order; for each entry the
/// children are scanned in the rule's direction and the first child whose
/// category matches wins. Without a match, the first child in that
/// direction is the head.
#[derive(Clone, Debug)]
pub struct PercolationTable {
    rules: FxHashMap<String, (Direction, Vec<String>)>,
    default: Direction,
}

impl Default for PercolationTable {
    fn default() -> Self {
        PercolationTable::new(Direction::LeftToRight)
    }
}

impl PercolationTable {
    /// An empty table: every head is the first child in `default` order.
    pub fn new(default: Direction) -> Self {
        PercolationTable {
            rules: FxHashMap::default(),
            default,
        }
    }

    /// Add a percolation rule for `category`.
    pub fn with_rule(mut self, category: &str, direction: Direction, priorities: &[&str]) -> Self {
        self.rules.insert(
            category.to_string(),
            (direction, priorities.iter().map(|p| p.to_string()).collect()),
        );
        self
    }

    /// A small English table in the spirit of Collins (1999).
    pub fn english() -> Self {
        use Direction::*;
        PercolationTable::new(LeftToRight)
            .with_rule("ADJP", LeftToRight, &["NNS", "QP", "NN", "$", "ADVP", "JJ", "VBN", "VBG", "ADJP"])
            .with_rule("ADVP", RightToLeft, &["RB", "RBR", "RBS", "FW", "ADVP", "TO", "CD", "JJR", "JJ"])
            .with_rule("NP", RightToLeft, &["NN", "NNP", "NNPS", "NNS", "NX", "POS", "JJR", "NP", "CD"])
            .with_rule("PP", LeftToRight, &["IN", "TO", "VBG", "VBN", "RP", "FW"])
            .with_rule("QP", LeftToRight, &["$", "IN", "NNS", "NN", "JJ", "RB", "DT", "CD"])
            .with_rule("S", LeftToRight, &["TO", "IN", "VP", "S", "SBAR", "ADJP", "UCP", "NP"])
            .with_rule("SBAR", LeftToRight, &["WHNP", "WHPP", "WHADVP", "IN", "DT", "S", "SQ", "SINV", "SBAR"])
            .with_rule("VP", LeftToRight, &["TO", "VBD", "VBN", "MD", "VBZ", "VB", "VBG", "VBP", "VP", "ADJP", "NN", "NNS", "NP"])
    }

    fn scan(children: &[NodeId], direction: Direction) -> Box<dyn Iterator<Item = (usize, &NodeId)> + '_> {
        match direction {
            Direction::LeftToRight => Box::new(children.iter().enumerate()),
            Direction::RightToLeft => Box::new(children.iter().enumerate().rev()),
        }
    }
}

/// Strip function tags and indices: `NP-SBJ-1` -> `NP`, `NP=2` -> `NP`.
pub fn base_category(label: &str) -> &str {
    if label.starts_with('-') {
        // -LRB-, -NONE- and friends.
        return label;
    }
    label.split(['-', '=']).next().unwrap_or(label)
}

impl HeadFinder for PercolationTable {
    fn head_child(&self, tree: &ParseTree, node: NodeId) -> Option<usize> {
        let children = tree.children(node);
        match children.len() {
            0 => return None,
            1 => return Some(0),
            _ => {}
        }

        let category = base_category(tree.label(node));
        let (direction, priorities) = match self.rules.get(category) {
            Some((direction, priorities)) => (*direction, priorities.as_slice()),
            None => (self.default, &[][..]),
        };

        for wanted in priorities {
            let hit = Self::scan(children, direction)
                .find(|&(_, &c)| base_category(tree.label(c)) == wanted.as_str());
            if let Some((idx, _)) = hit {
                return Some(idx);
            }
        }

        Self::scan(children, direction).next().map(|(idx, _)| idx)
    }
}
