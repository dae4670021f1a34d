//! Synchronous tree-to-string rules.
//!
//! A rule pairs a target tree fragment (the LHS) with a source string (the
//! RHS). The LHS is stored as two parallel pre-order arrays: child counts and
//! labels. The RHS is a sequence of terminals and non-terminals; each
//! non-terminal points back at the LHS leaf it rewrites.
//!
//! ```text
//! NP(x0:DT x1:NN) -> x0 x1
//! DT("the") -> "le"
//! ```

use crate::intern::{StringInterner, SymbolId, Symbols};
use crate::unaligned::UnalignedWordSet;
use bit_set::BitSet;
use log::debug;
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;

/// Index of a node in a rule's LHS arrays.
pub type LhsSlot = u16;

/// Default limit on unaligned RHS words before variant enumeration is skipped.
pub const MAX_UNALIGNED_RHS: usize = 7;

/// One RHS slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RhsSymbol {
    /// A source word.
    Terminal(SymbolId),
    /// A variable standing for the LHS leaf at `lhs`.
    NonTerminal { label: SymbolId, lhs: LhsSlot },
}

impl RhsSymbol {
    pub fn is_non_terminal(&self) -> bool {
        matches!(self, RhsSymbol::NonTerminal { .. })
    }

    pub fn label(&self) -> SymbolId {
        match *self {
            RhsSymbol::Terminal(word) => word,
            RhsSymbol::NonTerminal { label, .. } => label,
        }
    }

    pub fn lhs_slot(&self) -> Option<LhsSlot> {
        match *self {
            RhsSymbol::Terminal(_) => None,
            RhsSymbol::NonTerminal { lhs, .. } => Some(lhs),
        }
    }
}

/// An extracted rule. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Rule {
    lhs_struct: Arc<[u16]>,
    lhs_labels: Arc<[SymbolId]>,
    rhs: Box<[RhsSymbol]>,
}

impl Rule {
    pub fn new(lhs_struct: Arc<[u16]>, lhs_labels: Arc<[SymbolId]>, rhs: Box<[RhsSymbol]>) -> Self {
        debug_assert_eq!(lhs_struct.len(), lhs_labels.len());
        Rule {
            lhs_struct,
            lhs_labels,
            rhs,
        }
    }

    /// Child count of each LHS node, pre-order.
    pub fn lhs_struct(&self) -> &[u16] {
        &self.lhs_struct
    }

    /// Label of each LHS node, pre-order.
    pub fn lhs_labels(&self) -> &[SymbolId] {
        &self.lhs_labels
    }

    pub fn rhs(&self) -> &[RhsSymbol] {
        &self.rhs
    }

    /// Label of the LHS root.
    pub fn root(&self) -> SymbolId {
        self.lhs_labels[0]
    }

    pub fn lhs_len(&self) -> usize {
        self.lhs_struct.len()
    }

    pub fn rhs_len(&self) -> usize {
        self.rhs.len()
    }

    /// Number of non-terminals.
    pub fn arity(&self) -> usize {
        self.rhs.iter().filter(|s| s.is_non_terminal()).count()
    }

    pub fn rhs_labels(&self) -> Vec<SymbolId> {
        self.rhs.iter().map(RhsSymbol::label).collect()
    }

    /// For each RHS slot, the LHS node it maps to (non-terminals only).
    pub fn rhs2lhs(&self) -> Vec<Option<LhsSlot>> {
        self.rhs.iter().map(RhsSymbol::lhs_slot).collect()
    }

    pub fn is_lhs_non_terminal(&self, slot: LhsSlot) -> bool {
        self.rhs.iter().any(|s| s.lhs_slot() == Some(slot))
    }

    /// `[n, struct_0..struct_n, label_0..label_n]`.
    pub fn lhs_int_array(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(1 + 2 * self.lhs_len());
        out.push(self.lhs_len() as u32);
        out.extend(self.lhs_struct.iter().map(|&c| u32::from(c)));
        out.extend(self.lhs_labels.iter().map(|l| l.as_u32()));
        out
    }

    /// The same rule with the RHS positions in `dropped` removed.
    pub fn without_positions(&self, dropped: &BitSet) -> Rule {
        let rhs = self
            .rhs
            .iter()
            .enumerate()
            .filter(|(i, _)| !dropped.contains(*i))
            .map(|(_, s)| *s)
            .collect();
        Rule {
            lhs_struct: Arc::clone(&self.lhs_struct),
            lhs_labels: Arc::clone(&self.lhs_labels),
            rhs,
        }
    }

    /// All rules obtained by leaving out legal subsets of the unaligned RHS
    /// positions in `unaligned`, starting with this rule itself.
    ///
    /// With more than `max_unaligned` positions the search is skipped and only
    /// this rule is returned.
    pub fn all_rhs_variants(&self, unaligned: &BitSet, max_unaligned: usize) -> Vec<Rule> {
        if unaligned.len() > max_unaligned {
            debug!(
                "{} unaligned RHS words exceed the limit of {}, keeping them all",
                unaligned.len(),
                max_unaligned
            );
            return vec![self.clone()];
        }

        let full = UnalignedWordSet::full(&self.rhs, unaligned);
        let mut closed = FxHashSet::default();
        closed.insert(full.clone());
        let mut open = vec![full];
        let mut variants = Vec::new();

        while let Some(set) = open.pop() {
            variants.push(self.without_positions(&set.dropped()));
            for smaller in set.size_minus_one_sets() {
                if closed.insert(smaller.clone()) {
                    open.push(smaller);
                }
            }
        }
        variants
    }

    /// Xrs variable number for every LHS slot that is a non-terminal.
    fn lhs_vars(&self) -> Vec<Option<usize>> {
        let mut vars = vec![None; self.lhs_len()];
        for s in self.rhs.iter().filter_map(RhsSymbol::lhs_slot) {
            vars[s as usize] = Some(0);
        }
        let mut next = 0;
        for v in vars.iter_mut().flatten() {
            *v = next;
            next += 1;
        }
        vars
    }

    /// Joshua index (1-based, RHS order) for every non-terminal LHS slot.
    fn joshua_indices(&self) -> Vec<Option<usize>> {
        let mut indices = vec![None; self.lhs_len()];
        for (k, s) in self.rhs.iter().filter_map(RhsSymbol::lhs_slot).enumerate() {
            indices[s as usize] = Some(k + 1);
        }
        indices
    }

    /// Render in Xrs notation, e.g. `NP(x0:DT "dog") -> x0 "chien"`.
    pub fn xrs<'a>(&'a self, interner: &'a StringInterner, syncat: bool) -> Xrs<'a> {
        Xrs {
            rule: self,
            interner,
            syncat,
        }
    }

    pub fn to_xrs_string(&self, interner: &StringInterner, syncat: bool) -> String {
        self.xrs(interner, syncat).to_string()
    }

    /// Source side in Joshua notation, e.g. `[VP,1] "aboie"`.
    pub fn to_joshua_lhs(&self, interner: &StringInterner) -> String {
        let symbols = interner.symbols();
        let mut k = 0;
        let tokens: Vec<String> = self
            .rhs
            .iter()
            .map(|s| match *s {
                RhsSymbol::Terminal(word) => symbols.resolve(word).to_string(),
                RhsSymbol::NonTerminal { label, .. } => {
                    k += 1;
                    format!("[{},{}]", symbols.resolve(label), k)
                }
            })
            .collect();
        tokens.join(" ")
    }

    /// Target yield in Joshua notation, sharing indices with [`Self::to_joshua_lhs`].
    pub fn to_joshua_rhs(&self, interner: &StringInterner) -> String {
        let symbols = interner.symbols();
        let indices = self.joshua_indices();
        let tokens: Vec<String> = (0..self.lhs_len())
            .filter(|&slot| self.lhs_struct[slot] == 0)
            .map(|slot| {
                let label = symbols.resolve(self.lhs_labels[slot]);
                match indices[slot] {
                    Some(k) => format!("[{},{}]", label, k),
                    None => label.to_string(),
                }
            })
            .collect();
        tokens.join(" ")
    }

    fn write_lhs(
        &self,
        f: &mut fmt::Formatter<'_>,
        symbols: &Symbols<'_>,
        vars: &[Option<usize>],
        slot: &mut usize,
    ) -> fmt::Result {
        let here = *slot;
        *slot += 1;
        let label = symbols.resolve(self.lhs_labels[here]);

        match (self.lhs_struct[here], vars[here]) {
            (0, Some(var)) => write!(f, "x{}:{}", var, label),
            (0, None) => write!(f, "\"{}\"", label),
            (children, _) => {
                write!(f, "{}(", label)?;
                for i in 0..children {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    self.write_lhs(f, symbols, vars, slot)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Xrs rendering of a [`Rule`]; see [`Rule::xrs`].
pub struct Xrs<'a> {
    rule: &'a Rule,
    interner: &'a StringInterner,
    syncat: bool,
}

impl fmt::Display for Xrs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = self.rule;
        let symbols = self.interner.symbols();
        let vars = rule.lhs_vars();

        let mut slot = 0;
        rule.write_lhs(f, &symbols, &vars, &mut slot)?;
        write!(f, " ->")?;

        for s in rule.rhs.iter() {
            match *s {
                RhsSymbol::Terminal(word) => write!(f, " \"{}\"", symbols.resolve(word))?,
                RhsSymbol::NonTerminal { label, lhs } => {
                    let var = vars[lhs as usize].unwrap_or_default();
                    if self.syncat {
                        write!(f, " x{}:{}", var, symbols.resolve(label))?;
                    } else {
                        write!(f, " x{}", var)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Text format of a written grammar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GrammarFormat {
    /// `NP(x0:DT x1:NN) -> x0 x1 |||`
    #[default]
    Xrs,
    /// `[NP] ||| [DT,1] [NN,2] ||| [DT,1] [NN,2]`
    Joshua,
}
