//! Corpus-wide rule store.
//!
//! Every distinct rule gets a dense id. Rules are not kept as values: each is
//! encoded as `[lhs_id, rhs_id, code_0 .. code_k]`, where the LHS and RHS ids
//! come from their own interners and `code_i` is 0 for a terminal or
//! `slot + 1` for a non-terminal rewriting LHS slot `slot`. Shared LHS shapes
//! and RHS strings are therefore stored once.

use crate::intern::{IntArrayInterner, StringInterner, SymbolId};
use crate::rule::{GrammarFormat, LhsSlot, RhsSymbol, Rule};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::io::{self, Write};

/// Ids of a rule and of its parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleIds {
    pub rule: u32,
    pub lhs: u32,
    pub rhs: u32,
    pub root: u32,
}

/// Table sizes of a [`RuleIndex`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexSizes {
    pub rules: usize,
    pub lhs: usize,
    pub rhs: usize,
    pub roots: usize,
}

impl fmt::Display for IndexSizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rules={} lhs={} rhs={} roots={}",
            self.rules, self.lhs, self.rhs, self.roots
        )
    }
}

/// Deduplicating store of rules.
#[derive(Debug, Default, Clone)]
pub struct RuleIndex {
    rules: IntArrayInterner,
    lhs: IntArrayInterner,
    rhs: IntArrayInterner,
    roots: IntArrayInterner,
    /// Root id -> rule ids, in registration order.
    by_root: FxHashMap<u32, Vec<u32>>,
}

fn rhs_codes(rule: &Rule) -> impl Iterator<Item = u32> + '_ {
    rule.rhs()
        .iter()
        .map(|s| s.lhs_slot().map_or(0, |slot| u32::from(slot) + 1))
}

fn rhs_array(rule: &Rule) -> Vec<u32> {
    rule.rhs_labels().iter().map(|l| l.as_u32()).collect()
}

impl RuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` (if new) and return its ids.
    pub fn rule_id(&mut self, rule: &Rule) -> RuleIds {
        let lhs = self.lhs.intern(&rule.lhs_int_array());
        let rhs = self.rhs.intern(&rhs_array(rule));
        let root = self.roots.intern(&[rule.root().as_u32()]);

        let mut key = vec![lhs, rhs];
        key.extend(rhs_codes(rule));

        let before = self.rules.len();
        let id = self.rules.intern(&key);
        if self.rules.len() > before {
            self.by_root.entry(root).or_default().push(id);
        }

        RuleIds {
            rule: id,
            lhs,
            rhs,
            root,
        }
    }

    /// Ids of `rule` if it was registered before.
    pub fn lookup(&self, rule: &Rule) -> Option<RuleIds> {
        let lhs = self.lhs.id_of(&rule.lhs_int_array())?;
        let rhs = self.rhs.id_of(&rhs_array(rule))?;
        let root = self.roots.id_of(&[rule.root().as_u32()])?;

        let mut key = vec![lhs, rhs];
        key.extend(rhs_codes(rule));
        let id = self.rules.id_of(&key)?;

        Some(RuleIds {
            rule: id,
            lhs,
            rhs,
            root,
        })
    }

    pub fn contains(&self, rule: &Rule) -> bool {
        self.lookup(rule).is_some()
    }

    /// Rebuild the rule registered under `rule_id`.
    pub fn get(&self, rule_id: u32) -> Option<Rule> {
        let key = self.rules.get(rule_id)?;
        let (&lhs_id, rest) = key.split_first()?;
        let (&rhs_id, codes) = rest.split_first()?;

        let lhs = self.lhs.get(lhs_id)?;
        let (&n, rest) = lhs.split_first()?;
        let n = n as usize;
        if rest.len() != 2 * n {
            return None;
        }
        let (shape, labels) = rest.split_at(n);
        let lhs_struct: Vec<u16> = shape
            .iter()
            .map(|&c| u16::try_from(c).ok())
            .collect::<Option<Vec<u16>>>()?;
        let lhs_labels: Vec<SymbolId> = labels.iter().map(|&l| SymbolId::from_u32(l)).collect();

        let words = self.rhs.get(rhs_id)?;
        if words.len() != codes.len() {
            return None;
        }
        let rhs = words
            .iter()
            .zip(codes)
            .map(|(&word, &code)| match code {
                0 => Some(RhsSymbol::Terminal(SymbolId::from_u32(word))),
                k => LhsSlot::try_from(k - 1).ok().map(|lhs| RhsSymbol::NonTerminal {
                    label: SymbolId::from_u32(word),
                    lhs,
                }),
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Rule::new(lhs_struct.into(), lhs_labels.into(), rhs.into_boxed_slice()))
    }

    /// Every registered rule, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Rule)> + '_ {
        (0..self.rules.len() as u32).filter_map(move |id| self.get(id).map(|rule| (id, rule)))
    }

    /// Ids of the rules whose LHS root is `root`.
    pub fn rules_with_root(&self, root: SymbolId) -> &[u32] {
        self.roots
            .id_of(&[root.as_u32()])
            .and_then(|id| self.by_root.get(&id))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Number of distinct rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn size_info(&self) -> IndexSizes {
        IndexSizes {
            rules: self.rules.len(),
            lhs: self.lhs.len(),
            rhs: self.rhs.len(),
            roots: self.roots.len(),
        }
    }

    /// Write one line per rule, in id order. Returns the number of lines.
    pub fn write_grammar<W: Write>(
        &self,
        out: &mut W,
        interner: &StringInterner,
        format: GrammarFormat,
        syncat: bool,
    ) -> io::Result<usize> {
        let mut lines = 0;
        for (_, rule) in self.iter() {
            writeln!(out, "{}", format_rule_line(&rule, interner, format, syncat))?;
            lines += 1;
        }
        Ok(lines)
    }
}

/// One grammar line for `rule`.
pub fn format_rule_line(
    rule: &Rule,
    interner: &StringInterner,
    format: GrammarFormat,
    syncat: bool,
) -> String {
    match format {
        GrammarFormat::Xrs => format!("{} |||", rule.xrs(interner, syncat)),
        GrammarFormat::Joshua => {
            let root = interner.symbols().resolve(rule.root()).to_string();
            format!(
                "[{}] ||| {} ||| {}",
                root,
                rule.to_joshua_lhs(interner),
                rule.to_joshua_rhs(interner)
            )
        }
    }
}

/// A [`RuleIndex`] shared between threads.
///
/// Each call takes the lock once, so the rules of one sentence passed to
/// [`Self::register_all`] are inserted together.
#[derive(Debug, Default)]
pub struct SharedRuleIndex {
    inner: Mutex<RuleIndex>,
}

impl SharedRuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, rule: &Rule) -> RuleIds {
        self.inner.lock().rule_id(rule)
    }

    pub fn register_all<'r>(&self, rules: impl IntoIterator<Item = &'r Rule>) -> Vec<RuleIds> {
        let mut index = self.inner.lock();
        rules.into_iter().map(|r| index.rule_id(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_info(&self) -> IndexSizes {
        self.inner.lock().size_info()
    }

    /// Run `f` with the index locked.
    pub fn with<R>(&self, f: impl FnOnce(&RuleIndex) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn into_inner(self) -> RuleIndex {
        self.inner.into_inner()
    }
}

impl From<RuleIndex> for SharedRuleIndex {
    fn from(index: RuleIndex) -> Self {
        SharedRuleIndex {
            inner: Mutex::new(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn rule(interner: &StringInterner, shape: &[u16], labels: &[&str], rhs: &[(&str, Option<u16>)]) -> Rule {
        let labels: Vec<SymbolId> = labels.iter().map(|l| interner.intern(l)).collect();
        let rhs: Vec<RhsSymbol> = rhs
            .iter()
            .map(|&(word, slot)| match slot {
                Some(lhs) => RhsSymbol::NonTerminal {
                    label: interner.intern(word),
                    lhs,
                },
                None => RhsSymbol::Terminal(interner.intern(word)),
            })
            .collect();
        Rule::new(shape.into(), labels.into(), rhs.into_boxed_slice())
    }

    fn sample(interner: &StringInterner) -> Vec<Rule> {
        vec![
            rule(interner, &[2, 0, 0], &["NP", "DT", "NN"], &[("DT", Some(1)), ("NN", Some(2))]),
            rule(interner, &[1, 0], &["DT", "the"], &[("le", None)]),
            rule(interner, &[1, 0], &["NN", "dog"], &[("chien", None)]),
            rule(interner, &[1, 0], &["NN", "dog"], &[("le", None), ("chien", None)]),
        ]
    }

    #[test]
    fn test_insert_or_lookup() {
        let interner = StringInterner::new();
        let rules = sample(&interner);
        let mut index = RuleIndex::new();

        let ids: Vec<RuleIds> = rules.iter().map(|r| index.rule_id(r)).collect();
        assert_eq!(ids.iter().map(|i| i.rule).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        // Both NN rules share an LHS.
        assert_eq!(ids[2].lhs, ids[3].lhs);
        assert_ne!(ids[2].rhs, ids[3].rhs);
        // They also share a root.
        assert_eq!(ids[2].root, ids[3].root);

        let again = index.rule_id(&rules[1].clone());
        assert_eq!(again, ids[1]);
        assert_eq!(index.len(), 4);
        assert_eq!(index.lookup(&rules[3]), Some(ids[3]));
    }

    #[test]
    fn test_decode_round_trip() {
        let interner = StringInterner::new();
        let rules = sample(&interner);
        let mut index = RuleIndex::new();
        for r in &rules {
            index.rule_id(r);
        }

        let decoded: Vec<Rule> = index.iter().map(|(_, r)| r).collect();
        assert_eq!(decoded, rules);
        assert_eq!(index.get(99), None);
    }

    #[test]
    fn test_same_labels_different_links() {
        // Same LHS and RHS strings, but the two non-terminals are swapped.
        let interner = StringInterner::new();
        let straight = rule(&interner, &[2, 0, 0], &["S", "X", "X"], &[("X", Some(1)), ("X", Some(2))]);
        let swapped = rule(&interner, &[2, 0, 0], &["S", "X", "X"], &[("X", Some(2)), ("X", Some(1))]);

        let mut index = RuleIndex::new();
        let a = index.rule_id(&straight);
        let b = index.rule_id(&swapped);
        assert_eq!(a.lhs, b.lhs);
        assert_eq!(a.rhs, b.rhs);
        assert_ne!(a.rule, b.rule);
    }

    #[test]
    fn test_size_info_and_roots() {
        let interner = StringInterner::new();
        let mut index = RuleIndex::new();
        for r in &sample(&interner) {
            index.rule_id(r);
        }

        let sizes = index.size_info();
        assert_eq!(
            sizes,
            IndexSizes {
                rules: 4,
                lhs: 3,
                rhs: 4,
                roots: 3
            }
        );
        assert_eq!(sizes.to_string(), "rules=4 lhs=3 rhs=4 roots=3");
        assert_eq!(index.rules_with_root(interner.intern("NN")), &[2, 3]);
        assert!(index.rules_with_root(interner.intern("VP")).is_empty());
    }

    #[test]
    fn test_write_grammar_formats() {
        let interner = StringInterner::new();
        let mut index = RuleIndex::new();
        index.rule_id(&rule(&interner, &[2, 0, 0], &["S", "NP", "VP"], &[("VP", Some(2)), ("NP", Some(1))]));
        index.rule_id(&rule(&interner, &[1, 0], &["DT", "the"], &[("le", None)]));

        let mut xrs = Vec::new();
        let lines = index.write_grammar(&mut xrs, &interner, GrammarFormat::Xrs, true).unwrap();
        assert_eq!(lines, 2);
        assert_eq!(
            String::from_utf8(xrs).unwrap(),
            "S(x0:NP x1:VP) -> x1:VP x0:NP |||\nDT(\"the\") -> \"le\" |||\n"
        );

        let mut joshua = Vec::new();
        index.write_grammar(&mut joshua, &interner, GrammarFormat::Joshua, false).unwrap();
        assert_eq!(
            String::from_utf8(joshua).unwrap(),
            "[S] ||| [VP,1] [NP,2] ||| [NP,2] [VP,1]\n[DT] ||| le ||| the\n"
        );
    }

    #[test]
    fn test_shared_index_across_threads() {
        let interner = StringInterner::new();
        let rules = sample(&interner);
        let shared = Arc::new(SharedRuleIndex::new());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let shared = Arc::clone(&shared);
                let rules = &rules;
                scope.spawn(move || {
                    shared.register_all(rules.iter());
                });
            }
        });

        assert_eq!(shared.len(), 4);
        let first = shared.with(|index| index.lookup(&rules[0]));
        assert!(first.is_some());

        let index = Arc::try_unwrap(shared).unwrap().into_inner();
        assert_eq!(index.iter().count(), 4);
    }
}
