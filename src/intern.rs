//! String and integer-array interning.
//!
//! Rule extraction produces tens of millions of rules over a corpus, so every
//! label and word is stored as a small integer:
//! 1. String interning: map tree labels and source words to [`SymbolId`]s.
//!    The [`StringInterner`] is shared between sentences and is safe to use
//!    from several threads.
//! 2. Int-array interning: map whole `[u32]` encodings (LHS shapes, RHS
//!    sequences, rules) to dense ids with insert-or-lookup semantics.

use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Interned symbol ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Rebuild an id from its raw value (used when decoding interned arrays).
    pub fn from_u32(raw: u32) -> Self {
        SymbolId(raw)
    }
}

/// Placeholder rendered for ids this interner never handed out.
pub const UNKNOWN_SYMBOL: &str = "<unk>";

#[derive(Debug, Default)]
struct SymbolTable {
    str_to_id: FxHashMap<Arc<str>, SymbolId>,
    id_to_str: Vec<Arc<str>>,
}

/// Thread-safe string interner.
///
/// Lookups of already-known strings only take a shared read lock. Inserting a
/// new string goes through an upgradable read so that two threads interning
/// the same unseen string still agree on one id.
#[derive(Debug, Default)]
pub struct StringInterner {
    table: RwLock<SymbolTable>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its unique ID.
    pub fn intern(&self, s: &str) -> SymbolId {
        if let Some(&id) = self.table.read().str_to_id.get(s) {
            return id;
        }

        // Re-check under the upgradable lock: another thread may have won.
        let table = self.table.upgradable_read();
        if let Some(&id) = table.str_to_id.get(s) {
            return id;
        }

        let mut table = RwLockUpgradableReadGuard::upgrade(table);
        let id = SymbolId(table.id_to_str.len() as u32);
        let shared: Arc<str> = s.into();
        table.str_to_id.insert(shared.clone(), id);
        table.id_to_str.push(shared);
        id
    }

    /// Look up a string without inserting it.
    pub fn get(&self, s: &str) -> Option<SymbolId> {
        self.table.read().str_to_id.get(s).copied()
    }

    /// Look up the string for an ID.
    pub fn resolve(&self, id: SymbolId) -> Option<Arc<str>> {
        self.table.read().id_to_str.get(id.0 as usize).cloned()
    }

    /// Hold the read lock for a batch of lookups (e.g. while rendering a rule).
    ///
    /// Do not call [`Self::intern`] on the same thread while the returned
    /// guard is alive.
    pub fn symbols(&self) -> Symbols<'_> {
        Symbols {
            table: self.table.read(),
        }
    }

    /// Number of interned symbols
    pub fn len(&self) -> usize {
        self.table.read().id_to_str.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read guard over a [`StringInterner`] for cheap repeated resolution.
pub struct Symbols<'a> {
    table: RwLockReadGuard<'a, SymbolTable>,
}

impl Symbols<'_> {
    /// Resolve an id, falling back to [`UNKNOWN_SYMBOL`].
    pub fn resolve(&self, id: SymbolId) -> &str {
        self.table
            .id_to_str
            .get(id.0 as usize)
            .map_or(UNKNOWN_SYMBOL, |s| s.as_ref())
    }
}

// ============================================================================
// Integer-array interning
// ============================================================================

/// Bijection between integer arrays and dense ids.
///
/// Ids are assigned in insertion order starting at 0, so they can be used
/// directly as indices into side tables.
#[derive(Debug, Default, Clone)]
pub struct IntArrayInterner {
    index: FxHashMap<Arc<[u32]>, u32>,
    arrays: Vec<Arc<[u32]>>,
}

impl IntArrayInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `array`, inserting it if it was never seen.
    pub fn intern(&mut self, array: &[u32]) -> u32 {
        if let Some(&id) = self.index.get(array) {
            return id;
        }

        let id = self.arrays.len() as u32;
        let shared: Arc<[u32]> = array.into();
        self.index.insert(shared.clone(), id);
        self.arrays.push(shared);
        id
    }

    /// Id of `array` if it was interned before.
    pub fn id_of(&self, array: &[u32]) -> Option<u32> {
        self.index.get(array).copied()
    }

    /// The array registered under `id`.
    pub fn get(&self, id: u32) -> Option<&[u32]> {
        self.arrays.get(id as usize).map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrays.is_empty()
    }

    /// Iterate over `(id, array)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u32])> {
        self.arrays
            .iter()
            .enumerate()
            .map(|(id, a)| (id as u32, a.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_interning() {
        let interner = StringInterner::new();

        let id1 = interner.intern("NP");
        let id2 = interner.intern("VP");
        let id3 = interner.intern("NP");

        assert_eq!(id1, id3);
        assert_ne!(id1, id2);
        assert_eq!(interner.len(), 2);

        assert_eq!(interner.resolve(id1).as_deref(), Some("NP"));
        assert_eq!(interner.resolve(id2).as_deref(), Some("VP"));
        assert_eq!(interner.get("VP"), Some(id2));
        assert_eq!(interner.get("PP"), None);
    }

    #[test]
    fn test_symbols_guard_unknown_id() {
        let interner = StringInterner::new();
        let id = interner.intern("dog");

        let symbols = interner.symbols();
        assert_eq!(symbols.resolve(id), "dog");
        assert_eq!(symbols.resolve(SymbolId::from_u32(42)), UNKNOWN_SYMBOL);
    }

    #[test]
    fn test_concurrent_interning_agrees() {
        let interner = StringInterner::new();
        let words: Vec<String> = (0..200).map(|i| format!("w{}", i % 50)).collect();

        let ids: Vec<Vec<SymbolId>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        words
                            .iter()
                            .map(|w| interner.intern(w))
                            .collect::<Vec<SymbolId>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(interner.len(), 50);
        for other in &ids[1..] {
            assert_eq!(&ids[0], other);
        }
    }

    #[test]
    fn test_int_array_insert_or_lookup() {
        let mut arrays = IntArrayInterner::new();

        let a = arrays.intern(&[2, 0, 0, 7, 8, 9]);
        let b = arrays.intern(&[1, 0]);
        let c = arrays.intern(&[2, 0, 0, 7, 8, 9]);

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(a, c);
        assert_eq!(arrays.len(), 2);
        assert_eq!(arrays.get(b), Some(&[1u32, 0][..]));
        assert_eq!(arrays.id_of(&[1, 0]), Some(1));
        assert_eq!(arrays.id_of(&[3]), None);
        assert_eq!(arrays.get(5), None);
    }

    #[test]
    fn test_int_array_empty_array_is_a_key() {
        let mut arrays = IntArrayInterner::new();
        let empty = arrays.intern(&[]);
        assert_eq!(arrays.intern(&[]), empty);
        assert_eq!(arrays.iter().count(), 1);
    }
}
