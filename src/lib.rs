//! GHKM rule extraction for syntax-based machine translation.
//!
//! Given a source sentence, a target-side parse tree and a word alignment,
//! this crate extracts synchronous tree-to-string rules (Galley et al. 2004,
//! 2006):
//! - Tree and alignment readers
//! - Source-span annotation and frontier-node detection
//! - Minimal and composed rule extraction with unaligned-word variants
//! - A compact, thread-safe corpus-wide rule index
//! - Xrs and Joshua grammar output
//! - Python bindings via PyO3 (`python` feature)
//!
//! ```rust
//! use ghkm_extract::{ExtractorConfig, RuleExtractor, SentenceInput};
//!
//! let extractor = RuleExtractor::new(ExtractorConfig::default());
//! let rules = extractor
//!     .extract_rules(&SentenceInput {
//!         line: 1,
//!         source: "le chien",
//!         tree: "(NP (DT the) (NN dog))",
//!         alignment: "0-0 1-1",
//!         raw_target: None,
//!     })
//!     .unwrap();
//! assert_eq!(rules.len(), 3);
//! ```

pub mod align_tree;
pub mod alignment;
pub mod config;
pub mod extractor;
pub mod graph;
pub mod index;
pub mod instance;
pub mod intern;
pub mod parser;
pub mod rule;
pub mod tree;
pub mod unaligned;

#[cfg(feature = "python")]
mod python;

// Re-exports for convenience
pub use align_tree::{AlignmentTree, SpanPass, TreeError};
pub use alignment::{AlignmentError, SymmetricAlignment, WordAlignment};
pub use config::{ConfigError, ExtractorConfig};
pub use extractor::{CorpusStats, RuleExtractor, SentenceInput};
pub use graph::{AlignmentGraph, ExtractError, ExtractionStats};
pub use index::{IndexSizes, RuleIds, RuleIndex, SharedRuleIndex};
pub use instance::RuleInstance;
pub use intern::{IntArrayInterner, StringInterner, SymbolId};
pub use parser::{parse_alignment, parse_tree, AlignmentFormat, ParseError};
pub use rule::{GrammarFormat, LhsSlot, RhsSymbol, Rule, MAX_UNALIGNED_RHS};
pub use tree::{Direction, HeadFinder, NodeId, ParseTree, PercolationTable};
pub use unaligned::UnalignedWordSet;
