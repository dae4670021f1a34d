//! Sentence-level driver.
//!
//! [`RuleExtractor`] owns everything that lives for a whole corpus run: the
//! configuration, the string interner, the shared rule index and the head
//! finder. Each sentence is parsed, extracted and filtered on its own; its
//! rules reach the index only once the whole sentence succeeded.

use crate::alignment::SymmetricAlignment;
use crate::config::ExtractorConfig;
use crate::graph::{AlignmentGraph, ExtractError, ExtractionStats};
use crate::index::{RuleIndex, SharedRuleIndex};
use crate::intern::StringInterner;
use crate::parser::{parse_alignment, parse_tree};
use crate::rule::{GrammarFormat, Rule};
use crate::tree::{HeadFinder, PercolationTable};
use log::{info, warn};
use parking_lot::Mutex;
use std::io::{self, Write};

/// Sentences between two progress lines.
pub const PROGRESS_INTERVAL: usize = 10_000;

/// One line of a parallel corpus.
#[derive(Clone, Copy, Debug)]
pub struct SentenceInput<'a> {
    /// Line number, for error reports.
    pub line: usize,
    /// Tokenized source sentence.
    pub source: &'a str,
    /// Bracketed target parse tree.
    pub tree: &'a str,
    /// Alignment line.
    pub alignment: &'a str,
    /// Tokenized target sentence, checked against the tree yield.
    pub raw_target: Option<&'a str>,
}

/// Counters over all sentences seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub sentences: usize,
    pub skipped: usize,
    /// Rules rejected by the LHS/RHS size filters.
    pub filtered_rules: usize,
    pub extraction: ExtractionStats,
}

/// Extracts rules sentence by sentence into one shared index.
pub struct RuleExtractor<H: HeadFinder = PercolationTable> {
    config: ExtractorConfig,
    interner: StringInterner,
    index: SharedRuleIndex,
    heads: H,
    stats: Mutex<CorpusStats>,
}

impl RuleExtractor<PercolationTable> {
    /// An extractor using the built-in English head rules.
    pub fn new(config: ExtractorConfig) -> Self {
        RuleExtractor::with_head_finder(config, PercolationTable::english())
    }
}

impl<H: HeadFinder> RuleExtractor<H> {
    pub fn with_head_finder(config: ExtractorConfig, heads: H) -> Self {
        RuleExtractor {
            config,
            interner: StringInterner::new(),
            index: SharedRuleIndex::new(),
            heads,
            stats: Mutex::new(CorpusStats::default()),
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn index(&self) -> &SharedRuleIndex {
        &self.index
    }

    pub fn stats(&self) -> CorpusStats {
        self.stats.lock().clone()
    }

    /// Give up the extractor, keeping the interner and the rules.
    pub fn into_parts(self) -> (StringInterner, RuleIndex) {
        (self.interner, self.index.into_inner())
    }

    /// Build the alignment graph of one sentence.
    pub fn build_graph(
        &self,
        input: &SentenceInput<'_>,
    ) -> Result<AlignmentGraph<SymmetricAlignment>, ExtractError> {
        let tree = parse_tree(input.tree)?;
        let words: Vec<String> = input.source.split_whitespace().map(String::from).collect();
        let alignment = parse_alignment(
            input.alignment,
            words.len(),
            tree.leaf_count(),
            self.config.alignment,
        )?;
        AlignmentGraph::new(alignment, words, &tree, input.raw_target, &self.heads)
    }

    /// Extract and filter the rules of one sentence without registering them.
    pub fn extract_sentence(&self, input: &SentenceInput<'_>) -> Result<Vec<Rule>, ExtractError> {
        self.run(input).map(|(rules, _, _)| rules)
    }

    fn run(
        &self,
        input: &SentenceInput<'_>,
    ) -> Result<(Vec<Rule>, usize, ExtractionStats), ExtractError> {
        let wrap = |e: ExtractError| ExtractError::Sentence {
            line: input.line,
            source: Box::new(e),
        };

        let mut graph = self.build_graph(input).map_err(wrap)?;
        let rules = graph
            .extract_rules(&self.interner, &self.config)
            .map_err(wrap)?;

        let total = rules.len();
        let kept: Vec<Rule> = rules
            .into_iter()
            .filter(|r| self.config.accepts(r))
            .collect();
        let filtered = total - kept.len();
        Ok((kept, filtered, graph.stats().clone()))
    }

    /// Extract one sentence and add its rules to the index.
    pub fn extract_rules(&self, input: &SentenceInput<'_>) -> Result<Vec<Rule>, ExtractError> {
        let (rules, filtered, extraction) = self.run(input)?;
        self.index.register_all(&rules);

        let mut stats = self.stats.lock();
        stats.sentences += 1;
        stats.filtered_rules += filtered;
        stats.extraction.absorb(&extraction);
        let sentences = stats.sentences;
        drop(stats);

        if sentences % PROGRESS_INTERVAL == 0 {
            info!("{} sentences: {}", sentences, self.index.size_info());
        }
        Ok(rules)
    }

    /// Run every sentence, logging and skipping the ones that fail.
    pub fn extract_corpus<'a, I>(&self, inputs: I) -> CorpusStats
    where
        I: IntoIterator<Item = SentenceInput<'a>>,
    {
        for input in inputs {
            if let Err(e) = self.extract_rules(&input) {
                warn!("skipping: {}", e);
                self.stats.lock().skipped += 1;
            }
        }
        let stats = self.stats();
        info!(
            "extracted from {} sentences ({} skipped): {}",
            stats.sentences,
            stats.skipped,
            self.index.size_info()
        );
        stats
    }

    /// Write every rule in the index.
    pub fn write_grammar<W: Write>(&self, out: &mut W, format: GrammarFormat) -> io::Result<usize> {
        self.index
            .with(|index| index.write_grammar(out, &self.interner, format, self.config.syncat_rhs))
    }
}
