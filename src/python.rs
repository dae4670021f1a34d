//! Python bindings via PyO3.

use crate::config::ExtractorConfig;
use crate::extractor::{RuleExtractor, SentenceInput};
use crate::rule::GrammarFormat;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

fn grammar_format(name: &str) -> PyResult<GrammarFormat> {
    match name.to_ascii_lowercase().as_str() {
        "xrs" => Ok(GrammarFormat::Xrs),
        "joshua" => Ok(GrammarFormat::Joshua),
        other => Err(PyValueError::new_err(format!("unknown grammar format: {}", other))),
    }
}

/// Python wrapper for RuleExtractor.
#[pyclass(name = "RuleExtractor")]
struct PyRuleExtractor {
    inner: RuleExtractor,
}

#[pymethods]
impl PyRuleExtractor {
    #[new]
    #[pyo3(signature = (max_compositions=0, max_unaligned_rhs=7, syncat_rhs=false, max_lhs=0, max_rhs=0))]
    fn new(
        max_compositions: usize,
        max_unaligned_rhs: usize,
        syncat_rhs: bool,
        max_lhs: usize,
        max_rhs: usize,
    ) -> Self {
        let config = ExtractorConfig::new()
            .max_compositions(max_compositions)
            .max_unaligned_rhs(max_unaligned_rhs)
            .syncat_rhs(syncat_rhs)
            .max_lhs_size(max_lhs)
            .max_rhs_size(max_rhs);
        PyRuleExtractor {
            inner: RuleExtractor::new(config),
        }
    }

    /// Extract one sentence; returns its rules in Xrs notation.
    #[pyo3(signature = (source, tree, alignment, line=0))]
    fn extract(&self, source: &str, tree: &str, alignment: &str, line: usize) -> PyResult<Vec<String>> {
        let input = SentenceInput {
            line,
            source,
            tree,
            alignment,
            raw_target: None,
        };
        let rules = self
            .inner
            .extract_rules(&input)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;

        let syncat = self.inner.config().syncat_rhs;
        Ok(rules
            .iter()
            .map(|r| r.to_xrs_string(self.inner.interner(), syncat))
            .collect())
    }

    /// Number of distinct rules extracted so far.
    fn rule_count(&self) -> usize {
        self.inner.index().len()
    }

    /// The whole grammar as text.
    #[pyo3(signature = (format="xrs"))]
    fn grammar(&self, format: &str) -> PyResult<String> {
        let mut out = Vec::new();
        self.inner
            .write_grammar(&mut out, grammar_format(format)?)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        String::from_utf8(out).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Get extraction statistics.
    fn stats(&self, py: Python) -> PyResult<PyObject> {
        let stats = self.inner.stats();
        let dict = PyDict::new(py);
        dict.set_item("sentences", stats.sentences)?;
        dict.set_item("skipped", stats.skipped)?;
        dict.set_item("filtered_rules", stats.filtered_rules)?;
        dict.set_item("frontier_nodes", stats.extraction.frontier_nodes)?;
        dict.set_item("instances", stats.extraction.instances)?;
        dict.set_item("rules", stats.extraction.rules)?;
        Ok(dict.into_py(py))
    }

    fn __len__(&self) -> usize {
        self.rule_count()
    }

    fn __repr__(&self) -> String {
        format!("RuleExtractor({})", self.inner.index().size_info())
    }
}

/// Python module definition.
#[pymodule]
fn ghkm_extract(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyRuleExtractor>()?;
    Ok(())
}
