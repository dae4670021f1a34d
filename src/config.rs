//! Extraction settings.

use crate::parser::AlignmentFormat;
use crate::rule::{Rule, MAX_UNALIGNED_RHS};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for option {key}")]
    InvalidValue { key: String, value: String },
}

/// Configuration for rule extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Maximum number of frontier nodes spliced into one composed rule
    /// (0 = minimal rules only).
    pub max_compositions: usize,
    /// Unaligned RHS words above which variants are not enumerated.
    pub max_unaligned_rhs: usize,
    /// Annotate RHS variables with their category in Xrs output.
    pub syncat_rhs: bool,
    /// Largest LHS (in nodes) a kept rule may have (0 = unlimited).
    pub max_lhs_size: usize,
    /// Longest RHS a kept rule may have (0 = unlimited).
    pub max_rhs_size: usize,
    /// How alignment lines are written.
    pub alignment: AlignmentFormat,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            max_compositions: 0,
            max_unaligned_rhs: MAX_UNALIGNED_RHS,
            syncat_rhs: false,
            max_lhs_size: 0,
            max_rhs_size: 0,
            alignment: AlignmentFormat::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_compositions(mut self, n: usize) -> Self {
        self.max_compositions = n;
        self
    }

    pub fn max_unaligned_rhs(mut self, n: usize) -> Self {
        self.max_unaligned_rhs = n;
        self
    }

    pub fn syncat_rhs(mut self, on: bool) -> Self {
        self.syncat_rhs = on;
        self
    }

    pub fn max_lhs_size(mut self, n: usize) -> Self {
        self.max_lhs_size = n;
        self
    }

    pub fn max_rhs_size(mut self, n: usize) -> Self {
        self.max_rhs_size = n;
        self
    }

    pub fn alignment(mut self, format: AlignmentFormat) -> Self {
        self.alignment = format;
        self
    }

    /// Build a configuration from `key=value` style options:
    /// `maxCompositions`, `MaxUnalignedRHS`, `SynCatRHS`, `maxLHS`, `maxRHS`,
    /// `oneIndexedAlignment`, `reversedAlignment`.
    pub fn from_options<'a, I>(options: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = ExtractorConfig::default();
        for (key, value) in options {
            let value = value.trim();
            match key {
                "maxCompositions" => config.max_compositions = parse_count(key, value)?,
                "MaxUnalignedRHS" => config.max_unaligned_rhs = parse_count(key, value)?,
                "SynCatRHS" => config.syncat_rhs = parse_flag(key, value)?,
                "maxLHS" => config.max_lhs_size = parse_count(key, value)?,
                "maxRHS" => config.max_rhs_size = parse_count(key, value)?,
                "oneIndexedAlignment" => config.alignment.one_indexed = parse_flag(key, value)?,
                "reversedAlignment" => config.alignment.reversed = parse_flag(key, value)?,
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            }
        }
        Ok(config)
    }

    /// Whether `rule` passes the LHS and RHS size filters.
    pub fn accepts(&self, rule: &Rule) -> bool {
        (self.max_lhs_size == 0 || rule.lhs_len() <= self.max_lhs_size)
            && (self.max_rhs_size == 0 || rule.rhs_len() <= self.max_rhs_size)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_count(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
