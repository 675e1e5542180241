//! Accession identifiers (spec §3.1).

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::core::error::{RefBuilderError, Result};

fn genbank_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{1,2}[0-9]{5,6}$").unwrap())
}

fn refseq_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^NC_[0-9A-Z]+$").unwrap())
}

/// A GenBank or RefSeq accession: a `(key, version)` pair.
///
/// Ordered lexicographically by `key`, then numerically by `version`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Accession {
    pub key: String,
    pub version: u32,
}

impl Accession {
    /// Validates `key` against the GenBank or RefSeq accession pattern.
    pub fn new(key: impl Into<String>, version: u32) -> Result<Self> {
        let key = key.into();
        if !genbank_pattern().is_match(&key) && !refseq_pattern().is_match(&key) {
            return Err(RefBuilderError::InvalidInput(format!(
                "accession key {key:?} matches neither the GenBank nor the RefSeq pattern"
            )));
        }
        Ok(Accession { key, version })
    }

    /// Parses a versioned accession string such as `"MN908947.3"`.
    pub fn from_string(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(RefBuilderError::InvalidInput(
                "accession string cannot be empty or whitespace".into(),
            ));
        }
        let mut parts = s.split('.');
        let key = parts.next().unwrap_or_default();
        let version_str = parts.next().ok_or_else(|| {
            RefBuilderError::InvalidInput(format!(
                "accession string {s:?} does not contain a KEY.VERSION separator"
            ))
        })?;
        if parts.next().is_some() {
            return Err(RefBuilderError::InvalidInput(format!(
                "accession string {s:?} contains more than one period"
            )));
        }
        let version: u32 = version_str.parse().map_err(|_| {
            RefBuilderError::InvalidInput(format!(
                "accession version {version_str:?} is not an integer"
            ))
        })?;
        Accession::new(key, version)
    }

    /// `true` if `key` matches the RefSeq (`NC_...`) pattern.
    pub fn is_refseq(&self) -> bool {
        refseq_pattern().is_match(&self.key)
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.key, self.version)
    }
}

impl Ord for Accession {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.version.cmp(&other.version))
    }
}

impl PartialOrd for Accession {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
