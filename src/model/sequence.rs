//! Nucleotide sequences (spec §3.1).

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::model::accession::Accession;

fn sequence_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[ATGCURYKMSWBDHVN]+$").unwrap())
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub accession: Accession,
    pub definition: String,
    pub segment: Uuid,
    pub sequence: String,
}

impl Sequence {
    /// Builds a sequence, upper-casing and validating the nucleotide
    /// alphabet (spec §3.1, §4.3 "normalised to upper-case on ingress").
    pub fn new(
        id: Uuid,
        accession: Accession,
        definition: impl Into<String>,
        segment: Uuid,
        sequence: impl Into<String>,
    ) -> Result<Self> {
        let definition = definition.into();
        if definition.trim().is_empty() {
            return Err(RefBuilderError::InvalidInput(
                "sequence definition must not be empty".into(),
            ));
        }
        let sequence: String = sequence.into().to_uppercase();
        if !sequence_pattern().is_match(&sequence) {
            return Err(RefBuilderError::InvalidInput(format!(
                "sequence for accession {accession} contains characters outside [ATGCURYKMSWBDHVN]"
            )));
        }
        Ok(Sequence {
            id,
            accession,
            definition,
            segment,
            sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_cases_and_validates() {
        let acc = Accession::new("AB12345", 1).unwrap();
        let seq = Sequence::new(Uuid::new_v4(), acc, "def", Uuid::new_v4(), "atgc").unwrap();
        assert_eq!(seq.sequence, "ATGC");
    }

    #[test]
    fn test_rejects_bad_alphabet() {
        let acc = Accession::new("AB12345", 1).unwrap();
        assert!(Sequence::new(Uuid::new_v4(), acc, "def", Uuid::new_v4(), "ATGCX!").is_err());
    }
}
