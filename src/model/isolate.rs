//! An isolate: one collected instance of the virus (spec §3.1).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::model::isolate_name::IsolateName;
use crate::model::sequence::Sequence;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Isolate {
    pub id: Uuid,
    pub name: Option<IsolateName>,
    pub sequences: Vec<Sequence>,
}

impl Isolate {
    /// Builds an isolate, enforcing RefSeq/GenBank homogeneity
    /// (spec §3.2.6, §8 property 7).
    pub fn new(id: Uuid, name: Option<IsolateName>, sequences: Vec<Sequence>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(RefBuilderError::InvalidInput(
                "an isolate must have at least one sequence".into(),
            ));
        }
        let refseq_count = sequences.iter().filter(|s| s.accession.is_refseq()).count();
        if refseq_count != 0 && refseq_count != sequences.len() {
            return Err(RefBuilderError::InvalidInput(
                "an isolate's sequences must be either all-RefSeq or all-GenBank".into(),
            ));
        }
        Ok(Isolate { id, name, sequences })
    }

    pub fn accessions(&self) -> HashSet<String> {
        self.sequences.iter().map(|s| s.accession.key.clone()).collect()
    }

    pub fn is_refseq(&self) -> bool {
        self.sequences.iter().all(|s| s.accession.is_refseq())
    }
}
