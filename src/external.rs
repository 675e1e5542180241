//! The genome/taxonomy record interface the core consumes from an external
//! collaborator (spec §6.4). The core ships no HTTP client and no XML
//! parser; it only validates these shapes on ingress.

use serde::{Deserialize, Serialize};

use crate::core::error::{RefBuilderError, Result};
use crate::model::lineage::{Lineage, Taxon, TaxonOtherNames};
use crate::model::molecule::{Molecule, MoleculeType, Strandedness, Topology};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeRecordSource {
    pub taxid: i64,
    pub organism: String,
    pub mol_type: String,
    pub isolate: Option<String>,
    pub strain: Option<String>,
    pub clone: Option<String>,
    pub segment: Option<String>,
    pub host: Option<String>,
}

/// An external genome record (spec §6.4), consumed as admission-control
/// input only; never stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeRecord {
    pub accession: String,
    pub accession_version: u32,
    pub strandedness: Strandedness,
    pub moltype: MoleculeType,
    pub topology: Topology,
    pub definition: String,
    pub organism: String,
    pub sequence: String,
    pub source: GenomeRecordSource,
    pub comment: Option<String>,
}

impl GenomeRecord {
    /// Validates the record's admission-control requirements: the sequence
    /// alphabet, and that `source.taxid` agrees with the outer organism.
    pub fn validate(&self) -> Result<()> {
        let upper = self.sequence.to_uppercase();
        if !upper
            .bytes()
            .all(|b| b"ATGCURYKMSWBDHVN".contains(&b))
        {
            return Err(RefBuilderError::InvalidInput(format!(
                "genome record {} has a sequence outside [ATGCURYKMSWBDHVN]",
                self.accession
            )));
        }
        if self.source.organism != self.organism {
            return Err(RefBuilderError::InvalidInput(format!(
                "genome record {}: source.taxid organism {:?} disagrees with record organism {:?}",
                self.accession, self.source.organism, self.organism
            )));
        }
        Ok(())
    }

    pub fn molecule(&self) -> Molecule {
        Molecule {
            strandedness: self.strandedness,
            moltype: self.moltype,
            topology: self.topology,
        }
    }
}

/// An external taxonomy record (spec §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyRecord {
    pub id: i64,
    pub name: String,
    pub rank: String,
    pub lineage: Vec<Taxon>,
    pub other_names: TaxonOtherNames,
}

const ABOVE_SPECIES_RANKS: &[&str] = &["genus", "family", "order", "class", "phylum", "kingdom", "domain"];

impl TaxonomyRecord {
    /// Rejects above-species ranks (spec §6.4 "taxon rank too high") and
    /// converts to the `Lineage` admission-control input the OTU fold needs.
    pub fn into_lineage(self) -> Result<Lineage> {
        if ABOVE_SPECIES_RANKS.contains(&self.rank.as_str()) {
            return Err(RefBuilderError::InvalidInput(format!(
                "taxon {} has rank {:?}, which is above species",
                self.id, self.rank
            )));
        }
        let mut taxa = self.lineage;
        taxa.push(Taxon {
            id: self.id,
            name: self.name,
            parent: taxa.last().map(|t| t.id),
            rank: self.rank,
            other_names: self.other_names,
        });
        taxa.reverse();
        Ok(Lineage { taxa })
    }
}

/// Given a set of accession strings, returns the matching genome records.
/// Implemented by an external collaborator (e.g. an NCBI fetch client); the
/// core depends only on this trait boundary.
pub trait GenomeRecordSourceClient {
    fn fetch_genome_records(&self, accessions: &[String]) -> Result<Vec<GenomeRecord>>;
}

/// Given a taxonomy id, returns its taxonomy record with lineage.
pub trait TaxonomyRecordSourceClient {
    fn fetch_taxonomy_record(&self, taxid: i64) -> Result<TaxonomyRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_above_species_rank() {
        let record = TaxonomyRecord {
            id: 1,
            name: "Virus genus".into(),
            rank: "genus".into(),
            lineage: vec![],
            other_names: TaxonOtherNames::default(),
        };
        assert!(record.into_lineage().is_err());
    }

    #[test]
    fn test_species_rank_becomes_lineage_head() {
        let record = TaxonomyRecord {
            id: 12242,
            name: "Tobacco mosaic virus".into(),
            rank: "species".into(),
            lineage: vec![],
            other_names: TaxonOtherNames {
                acronym: Some("TMV".into()),
                synonyms: vec![],
            },
        };
        let lineage = record.into_lineage().unwrap();
        assert_eq!(lineage.taxid(), Some(12242));
        assert_eq!(lineage.acronym(), Some("TMV"));
    }
}
