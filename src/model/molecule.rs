//! Molecular metadata for an OTU (spec §3.1).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strandedness {
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum MoleculeType {
    #[serde(rename = "DNA")]
    Dna,
    #[serde(rename = "RNA")]
    Rna,
    #[serde(rename = "cRNA")]
    CRna,
    #[serde(rename = "mRNA")]
    MRna,
    #[serde(rename = "tRNA")]
    TRna,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    Linear,
    Circular,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Molecule {
    pub strandedness: Strandedness,
    #[serde(rename = "type")]
    pub moltype: MoleculeType,
    pub topology: Topology,
}
