//! Taxonomic lineage, consumed once at `CreateOTU` time (SPEC_FULL §3, from
//! `ref_builder/models/lineage.py`). Not retained on the OTU aggregate: the
//! species-rank taxon seeds the OTU's flat `taxid`/`name`/`acronym` fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaxonOtherNames {
    pub acronym: Option<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Taxon {
    pub id: i64,
    pub name: String,
    pub parent: Option<i64>,
    pub rank: String,
    #[serde(default)]
    pub other_names: TaxonOtherNames,
}

/// An ordered list of taxa from the species root down toward the target
/// taxon; `taxa[0]` is the species-rank anchor.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub taxa: Vec<Taxon>,
}

impl Lineage {
    pub fn species(&self) -> Option<&Taxon> {
        self.taxa.first()
    }

    pub fn acronym(&self) -> Option<&str> {
        self.species()?.other_names.acronym.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.species().map(|t| t.name.as_str())
    }

    pub fn taxid(&self) -> Option<i64> {
        self.species().map(|t| t.id)
    }
}
