//! The OTU aggregate (spec §3.1, §3.2, §4.3).
//!
//! `Otu` is the fold's working value for one taxon: produced by `apply`
//! (`event::otu::apply`) one event at a time. It is never required to be
//! internally valid mid-fold (the moment right after `CreateOTU` and before
//! the first `CreateIsolate` has zero isolates); [`Otu::validate`] is the
//! explicit checkpoint the write path calls after every event except
//! `CreateOTU` (spec §4.5), and that a reader may call on any fully folded
//! value before trusting it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::model::accession::Accession;
use crate::model::isolate::Isolate;
use crate::model::molecule::Molecule;
use crate::model::plan::Plan;

/// A minimal, denormalised OTU projection (id/acronym/name/taxid), used for
/// repository-wide listings without a full fold (`ref_builder/models/otu.py::OTUMinimal`).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OtuMinimal {
    pub acronym: String,
    pub id: Uuid,
    pub name: String,
    pub taxid: i64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Otu {
    pub id: Uuid,
    pub acronym: String,
    pub taxid: i64,
    pub name: String,
    pub molecule: Molecule,
    pub plan: Plan,
    pub isolates: Vec<Isolate>,
    pub excluded_accessions: HashSet<String>,
    pub promoted_accessions: HashSet<String>,
    /// The id of the first isolate ever created for this OTU. Fixed for the
    /// OTU's lifetime; deleting it is always rejected (spec §9 resolution).
    pub representative_isolate: Option<Uuid>,
    /// Set by `DeleteOTU` (spec §3.2 lifecycle). The OTU is never removed
    /// from the fold; the façade surfaces a distinguishable outcome instead.
    pub deleted: bool,
    pub deletion_rationale: Option<String>,
    pub replacement_otu_id: Option<Uuid>,
}

impl Otu {
    pub fn new(
        id: Uuid,
        acronym: String,
        taxid: i64,
        name: String,
        molecule: Molecule,
        plan: Plan,
    ) -> Self {
        Otu {
            id,
            acronym,
            taxid,
            name,
            molecule,
            plan,
            isolates: Vec::new(),
            excluded_accessions: HashSet::new(),
            promoted_accessions: HashSet::new(),
            representative_isolate: None,
            deleted: false,
            deletion_rationale: None,
            replacement_otu_id: None,
        }
    }

    pub fn minimal(&self) -> OtuMinimal {
        OtuMinimal {
            acronym: self.acronym.clone(),
            id: self.id,
            name: self.name.clone(),
            taxid: self.taxid,
        }
    }

    fn isolates_by_id(&self) -> HashMap<Uuid, &Isolate> {
        self.isolates.iter().map(|i| (i.id, i)).collect()
    }

    fn isolates_by_accession(&self) -> HashMap<String, &Isolate> {
        self.isolates
            .iter()
            .flat_map(|i| i.accessions().into_iter().map(move |a| (a, i)))
            .collect()
    }

    pub fn get_isolate(&self, isolate_id: Uuid) -> Option<&Isolate> {
        self.isolates_by_id().get(&isolate_id).copied()
    }

    pub fn get_isolate_by_accession(&self, accession: &str) -> Option<&Isolate> {
        self.isolates_by_accession().get(accession).copied()
    }

    pub fn get_sequence(&self, accession: &str) -> Option<&crate::model::sequence::Sequence> {
        self.isolates
            .iter()
            .flat_map(|i| i.sequences.iter())
            .find(|s| s.accession.key == accession)
    }

    pub fn accessions(&self) -> HashSet<String> {
        self.isolates.iter().flat_map(|i| i.accessions()).collect()
    }

    pub fn versioned_accessions(&self) -> HashSet<Accession> {
        self.isolates
            .iter()
            .flat_map(|i| i.sequences.iter().map(|s| s.accession.clone()))
            .collect()
    }

    pub fn isolate_ids(&self) -> HashSet<Uuid> {
        self.isolates.iter().map(|i| i.id).collect()
    }

    pub fn sequences(&self) -> Vec<&crate::model::sequence::Sequence> {
        self.isolates.iter().flat_map(|i| i.sequences.iter()).collect()
    }

    /// `accessions ∪ excluded_accessions ∪ promoted_accessions` (spec §3.1).
    pub fn blocked_accessions(&self) -> HashSet<String> {
        let mut blocked = self.accessions();
        blocked.extend(self.excluded_accessions.iter().cloned());
        blocked.extend(self.promoted_accessions.iter().cloned());
        blocked
    }

    /// Checks the §3.2 invariants that are local to one OTU (invariant 8,
    /// cross-OTU uniqueness, is enforced by the repository façade, which
    /// has visibility across OTUs).
    ///
    /// `require_isolates` is `false` only for the state immediately produced
    /// by `CreateOTU`, before any isolate has been added (spec §4.5).
    pub fn validate(&self, require_isolates: bool) -> Result<()> {
        if require_isolates && self.isolates.is_empty() {
            return self.fail("isolates must be non-empty");
        }

        for isolate in &self.isolates {
            for sequence in &isolate.sequences {
                let segment = self.plan.get_segment_by_id(sequence.segment).ok_or_else(|| {
                    RefBuilderError::PlanValidation {
                        otu_id: self.id.to_string(),
                        taxid: self.taxid,
                        reason: format!(
                            "sequence {} references segment {} not present in the plan",
                            sequence.accession, sequence.segment
                        ),
                    }
                })?;
                let len = sequence.sequence.len() as u32;
                if len < segment.min_length() || len > segment.max_length() {
                    return self.fail(&format!(
                        "sequence {} has length {} outside [{}, {}] for segment {}",
                        sequence.accession,
                        len,
                        segment.min_length(),
                        segment.max_length(),
                        segment.id
                    ));
                }
            }
        }

        let otu_accessions = self.accessions();
        if !self
            .promoted_accessions
            .is_disjoint(&otu_accessions)
        {
            return self.fail("promoted accessions found in the OTU");
        }
        if !self
            .promoted_accessions
            .is_disjoint(&self.excluded_accessions)
        {
            return self.fail("promoted accessions cannot be excluded");
        }
        if !self.excluded_accessions.is_disjoint(&otu_accessions) {
            return self.fail("excluded accessions found in the OTU");
        }

        let mut seen_names: HashSet<String> = HashSet::new();
        let mut unnamed_count = 0;
        for isolate in &self.isolates {
            match &isolate.name {
                None => unnamed_count += 1,
                Some(n) => {
                    let key = format!("{:?}:{}", n.kind, n.value);
                    if !seen_names.insert(key) {
                        return self.fail("isolate names must be unique");
                    }
                }
            }
        }
        if unnamed_count > 1 {
            return self.fail("at most one isolate may be unnamed");
        }

        for isolate in &self.isolates {
            let refseq_count = isolate
                .sequences
                .iter()
                .filter(|s| s.accession.is_refseq())
                .count();
            if refseq_count != 0 && refseq_count != isolate.sequences.len() {
                return self.fail("an isolate's sequences must be either all-RefSeq or all-GenBank");
            }
        }

        if require_isolates {
            if let Some(rep) = self.representative_isolate {
                if self.get_isolate(rep).is_none() {
                    return self.fail("representative isolate is missing");
                }
            } else {
                return self.fail("OTU has no designated representative isolate");
            }
        }

        Ok(())
    }

    fn fail<T>(&self, reason: &str) -> Result<T> {
        Err(RefBuilderError::PlanValidation {
            otu_id: self.id.to_string(),
            taxid: self.taxid,
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::{MoleculeType, Strandedness, Topology};
    use crate::model::plan::Plan;
    use crate::model::segment::{Segment, SegmentRule};

    fn molecule() -> Molecule {
        Molecule {
            strandedness: Strandedness::Single,
            moltype: MoleculeType::Rna,
            topology: Topology::Linear,
        }
    }

    fn plan(segment_id: Uuid) -> Plan {
        let segment = Segment {
            id: segment_id,
            length: 15,
            length_tolerance: 0.03,
            name: None,
            rule: SegmentRule::Required,
        };
        Plan::new(Uuid::new_v4(), vec![segment]).unwrap()
    }

    #[test]
    fn test_fresh_otu_allows_empty_isolates() {
        let segment_id = Uuid::new_v4();
        let otu = Otu::new(
            Uuid::new_v4(),
            "TMV".into(),
            12242,
            "Tobacco mosaic virus".into(),
            molecule(),
            plan(segment_id),
        );
        assert!(otu.validate(false).is_ok());
        assert!(otu.validate(true).is_err());
    }

    #[test]
    fn test_blocked_accessions_union() {
        let segment_id = Uuid::new_v4();
        let mut otu = Otu::new(
            Uuid::new_v4(),
            "TMV".into(),
            12242,
            "Tobacco mosaic virus".into(),
            molecule(),
            plan(segment_id),
        );
        otu.excluded_accessions.insert("XX11111".into());
        otu.promoted_accessions.insert("YY22222".into());
        let blocked = otu.blocked_accessions();
        assert!(blocked.contains("XX11111"));
        assert!(blocked.contains("YY22222"));
    }
}
