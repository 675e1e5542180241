//! The deterministic fold: `apply(otu, event) -> otu'` (spec §4.2, C2).
//!
//! `apply` is total given its one precondition — the first event folded for
//! an OTU id must be `CreateOTU` — and it does not itself enforce §3.2; the
//! write path calls [`crate::model::Otu::validate`] on the result before
//! committing (spec §4.5).

use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::event::payloads::{Event, EventKind, ExcludedAccessionAction};
use crate::model::{Isolate, Otu};

/// Folds one event onto the current OTU state (`None` before `CreateOTU`).
pub fn apply(current: Option<Otu>, event: &Event) -> Result<Otu> {
    match (&current, &event.kind) {
        (None, EventKind::CreateOtu(data)) => {
            let mut otu = Otu::new(
                data.id,
                data.acronym.clone(),
                data.taxid,
                data.name.clone(),
                data.molecule,
                data.plan.clone(),
            );
            if let Some(acronym) = data.lineage.acronym() {
                otu.acronym = acronym.to_string();
            }
            Ok(otu)
        }
        (None, _) => Err(RefBuilderError::Hydration {
            otu_id: event
                .query
                .otu_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            what: "initial event",
            reference: event.kind.tag().to_string(),
        }),
        (Some(_), EventKind::CreateOtu(_)) => Err(RefBuilderError::Hydration {
            otu_id: event
                .query
                .otu_id()
                .map(|id| id.to_string())
                .unwrap_or_default(),
            what: "duplicate CreateOTU for",
            reference: "otu".to_string(),
        }),
        (Some(otu), _) => apply_mutation(otu.clone(), event),
    }
}

fn apply_mutation(mut otu: Otu, event: &Event) -> Result<Otu> {
    let kind = &event.kind;
    match kind {
        EventKind::CreateOtu(_) => unreachable!("handled by apply"),

        EventKind::CreatePlan(data) => {
            otu.plan = data.plan.clone();
        }

        EventKind::DeleteOtu(data) => {
            otu.deleted = true;
            otu.deletion_rationale = Some(data.rationale.clone());
            otu.replacement_otu_id = data.replacement_otu_id;
        }

        EventKind::UpdateExcludedAccessions(data) => match data.action {
            ExcludedAccessionAction::Allow => {
                for accession in &data.accessions {
                    otu.excluded_accessions.remove(accession);
                }
            }
            ExcludedAccessionAction::Exclude => {
                for accession in &data.accessions {
                    otu.excluded_accessions.insert(accession.clone());
                }
            }
        },

        EventKind::CreateIsolate(data) => {
            let isolate = Isolate::new(data.isolate_id, data.name.clone(), data.sequences.clone())?;
            let is_first = otu.isolates.is_empty();
            otu.isolates.push(isolate);
            if is_first {
                otu.representative_isolate = Some(data.isolate_id);
            }
        }

        EventKind::DeleteIsolate(data) => {
            let isolate_id = data.isolate_id;
            if otu.representative_isolate == Some(isolate_id) {
                return Err(RefBuilderError::PlanValidation {
                    otu_id: otu.id.to_string(),
                    taxid: otu.taxid,
                    reason: "the representative isolate cannot be deleted".to_string(),
                });
            }
            otu.isolates.retain(|i| i.id != isolate_id);
        }

        EventKind::PromoteIsolate(data) => {
            for (old_key, replacement) in &data.replacements {
                let isolate_idx = otu
                    .isolates
                    .iter()
                    .position(|i| i.accessions().contains(old_key));
                if let Some(idx) = isolate_idx {
                    otu.isolates[idx]
                        .sequences
                        .retain(|s| &s.accession.key != old_key);
                    otu.isolates[idx].sequences.push(replacement.clone());
                }
                otu.promoted_accessions.insert(old_key.clone());
            }
        }

        EventKind::UpdateSequence(data) => {
            let key = data.sequence.accession.key.clone();
            for isolate in &mut otu.isolates {
                if let Some(pos) = isolate
                    .sequences
                    .iter()
                    .position(|s| s.accession.key == key)
                {
                    isolate.sequences[pos] = data.sequence.clone();
                    break;
                }
            }
        }
    }
    Ok(otu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::base::EventQuery;
    use crate::model::molecule::{MoleculeType, Strandedness, Topology};
    use crate::model::plan::Plan;
    use crate::model::segment::{Segment, SegmentRule};
    use crate::model::{Lineage, RepoSettings};
    use crate::event::payloads::CreateOtuData;

    fn make_plan() -> (Plan, Uuid) {
        let segment_id = Uuid::new_v4();
        let segment = Segment {
            id: segment_id,
            length: 15,
            length_tolerance: 0.03,
            name: None,
            rule: SegmentRule::Required,
        };
        (Plan::new(Uuid::new_v4(), vec![segment]).unwrap(), segment_id)
    }

    #[test]
    fn test_create_otu_requires_no_prior_state() {
        let (plan, _) = make_plan();
        let otu_id = Uuid::new_v4();
        let event = Event {
            id: 2,
            timestamp: "2026-01-01T00:00:00".into(),
            query: EventQuery::Otu { otu_id },
            kind: EventKind::CreateOtu(CreateOtuData {
                id: otu_id,
                acronym: "TMV".into(),
                molecule: Molecule {
                    strandedness: Strandedness::Single,
                    moltype: MoleculeType::Rna,
                    topology: Topology::Linear,
                },
                lineage: Lineage { taxa: vec![] },
                name: "Tobacco mosaic virus".into(),
                taxid: 12242,
                plan,
            }),
        };
        let otu = apply(None, &event).unwrap();
        assert_eq!(otu.taxid, 12242);
        assert!(otu.isolates.is_empty());
    }

    #[test]
    fn test_fold_rejects_non_create_first_event() {
        let event = Event {
            id: 2,
            timestamp: "2026-01-01T00:00:00".into(),
            query: EventQuery::Otu { otu_id: Uuid::new_v4() },
            kind: EventKind::CreatePlan(crate::event::payloads::CreatePlanData {
                plan: make_plan().0,
            }),
        };
        assert!(apply(None, &event).is_err());
    }

    #[allow(dead_code)]
    fn unused_settings() -> RepoSettings {
        RepoSettings {
            default_segment_length_tolerance: 0.0,
        }
    }
}
