//! Typed event variants (spec §4.2 table) and their on-disk conversion.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::event::base::{EventQuery, EventRecord};
use crate::model::{Lineage, Molecule, Plan, RepoSettings, Sequence};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExcludedAccessionAction {
    Allow,
    Exclude,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRepoData {
    pub id: Uuid,
    pub name: String,
    pub organism: String,
    pub settings: RepoSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOtuData {
    pub id: Uuid,
    pub acronym: String,
    pub molecule: Molecule,
    /// Admission-control input only (SPEC_FULL §3); not retained on the OTU.
    pub lineage: Lineage,
    pub name: String,
    pub taxid: i64,
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanData {
    pub plan: Plan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOtuData {
    pub rationale: String,
    pub replacement_otu_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateExcludedAccessionsData {
    pub accessions: Vec<String>,
    pub action: ExcludedAccessionAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIsolateData {
    pub isolate_id: Uuid,
    pub name: Option<crate::model::isolate_name::IsolateName>,
    pub taxid: i64,
    pub sequences: Vec<Sequence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteIsolateData {
    pub isolate_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteIsolateData {
    /// Maps each replaced GenBank accession key to its RefSeq replacement.
    pub replacements: Vec<(String, Sequence)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSequenceData {
    pub sequence: Sequence,
}

/// A domain-level event: the envelope fields plus a typed payload, as
/// opposed to [`EventRecord`] (the raw on-disk shape).
#[derive(Debug, Clone)]
pub struct Event {
    pub id: u64,
    pub timestamp: String,
    pub query: EventQuery,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    CreateRepo(CreateRepoData),
    CreateOtu(CreateOtuData),
    CreatePlan(CreatePlanData),
    DeleteOtu(DeleteOtuData),
    UpdateExcludedAccessions(UpdateExcludedAccessionsData),
    CreateIsolate(CreateIsolateData),
    DeleteIsolate(DeleteIsolateData),
    PromoteIsolate(PromoteIsolateData),
    UpdateSequence(UpdateSequenceData),
}

impl EventKind {
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::CreateRepo(_) => "CreateRepo",
            EventKind::CreateOtu(_) => "CreateOTU",
            EventKind::CreatePlan(_) => "CreatePlan",
            EventKind::DeleteOtu(_) => "DeleteOTU",
            EventKind::UpdateExcludedAccessions(_) => "UpdateExcludedAccessions",
            EventKind::CreateIsolate(_) => "CreateIsolate",
            EventKind::DeleteIsolate(_) => "DeleteIsolate",
            EventKind::PromoteIsolate(_) => "PromoteIsolate",
            EventKind::UpdateSequence(_) => "UpdateSequence",
        }
    }
}

impl Event {
    /// Converts to the canonical on-disk record (spec §6.2).
    pub fn to_record(&self) -> Result<EventRecord> {
        let data = match &self.kind {
            EventKind::CreateRepo(d) => serde_json::to_value(d),
            EventKind::CreateOtu(d) => serde_json::to_value(d),
            EventKind::CreatePlan(d) => serde_json::to_value(d),
            EventKind::DeleteOtu(d) => serde_json::to_value(d),
            EventKind::UpdateExcludedAccessions(d) => serde_json::to_value(d),
            EventKind::CreateIsolate(d) => serde_json::to_value(d),
            EventKind::DeleteIsolate(d) => serde_json::to_value(d),
            EventKind::PromoteIsolate(d) => serde_json::to_value(d),
            EventKind::UpdateSequence(d) => serde_json::to_value(d),
        }?;
        Ok(EventRecord {
            data,
            id: self.id,
            query: self.query.clone(),
            timestamp: self.timestamp.clone(),
            event_type: self.kind.tag().to_string(),
        })
    }

    /// Parses a raw record back into a typed event. An unrecognised `type`
    /// discriminator is a hard, fatal error (spec §4.2, §7 `unknown-event-type`).
    pub fn from_record(record: EventRecord) -> Result<Self> {
        let kind = match record.event_type.as_str() {
            "CreateRepo" => EventKind::CreateRepo(parse(record.data)?),
            "CreateOTU" => EventKind::CreateOtu(parse(record.data)?),
            "CreatePlan" => EventKind::CreatePlan(parse(record.data)?),
            "DeleteOTU" => EventKind::DeleteOtu(parse(record.data)?),
            "UpdateExcludedAccessions" => {
                EventKind::UpdateExcludedAccessions(parse(record.data)?)
            }
            "CreateIsolate" => EventKind::CreateIsolate(parse(record.data)?),
            "DeleteIsolate" => EventKind::DeleteIsolate(parse(record.data)?),
            "PromoteIsolate" => EventKind::PromoteIsolate(parse(record.data)?),
            "UpdateSequence" => EventKind::UpdateSequence(parse(record.data)?),
            other => return Err(RefBuilderError::UnknownEventType(other.to_string())),
        };
        Ok(Event {
            id: record.id,
            timestamp: record.timestamp,
            query: record.query,
            kind,
        })
    }
}

fn parse<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}
