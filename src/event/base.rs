//! The event envelope shape and query targets (spec §4.2, §6.2).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifies which aggregate an event mutates.
///
/// Serde tries untagged variants in declaration order and, without
/// `deny_unknown_fields`, a later field-subset variant can silently match
/// first and drop extra fields — so the most specific (most-fields) variants
/// are listed first, and every variant denies unknown fields to force a
/// query with an `isolate_id` or `accession` field to match its own variant
/// rather than falling through to `Otu`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventQuery {
    #[serde(deny_unknown_fields)]
    OtuIsolate {
        otu_id: Uuid,
        isolate_id: Uuid,
    },
    #[serde(deny_unknown_fields)]
    OtuAccession {
        otu_id: Uuid,
        accession: String,
    },
    #[serde(deny_unknown_fields)]
    Otu {
        otu_id: Uuid,
    },
    #[serde(deny_unknown_fields)]
    Repository {
        repository_id: Uuid,
    },
}

impl EventQuery {
    pub fn otu_id(&self) -> Option<Uuid> {
        match self {
            EventQuery::Repository { .. } => None,
            EventQuery::Otu { otu_id }
            | EventQuery::OtuIsolate { otu_id, .. }
            | EventQuery::OtuAccession { otu_id, .. } => Some(*otu_id),
        }
    }
}

/// The on-disk shape of one event file (spec §6.2): fields in fixed,
/// alphabetically-sorted order so that canonical JSON serialisation is a
/// no-op bit-identical round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub data: Value,
    pub id: u64,
    pub query: EventQuery,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// The subset of an event's envelope the index stores per-row
/// (`events(event_id, otu_id, timestamp)`, spec §4.4).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EventMetadata {
    pub id: u64,
    pub otu_id: Option<Uuid>,
    pub timestamp: String,
}
