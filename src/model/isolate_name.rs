//! Isolate naming convention (spec §3.1).

use serde::{Deserialize, Serialize};

/// Declaration order doubles as extraction priority (spec §3.1).
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolateNameKind {
    Isolate,
    Strain,
    Clone,
    Variant,
    Genotype,
    Serotype,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IsolateName {
    #[serde(rename = "type")]
    pub kind: IsolateNameKind,
    pub value: String,
}
