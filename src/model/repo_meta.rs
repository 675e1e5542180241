//! Repository-level metadata, cached at open time from the `CreateRepo`
//! event (spec §3.1, §3.3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepoSettings {
    pub default_segment_length_tolerance: f64,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RepoMeta {
    pub id: Uuid,
    pub name: String,
    pub organism: String,
    pub created_at: String,
    pub settings: RepoSettings,
}
