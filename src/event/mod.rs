//! Typed event variants, their on-disk shape, and the deterministic fold
//! that turns an event stream into an OTU (C2, spec §4.2).

pub mod base;
pub mod fold;
pub mod payloads;

pub use base::{EventMetadata, EventQuery, EventRecord};
pub use fold::apply;
pub use payloads::{
    CreateIsolateData, CreateOtuData, CreatePlanData, CreateRepoData, DeleteIsolateData,
    DeleteOtuData, Event, EventKind, ExcludedAccessionAction, PromoteIsolateData,
    UpdateExcludedAccessionsData, UpdateSequenceData,
};
