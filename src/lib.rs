//! A curated, append-only repository of viral reference genomes.
//!
//! An OTU (Operational Taxonomic Unit) is tracked as a fold over an
//! append-only event log, not as a row a caller can update in place. The
//! event log is the single source of truth; everything else here is either
//! a deterministic derivation of it (the OTU aggregate, the SQLite index)
//! or machinery that keeps writes to it safe (the lock, the transaction).
//!
//! # Crate structure
//!
//! - [`core`]: errors, the advisory repository lock, logging, time helpers.
//! - [`model`]: the OTU aggregate and its constituent value types (C3).
//! - [`event`]: the event envelope, typed payloads, and the fold (C2).
//! - [`store`]: the append-only event log with crash-safe commit (C1).
//! - [`index`]: the derived, rebuildable SQLite index (C4).
//! - [`repository`]: the transactional façade tying the above together (C5).
//! - [`external`]: input shapes and trait boundaries for external
//!   collaborators (an NCBI fetch client, a taxonomy source); no HTTP or XML
//!   client ships here.

pub mod core;
pub mod event;
pub mod external;
pub mod index;
pub mod model;
pub mod repository;
pub mod store;

pub use core::error::{RefBuilderError, Result};
pub use repository::Repository;
