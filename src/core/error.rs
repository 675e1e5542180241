//! Error types for the repository core.
//!
//! This module defines the canonical error type returned by every public
//! operation in the crate. Uses `thiserror` for `Display`/`Error` and
//! auto-conversion from the I/O and SQLite error families.

use rusqlite;
use std::io;
use thiserror::Error;

/// Canonical error type for all repository operations.
#[derive(Error, Debug)]
pub enum RefBuilderError {
    /// SQLite error from the index (auto-converts from `rusqlite::Error`).
    #[error("index error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error from the event log or lock file (auto-converts from `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialisation failure on an event or index snapshot.
    #[error("serialisation error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Missing OTU, isolate, or sequence.
    #[error("not found: {0}")]
    NotFound(String),

    /// The OTU exists but has been deleted; a distinct, non-fatal outcome from `NotFound`.
    #[error("OTU {otu_id} (taxid {taxid}) has been deleted")]
    OtuDeleted { otu_id: String, taxid: i64 },

    /// An identifier prefix matched more than one OTU.
    #[error("identifier prefix {prefix:?} matches more than one OTU")]
    PartialIdConflict { prefix: String },

    /// Malformed accession, unknown taxid, identifier prefix shorter than 8 characters, etc.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Creating an OTU whose taxid, name, or acronym collides with an existing one.
    #[error("OTU already exists for {field} {value:?}")]
    OtuExists { field: &'static str, value: String },

    /// The result of applying an event would violate an OTU invariant.
    #[error("OTU {otu_id} (taxid {taxid}) failed validation: {reason}")]
    PlanValidation {
        otu_id: String,
        taxid: i64,
        reason: String,
    },

    /// The advisory lock is already held by another process.
    #[error("repository is locked by another process")]
    LockConflict,

    /// A write API was called without first acquiring the advisory lock.
    #[error("write operation attempted without holding the repository lock")]
    LockRequired,

    /// The event log references an isolate or sequence that is missing during fold; the log is corrupt.
    #[error("hydration error: OTU {otu_id} references missing {what} {reference}")]
    Hydration {
        otu_id: String,
        what: &'static str,
        reference: String,
    },

    /// An event file carries a `type` discriminator the fold does not recognise; the log is corrupt.
    #[error("unknown event type {0:?}")]
    UnknownEventType(String),

    /// The index references a sequence id that the `sequences` table no longer has; rebuild from the log.
    #[error("index corrupt: {0}")]
    IndexCorrupt(String),
}

pub type Result<T> = std::result::Result<T, RefBuilderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = RefBuilderError::NotFound("OTU abc123".to_string());
        assert_eq!(format!("{}", err), "not found: OTU abc123");
    }

    #[test]
    fn test_otu_deleted_display() {
        let err = RefBuilderError::OtuDeleted {
            otu_id: "abc".into(),
            taxid: 12242,
        };
        assert_eq!(
            format!("{}", err),
            "OTU abc (taxid 12242) has been deleted"
        );
    }

    #[test]
    fn test_partial_id_conflict_display() {
        let err = RefBuilderError::PartialIdConflict {
            prefix: "a1b2c3d4".into(),
        };
        assert_eq!(
            format!("{}", err),
            "identifier prefix \"a1b2c3d4\" matches more than one OTU"
        );
    }

    #[test]
    fn test_lock_conflict_display() {
        let err = RefBuilderError::LockConflict;
        assert_eq!(format!("{}", err), "repository is locked by another process");
    }
}
