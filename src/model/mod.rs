//! The OTU aggregate and its constituent value types (C3, spec §3.1).
//!
//! Construction goes through a `Builder → validate → immutable Aggregate`
//! pipeline rather than the always-revalidate-on-assignment style of the
//! system this crate's semantics were distilled from (spec §9): mutation
//! means building the next aggregate from the previous one plus an event.

pub mod accession;
pub mod isolate;
pub mod isolate_name;
pub mod lineage;
pub mod molecule;
pub mod otu;
pub mod plan;
pub mod repo_meta;
pub mod segment;
pub mod sequence;

pub use accession::Accession;
pub use isolate::Isolate;
pub use isolate_name::{IsolateName, IsolateNameKind};
pub use lineage::{Lineage, Taxon, TaxonOtherNames};
pub use molecule::{Molecule, MoleculeType, Strandedness, Topology};
pub use otu::{Otu, OtuMinimal};
pub use plan::{Plan, SegmentRule};
pub use repo_meta::{RepoMeta, RepoSettings};
pub use segment::{Segment, SegmentName};
pub use sequence::Sequence;
