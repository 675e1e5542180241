//! The repository façade (C5, spec §4.5): locking, transactions,
//! write-with-validation, and the canonical read path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::core::lock::RepoLock;
use crate::core::time::now_iso;
use crate::event::{
    CreateIsolateData, CreateOtuData, CreatePlanData, CreateRepoData, DeleteIsolateData,
    DeleteOtuData, Event, EventKind, EventMetadata, EventQuery, ExcludedAccessionAction,
    PromoteIsolateData, UpdateExcludedAccessionsData, UpdateSequenceData,
};
use crate::index::Index;
use crate::model::{Isolate, Lineage, Molecule, Otu, OtuMinimal, Plan, RepoMeta, RepoSettings, Sequence};
use crate::store::EventStore;

pub struct Repository {
    root: PathBuf,
    store: EventStore,
    index: Index,
    meta: RepoMeta,
    lock: Option<RepoLock>,
}

/// A multi-event write transaction (spec §4.5). Dropping without calling
/// [`Transaction::commit`] aborts: uncommitted event files are deleted and
/// the index is pruned back to the transaction's starting point.
pub struct Transaction<'a> {
    repo: &'a mut Repository,
    last_id: u64,
    committed: bool,
}

impl<'a> Transaction<'a> {
    pub fn repo(&mut self) -> &mut Repository {
        self.repo
    }

    pub fn commit(mut self) -> Result<()> {
        let last_written = self.repo.store.last_written_id()?;
        self.repo.store.commit(last_written)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.repo.store.truncate_after(self.last_id);
            let _ = self.repo.index.prune(self.last_id);
        }
    }
}

impl Repository {
    /// Initialises a fresh repository directory and appends the first
    /// (`CreateRepo`) event (spec §4.1: "`00000001.json` is always a
    /// `CreateRepo` event").
    pub fn init(root: &Path, name: &str, organism: &str, settings: RepoSettings) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        std::fs::create_dir_all(root.join(".cache"))?;
        let store = EventStore::open(root)?;
        if store.head()? != 0 {
            return Err(RefBuilderError::InvalidInput(
                "repository already initialised".into(),
            ));
        }

        let repo_id = Uuid::new_v4();
        let event = Event {
            id: 1,
            timestamp: now_iso(),
            query: EventQuery::Repository {
                repository_id: repo_id,
            },
            kind: EventKind::CreateRepo(CreateRepoData {
                id: repo_id,
                name: name.to_string(),
                organism: organism.to_string(),
                settings: settings.clone(),
            }),
        };
        store.append(&event)?;
        store.commit(1)?;

        let index = Index::open(&root.join(".cache"))?;
        index.record_event(&EventMetadata {
            id: 1,
            otu_id: None,
            timestamp: event.timestamp.clone(),
        })?;

        Ok(Repository {
            root: root.to_path_buf(),
            store,
            index,
            meta: RepoMeta {
                id: repo_id,
                name: name.to_string(),
                organism: organism.to_string(),
                created_at: event.timestamp,
                settings,
            },
            lock: None,
        })
    }

    /// Opens an existing repository, performing crash recovery on the event
    /// log and rebuilding the index if it is missing or corrupt.
    pub fn open(root: &Path) -> Result<Self> {
        let store = EventStore::open(root)?;
        let cache_dir = root.join(".cache");

        let first = store.read_event(1)?;
        let meta = match first.kind {
            EventKind::CreateRepo(data) => RepoMeta {
                id: data.id,
                name: data.name,
                organism: data.organism,
                created_at: first.timestamp,
                settings: data.settings,
            },
            _ => {
                return Err(RefBuilderError::Hydration {
                    otu_id: String::new(),
                    what: "CreateRepo as event",
                    reference: "1".to_string(),
                })
            }
        };

        let index = match Index::open(&cache_dir) {
            Ok(index) => index,
            Err(_) => {
                std::fs::remove_file(Index::cache_path(&cache_dir)).ok();
                Index::open(&cache_dir)?
            }
        };

        let mut repo = Repository {
            root: root.to_path_buf(),
            store,
            index,
            meta,
            lock: None,
        };
        if repo.index.last_recorded_event_id()? < repo.store.head()? {
            repo.rebuild_index()?;
        }
        Ok(repo)
    }

    /// Replays the entire log, folding each OTU to its latest state, and
    /// upserts the result (spec §4.4 "Rebuild"). Idempotent.
    pub fn rebuild_index(&mut self) -> Result<()> {
        let cache_dir = self.root.join(".cache");
        std::fs::remove_file(Index::cache_path(&cache_dir)).ok();

        let fresh = Index::open(&cache_dir)?;
        let events = self.store.iter_events()?;

        use std::collections::HashMap;
        let mut grouped: HashMap<Uuid, Vec<&Event>> = HashMap::new();
        for event in &events {
            fresh.record_event(&EventMetadata {
                id: event.id,
                otu_id: event.query.otu_id(),
                timestamp: event.timestamp.clone(),
            })?;
            if let Some(otu_id) = event.query.otu_id() {
                grouped.entry(otu_id).or_default().push(event);
            }
        }

        for (otu_id, otu_events) in grouped {
            let mut current: Option<Otu> = None;
            let mut last_id = 0u64;
            for event in otu_events {
                current = Some(crate::event::apply(current, event)?);
                last_id = event.id;
            }
            if let Some(otu) = current {
                fresh.upsert_otu(&otu, last_id)?;
            }
            let _ = otu_id;
        }

        self.index = fresh;
        Ok(())
    }

    pub fn lock(&mut self) -> Result<()> {
        self.lock = Some(RepoLock::acquire(&self.root)?);
        Ok(())
    }

    fn require_lock(&self) -> Result<()> {
        if self.lock.is_none() {
            return Err(RefBuilderError::LockRequired);
        }
        Ok(())
    }

    pub fn begin_transaction(&mut self) -> Result<Transaction<'_>> {
        self.require_lock()?;
        let last_id = self.store.head()?;
        Ok(Transaction {
            repo: self,
            last_id,
            committed: false,
        })
    }

    pub fn meta(&self) -> &RepoMeta {
        &self.meta
    }

    // ---- read path (spec §4.5 "Read") --------------------------------

    /// Canonical read: snapshot fast-path first, else full fold.
    pub fn get_otu(&mut self, otu_id: Uuid) -> Result<Otu> {
        let event_ids = self.index.event_ids_for_otu(otu_id)?;
        if event_ids.is_empty() {
            return Err(RefBuilderError::NotFound(format!("OTU {otu_id}")));
        }
        let last_event_id = *event_ids.last().unwrap();

        let snapshot = self.index.load_snapshot(otu_id)?;
        let otu = match snapshot {
            Some((otu, at_event)) if at_event == last_event_id => otu,
            Some((otu, at_event)) => {
                let mut current = Some(otu);
                for &id in event_ids.iter().filter(|&&id| id > at_event) {
                    let event = self.store.read_event(id)?;
                    current = Some(crate::event::apply(current, &event)?);
                }
                let rebuilt = current.unwrap();
                self.index.upsert_otu(&rebuilt, last_event_id)?;
                rebuilt
            }
            None => {
                let mut current = None;
                for &id in &event_ids {
                    let event = self.store.read_event(id)?;
                    current = Some(crate::event::apply(current, &event)?);
                }
                let rebuilt = current.unwrap();
                self.index.upsert_otu(&rebuilt, last_event_id)?;
                rebuilt
            }
        };

        if otu.deleted {
            return Err(RefBuilderError::OtuDeleted {
                otu_id: otu.id.to_string(),
                taxid: otu.taxid,
            });
        }
        Ok(otu)
    }

    /// Resolves a user-supplied identifier string to an OTU id (spec §4.3).
    pub fn resolve_identifier(&self, s: &str) -> Result<Uuid> {
        if s.len() == 36 {
            if let Ok(id) = Uuid::parse_str(s) {
                return Ok(id);
            }
        }
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            let taxid: i64 = s
                .parse()
                .map_err(|_| RefBuilderError::InvalidInput(format!("invalid taxid {s:?}")))?;
            return self
                .index
                .get_id_by_taxid(taxid)?
                .ok_or_else(|| RefBuilderError::NotFound(format!("taxid {taxid}")));
        }
        if !s.is_empty() {
            if let Some(id) = self.index.get_id_by_acronym(s)? {
                return Ok(id);
            }
        }
        if s.len() < 8 {
            return Err(RefBuilderError::InvalidInput(format!(
                "identifier prefix {s:?} is shorter than 8 characters"
            )));
        }
        let matches = self.index.find_ids_by_prefix(s)?;
        match matches.len() {
            0 => Err(RefBuilderError::NotFound(format!("prefix {s:?}"))),
            1 => Ok(matches[0]),
            _ => Err(RefBuilderError::PartialIdConflict {
                prefix: s.to_string(),
            }),
        }
    }

    pub fn get_otu_by_identifier(&mut self, s: &str) -> Result<Otu> {
        let id = self.resolve_identifier(s)?;
        self.get_otu(id)
    }

    pub fn iter_minimal_otus(&self) -> Result<Vec<OtuMinimal>> {
        self.index.iter_minimal_otus()
    }

    // ---- write path (spec §4.5 "Write-with-validation") ---------------

    fn next_event_id(&self) -> Result<u64> {
        Ok(self.store.last_written_id()? + 1)
    }

    /// Appends `event`, advances `head` to it, and records it in the index
    /// (spec §4.1 "Write contract"). Each façade write is its own durable
    /// step; [`Transaction`] exists for callers that need several writes to
    /// succeed or fail together.
    fn append_and_index(&mut self, event: Event) -> Result<()> {
        self.store.append(&event)?;
        self.store.commit(event.id)?;
        self.index.record_event(&EventMetadata {
            id: event.id,
            otu_id: event.query.otu_id(),
            timestamp: event.timestamp.clone(),
        })?;
        Ok(())
    }

    /// Creates a new OTU. Validated by the constructor of the implied OTU
    /// aggregate only — not by the general revalidation step, since a fresh
    /// OTU legitimately has no isolates yet (spec §4.5).
    pub fn create_otu(
        &mut self,
        acronym: String,
        molecule: Molecule,
        lineage: Lineage,
        name: String,
        taxid: i64,
        plan: Plan,
    ) -> Result<Uuid> {
        self.require_lock()?;

        if self.index.all_taxids()?.contains(&taxid) {
            return Err(RefBuilderError::OtuExists {
                field: "taxid",
                value: taxid.to_string(),
            });
        }
        if self.index.all_names()?.contains(&name) {
            return Err(RefBuilderError::OtuExists {
                field: "name",
                value: name,
            });
        }
        if self.index.all_acronyms()?.contains(&acronym) {
            return Err(RefBuilderError::OtuExists {
                field: "acronym",
                value: acronym,
            });
        }

        let otu_id = Uuid::new_v4();
        warn_if_no_required_segment(otu_id, taxid, &plan);
        let event = Event {
            id: self.next_event_id()?,
            timestamp: now_iso(),
            query: EventQuery::Otu { otu_id },
            kind: EventKind::CreateOtu(CreateOtuData {
                id: otu_id,
                acronym,
                molecule,
                lineage,
                name,
                taxid,
                plan,
            }),
        };

        let otu = crate::event::apply(None, &event)?;
        otu.validate(false)?;

        let event_id = event.id;
        self.append_and_index(event)?;
        self.index.upsert_otu(&otu, event_id)?;
        info!(otu_id = %otu_id, taxid = otu.taxid, event_id, "created OTU");
        Ok(otu_id)
    }

    /// Loads the current OTU, applies `kind` via the fold, validates the
    /// result against §3.2, and only then appends and indexes the event.
    fn write_mutation(&mut self, otu_id: Uuid, kind: EventKind, isolate_id: Option<Uuid>, accession: Option<String>) -> Result<Otu> {
        self.require_lock()?;
        let current = self.get_otu(otu_id)?;

        let query = if let Some(isolate_id) = isolate_id {
            EventQuery::OtuIsolate { otu_id, isolate_id }
        } else if let Some(accession) = accession {
            EventQuery::OtuAccession { otu_id, accession }
        } else {
            EventQuery::Otu { otu_id }
        };

        let kind_tag = kind.tag();
        let event = Event {
            id: self.next_event_id()?,
            timestamp: now_iso(),
            query,
            kind,
        };

        let next = crate::event::apply(Some(current), &event)?;
        next.validate(true)?;

        let event_id = event.id;
        self.append_and_index(event)?;
        self.index.upsert_otu(&next, event_id)?;
        info!(otu_id = %otu_id, taxid = next.taxid, event_id, kind = kind_tag, "applied mutation");
        Ok(next)
    }

    pub fn create_plan(&mut self, otu_id: Uuid, plan: Plan) -> Result<Otu> {
        let taxid = self.get_otu(otu_id)?.taxid;
        warn_if_no_required_segment(otu_id, taxid, &plan);
        self.write_mutation(otu_id, EventKind::CreatePlan(CreatePlanData { plan }), None, None)
    }

    pub fn delete_otu(
        &mut self,
        otu_id: Uuid,
        rationale: String,
        replacement_otu_id: Option<Uuid>,
    ) -> Result<()> {
        self.require_lock()?;
        let current = self.get_otu(otu_id)?;
        let event = Event {
            id: self.next_event_id()?,
            timestamp: now_iso(),
            query: EventQuery::Otu { otu_id },
            kind: EventKind::DeleteOtu(DeleteOtuData {
                rationale,
                replacement_otu_id,
            }),
        };
        let next = crate::event::apply(Some(current), &event)?;
        next.validate(true)?;
        let event_id = event.id;
        self.append_and_index(event)?;
        self.index.upsert_otu(&next, event_id)?;
        warn!(otu_id = %otu_id, taxid = next.taxid, event_id, "otu deleted");
        Ok(())
    }

    /// Sets the OTU's excluded-accessions set. No-ops (no event produced)
    /// if the action would not change the set (spec §8 "idempotence").
    pub fn update_excluded_accessions(
        &mut self,
        otu_id: Uuid,
        accessions: HashSet<String>,
        action: ExcludedAccessionAction,
    ) -> Result<Otu> {
        self.require_lock()?;
        let current = self.get_otu(otu_id)?;

        let changes_anything = match action {
            ExcludedAccessionAction::Allow => accessions
                .iter()
                .any(|a| current.excluded_accessions.contains(a)),
            ExcludedAccessionAction::Exclude => accessions
                .iter()
                .any(|a| !current.excluded_accessions.contains(a)),
        };
        if !changes_anything {
            return Ok(current);
        }

        if action == ExcludedAccessionAction::Exclude {
            let blocked_by_promotion: Vec<&String> = accessions
                .iter()
                .filter(|a| current.promoted_accessions.contains(*a))
                .collect();
            if !blocked_by_promotion.is_empty() {
                warn!(
                    otu_id = %otu_id,
                    accessions = ?blocked_by_promotion,
                    "rejected exclusion of already-promoted accessions"
                );
                return Err(RefBuilderError::InvalidInput(format!(
                    "cannot exclude promoted accessions: {blocked_by_promotion:?}"
                )));
            }
        }

        let event = Event {
            id: self.next_event_id()?,
            timestamp: now_iso(),
            query: EventQuery::Otu { otu_id },
            kind: EventKind::UpdateExcludedAccessions(UpdateExcludedAccessionsData {
                accessions: accessions.into_iter().collect(),
                action,
            }),
        };
        let next = crate::event::apply(Some(current), &event)?;
        next.validate(true)?;
        let event_id = event.id;
        self.append_and_index(event)?;
        self.index.upsert_otu(&next, event_id)?;
        Ok(next)
    }

    /// Appends a new isolate with its sequences atomically (spec §4.2
    /// "CreateIsolate"). Rejects any sequence whose accession is blocked
    /// (spec §8 property 6).
    pub fn create_isolate(
        &mut self,
        otu_id: Uuid,
        name: Option<crate::model::isolate_name::IsolateName>,
        taxid: i64,
        sequences: Vec<Sequence>,
    ) -> Result<Otu> {
        self.require_lock()?;
        let current = self.get_otu(otu_id)?;

        let blocked = current.blocked_accessions();
        for sequence in &sequences {
            if blocked.contains(&sequence.accession.key) {
                warn!(
                    otu_id = %otu_id,
                    accession = %sequence.accession,
                    "rejected blocked accession on isolate creation"
                );
                return Err(RefBuilderError::InvalidInput(format!(
                    "accession {} is blocked (already present, excluded, or promoted)",
                    sequence.accession
                )));
            }
        }

        let refseq_count = sequences.iter().filter(|s| s.accession.is_refseq()).count();
        if refseq_count != 0 && refseq_count != sequences.len() {
            warn!(
                otu_id = %otu_id,
                "rejected isolate mixing RefSeq and GenBank accessions"
            );
            return Err(RefBuilderError::InvalidInput(
                "an isolate's sequences must be either all-RefSeq or all-GenBank".into(),
            ));
        }

        let isolate_id = Uuid::new_v4();
        self.write_mutation(
            otu_id,
            EventKind::CreateIsolate(CreateIsolateData {
                isolate_id,
                name,
                taxid,
                sequences,
            }),
            Some(isolate_id),
            None,
        )
    }

    pub fn delete_isolate(&mut self, otu_id: Uuid, isolate_id: Uuid, message: String) -> Result<Otu> {
        self.write_mutation(
            otu_id,
            EventKind::DeleteIsolate(DeleteIsolateData { isolate_id, message }),
            Some(isolate_id),
            None,
        )
    }

    pub fn promote_isolate(
        &mut self,
        otu_id: Uuid,
        isolate_id: Uuid,
        replacements: Vec<(String, Sequence)>,
    ) -> Result<Otu> {
        self.write_mutation(
            otu_id,
            EventKind::PromoteIsolate(PromoteIsolateData { replacements }),
            Some(isolate_id),
            None,
        )
    }

    pub fn update_sequence(&mut self, otu_id: Uuid, accession: String, sequence: Sequence) -> Result<Otu> {
        self.write_mutation(
            otu_id,
            EventKind::UpdateSequence(UpdateSequenceData { sequence }),
            None,
            Some(accession),
        )
    }

    // ---- supplemental audit history (SPEC_FULL §3, `otu_updates`) ------

    pub fn record_update_complete(&self, otu_id: Uuid) -> Result<()> {
        self.index.add_otu_update_history_entry(otu_id, &now_iso())
    }

    pub fn last_update_timestamp(&self, otu_id: Uuid) -> Result<Option<String>> {
        self.index.get_last_otu_update_timestamp(otu_id)
    }

    pub fn isolate_not_found(&self, otu: &Otu, isolate_id: Uuid) -> Option<Isolate> {
        otu.get_isolate(isolate_id).cloned()
    }
}

/// A plan with no required segment is accepted, not rejected: it can never
/// fail isolate admission on segment presence, but it also means the OTU can
/// never confirm a "complete" isolate. Logged as a warning (spec §7).
fn warn_if_no_required_segment(otu_id: Uuid, taxid: i64, plan: &Plan) {
    if plan.required_segments().next().is_none() {
        warn!(otu_id = %otu_id, taxid, "plan has no required segment");
    }
}
