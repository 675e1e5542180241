//! The derived SQLite index (C4, spec §4.4). Schema, upsert, snapshot-load,
//! and rebuild are grounded directly on `ref_builder/index.py::Index`; the
//! connection setup (WAL, foreign keys, busy timeout) follows the teacher's
//! `src/core/db.rs::db_connect`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use crate::core::error::{RefBuilderError, Result};
use crate::event::EventMetadata;
use crate::model::{Otu, OtuMinimal};

pub struct Index {
    conn: Connection,
}

fn db_connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

impl Index {
    /// Opens (creating if absent) the index database at `cache_dir/index.db`.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let conn = db_connect(&cache_dir.join("index.db"))?;
        let index = Index { conn };
        index.initialize_schema()?;
        Ok(index)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                event_id INTEGER PRIMARY KEY,
                otu_id TEXT,
                timestamp TEXT
            );
            CREATE TABLE IF NOT EXISTS isolates (
                id TEXT PRIMARY KEY,
                name TEXT,
                otu_id TEXT
            );
            CREATE TABLE IF NOT EXISTS otus (
                id TEXT PRIMARY KEY,
                acronym TEXT,
                at_event INTEGER,
                deleted INTEGER NOT NULL DEFAULT 0,
                name TEXT,
                otu TEXT,
                taxid INTEGER
            );
            CREATE TABLE IF NOT EXISTS sequences (
                id TEXT PRIMARY KEY,
                crc INTEGER,
                otu_id TEXT,
                sequence TEXT
            );
            CREATE TABLE IF NOT EXISTS otu_updates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                otu_id TEXT,
                timestamp_complete TEXT
            );
            CREATE INDEX IF NOT EXISTS events_otu_id ON events (otu_id);
            CREATE INDEX IF NOT EXISTS otus_name ON otus (name);
            CREATE INDEX IF NOT EXISTS otus_taxid ON otus (taxid);
            CREATE INDEX IF NOT EXISTS sequences_otu_id ON sequences (otu_id);
            CREATE INDEX IF NOT EXISTS sequences_crc ON sequences (crc);
            ",
        )?;
        Ok(())
    }

    pub fn record_event(&self, meta: &EventMetadata) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (event_id, otu_id, timestamp) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                meta.id,
                meta.otu_id.map(|id| id.to_string()),
                meta.timestamp,
            ],
        )?;
        Ok(())
    }

    /// Event ids recorded against `otu_id`, in order (spec §4.4
    /// "events(event_id, otu_id, timestamp)").
    pub fn event_ids_for_otu(&self, otu_id: Uuid) -> Result<Vec<u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT event_id FROM events WHERE otu_id = ?1 ORDER BY event_id")?;
        let rows = stmt.query_map(rusqlite::params![otu_id.to_string()], |r| {
            r.get::<_, i64>(0)
        })?;
        Ok(rows.filter_map(|r| r.ok()).map(|v| v as u64).collect())
    }

    pub fn get_id_by_taxid(&self, taxid: i64) -> Result<Option<Uuid>> {
        self.get_id_by("taxid", &taxid.to_string(), true)
    }

    pub fn get_id_by_acronym(&self, acronym: &str) -> Result<Option<Uuid>> {
        self.get_id_by("acronym", acronym, false)
    }

    pub fn get_id_by_name(&self, name: &str) -> Result<Option<Uuid>> {
        self.get_id_by("name", name, false)
    }

    fn get_id_by(&self, column: &str, value: &str, numeric: bool) -> Result<Option<Uuid>> {
        let sql = format!("SELECT id FROM otus WHERE {column} = ?1");
        let id: Option<String> = if numeric {
            self.conn
                .query_row(&sql, rusqlite::params![value.parse::<i64>().unwrap_or_default()], |r| r.get(0))
                .optional()?
        } else {
            self.conn
                .query_row(&sql, rusqlite::params![value], |r| r.get(0))
                .optional()?
        };
        Ok(id.and_then(|s| Uuid::parse_str(&s).ok()))
    }

    /// All ids whose canonical string form starts with `prefix` (spec §4.3
    /// identifier-prefix lookup).
    pub fn find_ids_by_prefix(&self, prefix: &str) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare("SELECT id FROM otus")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut matches = Vec::new();
        for row in rows {
            let id = row?;
            if id.starts_with(prefix) {
                if let Ok(uuid) = Uuid::parse_str(&id) {
                    matches.push(uuid);
                }
            }
        }
        Ok(matches)
    }

    /// Taxids in use by a non-deleted OTU (spec.md:192: deleted OTUs free
    /// their taxid/acronym/name for reuse).
    pub fn all_taxids(&self) -> Result<HashSet<i64>> {
        let mut stmt = self.conn.prepare("SELECT taxid FROM otus WHERE deleted = 0")?;
        let rows = stmt.query_map([], |r| r.get::<_, i64>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn all_names(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM otus WHERE deleted = 0")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn all_acronyms(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT acronym FROM otus WHERE deleted = 0")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Public view (spec.md:192): deleted OTUs are excluded.
    pub fn iter_minimal_otus(&self) -> Result<Vec<OtuMinimal>> {
        let mut stmt = self
            .conn
            .prepare("SELECT acronym, id, name, taxid FROM otus WHERE deleted = 0 ORDER BY name")?;
        let rows = stmt.query_map([], |r| {
            let id: String = r.get(1)?;
            Ok(OtuMinimal {
                acronym: r.get(0)?,
                id: Uuid::parse_str(&id).unwrap_or_default(),
                name: r.get(2)?,
                taxid: r.get(3)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Loads the cached snapshot for `otu_id`, re-attaching sequence text
    /// from the `sequences` table. Returns `None` if no snapshot exists.
    pub fn load_snapshot(&self, otu_id: Uuid) -> Result<Option<(Otu, u64)>> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT at_event, otu FROM otus WHERE id = ?1",
                rusqlite::params![otu_id.to_string()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        let Some((at_event, otu_json)) = row else {
            return Ok(None);
        };

        let mut otu: Otu = serde_json::from_str(&otu_json)?;

        let sequence_ids: Vec<String> = otu
            .isolates
            .iter()
            .flat_map(|i| i.sequences.iter().map(|s| s.id.to_string()))
            .collect();

        if sequence_ids.is_empty() {
            return Ok(Some((otu, at_event as u64)));
        }

        let placeholders = std::iter::repeat("?")
            .take(sequence_ids.len())
            .collect::<Vec<_>>()
            .join(",");
        let sql = format!("SELECT id, sequence FROM sequences WHERE id IN ({placeholders})");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut sequence_map = std::collections::HashMap::new();
        let rows = stmt.query_map(params_from_iter(sequence_ids.iter()), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (id, sequence) = row?;
            sequence_map.insert(id, sequence);
        }

        let mut missing = Vec::new();
        for isolate in &mut otu.isolates {
            for sequence in &mut isolate.sequences {
                match sequence_map.get(&sequence.id.to_string()) {
                    Some(text) => sequence.sequence = text.clone(),
                    None => missing.push(sequence.id.to_string()),
                }
            }
        }
        if !missing.is_empty() {
            return Err(RefBuilderError::IndexCorrupt(format!(
                "sequences not found: {}",
                missing.join(", ")
            )));
        }

        Ok(Some((otu, at_event as u64)))
    }

    /// Upserts `otu`'s denormalised rows at `at_event` (spec §4.4 "Upsert").
    pub fn upsert_otu(&self, otu: &Otu, at_event: u64) -> Result<()> {
        let sequence_ids: Vec<String> = otu
            .isolates
            .iter()
            .flat_map(|i| i.sequences.iter().map(|s| s.id.to_string()))
            .collect();

        if sequence_ids.is_empty() {
            self.conn.execute(
                "DELETE FROM sequences WHERE otu_id = ?1",
                rusqlite::params![otu.id.to_string()],
            )?;
        } else {
            let placeholders = std::iter::repeat("?")
                .take(sequence_ids.len())
                .collect::<Vec<_>>()
                .join(",");
            let sql = format!(
                "DELETE FROM sequences WHERE otu_id = ? AND id NOT IN ({placeholders})"
            );
            let mut all_params: Vec<&dyn rusqlite::ToSql> = Vec::new();
            let otu_id_str = otu.id.to_string();
            all_params.push(&otu_id_str);
            for id in &sequence_ids {
                all_params.push(id);
            }
            self.conn.execute(&sql, all_params.as_slice())?;
        }

        for isolate in &otu.isolates {
            let name = isolate
                .name
                .as_ref()
                .map(|n| n.value.clone())
                .unwrap_or_default();
            self.conn.execute(
                "INSERT OR REPLACE INTO isolates (id, name, otu_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![isolate.id.to_string(), name, otu.id.to_string()],
            )?;

            for sequence in &isolate.sequences {
                let crc = crc32fast::hash(sequence.sequence.as_bytes());
                let changed: bool = self
                    .conn
                    .query_row(
                        "SELECT crc FROM sequences WHERE id = ?1",
                        rusqlite::params![sequence.id.to_string()],
                        |r| r.get::<_, i64>(0),
                    )
                    .optional()?
                    .map(|existing| existing as u32 != crc)
                    .unwrap_or(true);

                if changed {
                    self.conn.execute(
                        "INSERT OR REPLACE INTO sequences (id, crc, otu_id, sequence) VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![
                            sequence.id.to_string(),
                            crc,
                            otu.id.to_string(),
                            sequence.sequence,
                        ],
                    )?;
                }
            }
        }

        let mut stripped = otu.clone();
        for isolate in &mut stripped.isolates {
            for sequence in &mut isolate.sequences {
                sequence.sequence.clear();
            }
        }
        let otu_json = serde_json::to_string(&stripped)?;

        self.conn.execute(
            "INSERT OR REPLACE INTO otus (id, acronym, at_event, deleted, name, otu, taxid) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                otu.id.to_string(),
                otu.acronym,
                at_event as i64,
                otu.deleted as i64,
                otu.name,
                otu_json,
                otu.taxid,
            ],
        )?;
        Ok(())
    }

    /// Removes events/snapshots beyond `event_id` (spec §4.4 "Prune", used
    /// on transaction abort).
    pub fn prune(&self, event_id: u64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM events WHERE event_id > ?1",
            rusqlite::params![event_id as i64],
        )?;
        self.conn.execute(
            "DELETE FROM otus WHERE at_event > ?1",
            rusqlite::params![event_id as i64],
        )?;
        Ok(())
    }

    pub fn delete_otu_row(&self, otu_id: Uuid) -> Result<()> {
        let id = otu_id.to_string();
        self.conn
            .execute("DELETE FROM isolates WHERE otu_id = ?1", rusqlite::params![id])?;
        self.conn
            .execute("DELETE FROM otus WHERE id = ?1", rusqlite::params![id])?;
        self.conn
            .execute("DELETE FROM sequences WHERE otu_id = ?1", rusqlite::params![id])?;
        Ok(())
    }

    /// Deletes the on-disk index file(s) so the caller can rebuild from
    /// scratch (spec §4.4 "Rebuild").
    pub fn cache_path(cache_dir: &Path) -> PathBuf {
        cache_dir.join("index.db")
    }

    /// Appends a batch-update completion entry (SPEC_FULL §3, consumed by
    /// the external updater; the core only appends and reads). Retention is
    /// left unbounded (spec §9 open question).
    pub fn add_otu_update_history_entry(&self, otu_id: Uuid, timestamp: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO otu_updates (otu_id, timestamp_complete) VALUES (?1, ?2)",
            rusqlite::params![otu_id.to_string(), timestamp],
        )?;
        Ok(())
    }

    /// The highest event id the index has recorded, `0` if none. Used at
    /// open time to detect a stale or freshly (re)created index (spec §4.4
    /// "Rebuild").
    pub fn last_recorded_event_id(&self) -> Result<u64> {
        let max: Option<i64> = self
            .conn
            .query_row("SELECT MAX(event_id) FROM events", [], |r| r.get(0))?;
        Ok(max.unwrap_or(0) as u64)
    }

    pub fn get_last_otu_update_timestamp(&self, otu_id: Uuid) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT timestamp_complete FROM otu_updates WHERE otu_id = ?1 ORDER BY id DESC",
                rusqlite::params![otu_id.to_string()],
                |r| r.get(0),
            )
            .optional()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::molecule::{MoleculeType, Strandedness, Topology};
    use crate::model::plan::Plan;
    use crate::model::segment::{Segment, SegmentRule};
    use crate::model::{Accession, Isolate, Molecule, Sequence};
    use tempfile::tempdir;

    fn sample_otu() -> Otu {
        let segment_id = Uuid::new_v4();
        let segment = Segment {
            id: segment_id,
            length: 4,
            length_tolerance: 0.5,
            name: None,
            rule: SegmentRule::Required,
        };
        let plan = Plan::new(Uuid::new_v4(), vec![segment]).unwrap();
        let mut otu = Otu::new(
            Uuid::new_v4(),
            "TMV".into(),
            12242,
            "Tobacco mosaic virus".into(),
            Molecule {
                strandedness: Strandedness::Single,
                moltype: MoleculeType::Rna,
                topology: Topology::Linear,
            },
            plan,
        );
        let sequence = Sequence::new(
            Uuid::new_v4(),
            Accession::new("AB12345", 1).unwrap(),
            "def",
            segment_id,
            "ATGC",
        )
        .unwrap();
        let isolate = Isolate::new(Uuid::new_v4(), None, vec![sequence]).unwrap();
        otu.isolates.push(isolate);
        otu
    }

    #[test]
    fn test_upsert_and_load_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path()).unwrap();
        let otu = sample_otu();
        index.upsert_otu(&otu, 5).unwrap();

        let (loaded, at_event) = index.load_snapshot(otu.id).unwrap().unwrap();
        assert_eq!(at_event, 5);
        assert_eq!(loaded.isolates[0].sequences[0].sequence, "ATGC");
    }

    #[test]
    fn test_lookup_by_taxid_and_acronym() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path()).unwrap();
        let otu = sample_otu();
        index.upsert_otu(&otu, 1).unwrap();

        assert_eq!(index.get_id_by_taxid(12242).unwrap(), Some(otu.id));
        assert_eq!(index.get_id_by_acronym("TMV").unwrap(), Some(otu.id));
    }

    #[test]
    fn test_prune_removes_later_snapshots() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path()).unwrap();
        let otu = sample_otu();
        index.upsert_otu(&otu, 10).unwrap();
        index.prune(5).unwrap();
        assert!(index.load_snapshot(otu.id).unwrap().is_none());
    }
}
