//! The event log (C1, spec §4.1): numbered, immutable event files with a
//! crash-safe `head` pointer. Grounded on the teacher's append-then-project
//! discipline (`src/plugins/todo.rs::append_event`/`rebuild_from_events`),
//! generalised from one growing JSONL file to spec §4.1's file-per-event
//! layout, since crash safety here comes from file *presence*, not a line
//! offset.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::event::{Event, EventRecord};

const EVENT_ID_WIDTH: usize = 8;

pub struct EventStore {
    root: PathBuf,
}

impl EventStore {
    /// Opens the event log rooted at `repo_root`, creating `src/` if this is
    /// a fresh repository, and performing crash recovery (spec §4.1
    /// "Recovery"): any `src/<n>.json` beyond the durable `head` is deleted.
    pub fn open(repo_root: &Path) -> Result<Self> {
        let store = EventStore {
            root: repo_root.to_path_buf(),
        };
        fs::create_dir_all(store.src_dir())?;
        store.recover()?;
        Ok(store)
    }

    fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    fn head_path(&self) -> PathBuf {
        self.root.join("head")
    }

    fn event_path(&self, id: u64) -> PathBuf {
        self.src_dir()
            .join(format!("{:0width$}.json", id, width = EVENT_ID_WIDTH))
    }

    /// The last durable event id; `0` for a repository with no committed events.
    pub fn head(&self) -> Result<u64> {
        match fs::read_to_string(self.head_path()) {
            Ok(contents) => Ok(contents.trim().parse().unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every event file beyond `head` (spec §4.1 "Recovery").
    fn recover(&self) -> Result<()> {
        let head = self.head()?;
        for entry in fs::read_dir(self.src_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = parse_event_filename(&name) {
                if id > head {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    /// The highest event id present on disk (committed or not), `0` if empty.
    pub fn last_written_id(&self) -> Result<u64> {
        let mut max = 0u64;
        for entry in fs::read_dir(self.src_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(id) = parse_event_filename(&name.to_string_lossy()) {
                max = max.max(id);
            }
        }
        Ok(max)
    }

    /// Appends `event` (whose `id` must already be `last_written_id() + 1`)
    /// as an immutable file. Does not advance `head` (spec §4.1 "Write contract").
    pub fn append(&self, event: &Event) -> Result<()> {
        let record = event.to_record()?;
        let bytes = serde_json::to_vec(&record)?;
        let final_path = self.event_path(event.id);
        let tmp_path = self.src_dir().join(format!(".{}.tmp", event.id));

        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Advances `head` to `up_to`, fsyncing the write (spec §4.1 "Commit").
    pub fn commit(&self, up_to: u64) -> Result<()> {
        let tmp_path = self.root.join(".head.tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(up_to.to_string().as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, self.head_path())?;
        Ok(())
    }

    /// Deletes every event file with id `> last_id` (spec §4.5 "abort").
    pub fn truncate_after(&self, last_id: u64) -> Result<()> {
        for entry in fs::read_dir(self.src_dir())? {
            let entry = entry?;
            if let Some(id) = parse_event_filename(&entry.file_name().to_string_lossy()) {
                if id > last_id {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    pub fn read_event(&self, id: u64) -> Result<Event> {
        let bytes = fs::read(self.event_path(id))?;
        let record: EventRecord = serde_json::from_slice(&bytes)?;
        Event::from_record(record)
    }

    /// Yields every committed event, in order, with id in `[1, head]`
    /// (spec §4.1 "Iteration").
    pub fn iter_events(&self) -> Result<Vec<Event>> {
        let head = self.head()?;
        let mut events = Vec::with_capacity(head as usize);
        for id in 1..=head {
            events.push(self.read_event(id)?);
        }
        Ok(events)
    }
}

fn parse_event_filename(name: &str) -> Option<u64> {
    let stem = name.strip_suffix(".json")?;
    if stem.len() != EVENT_ID_WIDTH || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::base::EventQuery;
    use crate::event::{CreateRepoData, EventKind};
    use crate::model::RepoSettings;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn sample_event(id: u64) -> Event {
        Event {
            id,
            timestamp: "2026-01-01T00:00:00".into(),
            query: EventQuery::Repository {
                repository_id: Uuid::new_v4(),
            },
            kind: EventKind::CreateRepo(CreateRepoData {
                id: Uuid::new_v4(),
                name: "Generic Viruses".into(),
                organism: "virus".into(),
                settings: RepoSettings {
                    default_segment_length_tolerance: 0.03,
                },
            }),
        }
    }

    #[test]
    fn test_append_and_commit_round_trip() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        assert_eq!(store.head().unwrap(), 0);

        store.append(&sample_event(1)).unwrap();
        store.commit(1).unwrap();
        assert_eq!(store.head().unwrap(), 1);

        let read_back = store.read_event(1).unwrap();
        assert_eq!(read_back.id, 1);
    }

    #[test]
    fn test_crash_recovery_truncates_uncommitted() {
        let dir = tempdir().unwrap();
        {
            let store = EventStore::open(dir.path()).unwrap();
            store.append(&sample_event(1)).unwrap();
            store.commit(1).unwrap();
            store.append(&sample_event(2)).unwrap();
            // no commit: simulates a crash before committing event 2
        }
        let store = EventStore::open(dir.path()).unwrap();
        assert_eq!(store.head().unwrap(), 1);
        assert!(store.read_event(2).is_err());
    }

    #[test]
    fn test_append_only_no_file_is_modified() {
        let dir = tempdir().unwrap();
        let store = EventStore::open(dir.path()).unwrap();
        store.append(&sample_event(1)).unwrap();
        store.commit(1).unwrap();
        let bytes_before = fs::read(store.event_path(1)).unwrap();
        store.append(&sample_event(2)).unwrap();
        store.commit(2).unwrap();
        let bytes_after = fs::read(store.event_path(1)).unwrap();
        assert_eq!(bytes_before, bytes_after);
    }
}
