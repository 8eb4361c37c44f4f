//! JSON document store under `.opsboard/board.json`.
//!
//! Every write reloads the document, applies the change and atomically
//! replaces the file. Readers never see a partially written document, but
//! the file is not locked: two overlapping writes can drop one change.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use opsboard_app::config::CONFIG_DIR;
use opsboard_app::{BoardLayout, RecordStore};
use opsboard_core::{Lead, Task, TaskId};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

const STORE_FILE: &str = "board.json";

/// Failures while reading or writing the board document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode board document: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    leads: Vec<Lead>,
    #[serde(default)]
    layout: BoardLayout,
}

/// File-backed [`RecordStore`].
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Store rooted at `workdir`; the directory is created on demand.
    ///
    /// # Errors
    /// Returns an error when `.opsboard/` cannot be created.
    pub fn open(workdir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = workdir.as_ref().join(CONFIG_DIR);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            path: dir.join(STORE_FILE),
        })
    }

    fn read(&self) -> Result<Document, StoreError> {
        if !self.path.exists() {
            return Ok(Document::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| self.io(source))?;
        if contents.trim().is_empty() {
            return Ok(Document::default());
        }
        serde_json::from_str(&contents).map_err(|source| StoreError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, document: &Document) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(document).map_err(StoreError::Encode)?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut file = NamedTempFile::new_in(dir).map_err(|source| self.io(source))?;
        file.write_all(&encoded).map_err(|source| self.io(source))?;
        file.persist(&self.path).map_err(|err| self.io(err.error))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Document)) -> Result<(), StoreError> {
        let mut document = self.read()?;
        apply(&mut document);
        self.write(&document)
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for JsonStore {
    type Error = StoreError;

    fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.read()?.tasks)
    }

    fn load_leads(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(self.read()?.leads)
    }

    fn upsert_task(&self, task: &Task) -> Result<(), StoreError> {
        self.update(|document| {
            match document.tasks.iter_mut().find(|existing| existing.id == task.id) {
                Some(existing) => existing.clone_from(task),
                None => document.tasks.push(task.clone()),
            }
        })
    }

    fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        self.update(|document| document.tasks.retain(|task| task.id != id))
    }

    fn delete_tasks(&self, ids: &[TaskId]) -> Result<(), StoreError> {
        self.update(|document| document.tasks.retain(|task| !ids.contains(&task.id)))
    }

    fn upsert_lead(&self, lead: &Lead) -> Result<(), StoreError> {
        self.update(|document| {
            match document.leads.iter_mut().find(|existing| existing.id == lead.id) {
                Some(existing) => existing.clone_from(lead),
                None => document.leads.push(lead.clone()),
            }
        })
    }

    fn load_layout(&self) -> Result<BoardLayout, StoreError> {
        Ok(self.read()?.layout)
    }

    fn save_layout(&self, layout: &BoardLayout) -> Result<(), StoreError> {
        self.update(|document| document.layout.clone_from(layout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use opsboard_app::SortMode;
    use tempfile::tempdir;
    use time::macros::datetime;

    #[test]
    fn missing_document_reads_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        assert!(store.load_tasks()?.is_empty());
        assert!(store.load_leads()?.is_empty());
        assert_eq!(store.load_layout()?, BoardLayout::default());
        Ok(())
    }

    #[test]
    fn upserts_and_deletes_persist_across_instances() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        let mut task = Task::new("call supplier", "dana", datetime!(2025-10-17 10:00 +3));
        store.upsert_task(&task)?;
        task.title = "call supplier again".into();
        store.upsert_task(&task)?;
        let lead = Lead::new("Noa", "050", datetime!(2025-10-17 10:00 +3));
        store.upsert_lead(&lead)?;
        store.save_layout(&BoardLayout {
            order: vec![task.id],
            sort_mode: SortMode::Manual,
            ..BoardLayout::default()
        })?;

        let reopened = JsonStore::open(dir.path())?;
        let tasks = reopened.load_tasks()?;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "call supplier again");
        assert_eq!(reopened.load_leads()?.len(), 1);
        assert_eq!(reopened.load_layout()?.sort_mode, SortMode::Manual);

        reopened.delete_tasks(&[task.id])?;
        assert!(store.load_tasks()?.is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_document_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStore::open(dir.path())?;
        fs::write(dir.path().join(CONFIG_DIR).join(STORE_FILE), "{not json")?;
        assert!(matches!(store.load_tasks(), Err(StoreError::Decode { .. })));
        Ok(())
    }
}
