// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! On-disk journal: one directory per document holding `snapshot.json` and `pending.json`.
//!
//! Pending writes go through a background writer that coalesces per document, so recording the
//! latest local state never waits on the filesystem. Snapshot writes happen on the caller's thread.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::journal::{
    JournalEntry, JournalError, JournalState, JournalStore, PendingRecord, SnapshotRecord,
};
use super::WriteDurability;
use crate::model::DocumentId;

const SNAPSHOT_FILENAME: &str = "snapshot.json";
const PENDING_FILENAME: &str = "pending.json";

#[derive(Debug, Clone)]
enum PendingTask {
    Write(PendingRecord),
    Remove,
}

#[derive(Debug, Default)]
struct WriterState {
    pending: HashMap<DocumentId, PendingTask>,
    queue: VecDeque<DocumentId>,
    in_flight: Option<DocumentId>,
    failure: Option<String>,
    shutdown: bool,
}

#[derive(Debug)]
struct WriterInner {
    state: Mutex<WriterState>,
    cv: Condvar,
}

#[derive(Debug)]
pub struct FolderJournal {
    root: PathBuf,
    durability: WriteDurability,
    inner: Arc<WriterInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FolderJournal {
    /// Opens (creating if needed) a journal rooted at `root` and starts its writer thread.
    pub fn open(root: impl Into<PathBuf>, durability: WriteDurability) -> Result<Self, JournalError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| JournalError::PersistenceUnavailable {
            reason: format!("cannot create journal root {root:?}"),
            source: Some(source),
        })?;
        match fs::metadata(&root) {
            Ok(md) if md.is_dir() => {}
            Ok(_) => {
                return Err(JournalError::unavailable(format!(
                    "journal root {root:?} is not a directory"
                )))
            }
            Err(source) => {
                return Err(JournalError::PersistenceUnavailable {
                    reason: format!("cannot inspect journal root {root:?}"),
                    source: Some(source),
                })
            }
        }

        let inner = Arc::new(WriterInner {
            state: Mutex::new(WriterState::default()),
            cv: Condvar::new(),
        });
        let worker = std::thread::Builder::new()
            .name("nereid-journal-writer".to_owned())
            .spawn({
                let inner = inner.clone();
                let root = root.clone();
                move || run_worker(inner, root, durability)
            })
            .map_err(|source| JournalError::PersistenceUnavailable {
                reason: "cannot spawn journal writer".to_owned(),
                source: Some(source),
            })?;

        tracing::info!("journal opened at {:?}", root);
        Ok(Self {
            root,
            durability,
            inner,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn durability(&self) -> WriteDurability {
        self.durability
    }

    pub fn document_dir(&self, doc_id: &DocumentId) -> PathBuf {
        self.root.join(encode_persisted_id_segment(doc_id.as_str()))
    }

    fn check_healthy(&self) -> Result<(), JournalError> {
        let state = self.inner.state.lock().expect("journal writer lock poisoned");
        match &state.failure {
            Some(reason) => Err(JournalError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn schedule(&self, doc_id: &DocumentId, task: PendingTask) -> Result<(), JournalError> {
        let mut state = self.inner.state.lock().expect("journal writer lock poisoned");
        if let Some(reason) = &state.failure {
            return Err(JournalError::unavailable(reason.clone()));
        }
        if state.pending.contains_key(doc_id) {
            state.pending.insert(doc_id.clone(), task);
            return Ok(());
        }

        state.pending.insert(doc_id.clone(), task);
        state.queue.push_back(doc_id.clone());
        self.inner.cv.notify_all();
        Ok(())
    }

    /// Queued pending task for `doc_id`, waiting out a write of that document already in flight.
    fn queued_task(&self, doc_id: &DocumentId) -> Option<PendingTask> {
        let mut state = self.inner.state.lock().expect("journal writer lock poisoned");
        while state.in_flight.as_ref() == Some(doc_id) {
            state = self.inner.cv.wait(state).expect("journal writer cv poisoned");
        }
        state.pending.get(doc_id).cloned()
    }
}

impl JournalStore for FolderJournal {
    fn set_pending(
        &self,
        doc_id: &DocumentId,
        state: &JournalState,
        seq: u64,
    ) -> Result<(), JournalError> {
        self.schedule(
            doc_id,
            PendingTask::Write(PendingRecord {
                state: state.clone(),
                seq,
            }),
        )
    }

    fn write_snapshot(
        &self,
        doc_id: &DocumentId,
        state: &JournalState,
        ack_seq: u64,
    ) -> Result<(), JournalError> {
        self.check_healthy()?;
        let record = SnapshotRecord {
            state: state.clone(),
            ack_seq,
        };
        let dir = self.document_dir(doc_id);
        write_json_atomic(&dir, &dir.join(SNAPSHOT_FILENAME), &record, self.durability)?;
        tracing::debug!("journal snapshot for {} at ack {}", doc_id, ack_seq);
        Ok(())
    }

    fn clear_pending(&self, doc_id: &DocumentId) -> Result<(), JournalError> {
        self.schedule(doc_id, PendingTask::Remove)
    }

    fn read_document(&self, doc_id: &DocumentId) -> Result<JournalEntry, JournalError> {
        self.check_healthy()?;
        let dir = self.document_dir(doc_id);
        let snapshot = read_json::<SnapshotRecord>(&dir.join(SNAPSHOT_FILENAME))?;
        let pending = match self.queued_task(doc_id) {
            Some(PendingTask::Write(record)) => Some(record),
            Some(PendingTask::Remove) => None,
            None => read_json::<PendingRecord>(&dir.join(PENDING_FILENAME))?,
        };
        Ok(JournalEntry { snapshot, pending })
    }

    fn flush(&self) -> Result<(), JournalError> {
        let mut state = self.inner.state.lock().expect("journal writer lock poisoned");
        while state.failure.is_none() && (state.in_flight.is_some() || !state.queue.is_empty()) {
            state = self.inner.cv.wait(state).expect("journal writer cv poisoned");
        }
        match &state.failure {
            Some(reason) => Err(JournalError::unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl Drop for FolderJournal {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock().expect("journal writer lock poisoned");
            state.shutdown = true;
            self.inner.cv.notify_all();
        }
        let worker = self
            .worker
            .get_mut()
            .expect("journal worker lock poisoned")
            .take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

fn run_worker(inner: Arc<WriterInner>, root: PathBuf, durability: WriteDurability) {
    loop {
        let (doc_id, task) = {
            let mut state = inner.state.lock().expect("journal writer lock poisoned");

            loop {
                if let Some(doc_id) = state.queue.pop_front() {
                    if let Some(task) = state.pending.remove(&doc_id) {
                        state.in_flight = Some(doc_id.clone());
                        break (doc_id, task);
                    }
                    continue;
                }
                if state.shutdown {
                    return;
                }

                state = inner.cv.wait(state).expect("journal writer cv poisoned");
            }
        };

        let dir = root.join(encode_persisted_id_segment(doc_id.as_str()));
        let path = dir.join(PENDING_FILENAME);
        let result = match &task {
            PendingTask::Write(record) => write_json_atomic(&dir, &path, record, durability),
            PendingTask::Remove => remove_if_exists(&path),
        };

        let mut state = inner.state.lock().expect("journal writer lock poisoned");
        state.in_flight = None;
        if let Err(err) = result {
            tracing::error!("journal writer failed for {}: {}", doc_id, err);
            state.failure = Some(err.to_string());
            // Nothing queued can be trusted to land after a failure.
            state.pending.clear();
            state.queue.clear();
        }
        inner.cv.notify_all();
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, JournalError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(JournalError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| JournalError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json_atomic<T: Serialize>(
    dir: &Path,
    path: &Path,
    value: &T,
    durability: WriteDurability,
) -> Result<(), JournalError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| JournalError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    write_atomic(dir, path, &bytes, durability)
}

fn remove_if_exists(path: &Path) -> Result<(), JournalError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(JournalError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// Filesystem helpers shared by the writer thread and snapshot writes.
include!("folder/helpers.rs");

#[cfg(test)]
mod tests;
