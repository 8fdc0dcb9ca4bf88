// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;
use crate::model::{DialogueDocument, DocumentId};

/// What the journal persists for one editor state: the canonical document plus its layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalState {
    pub document: DialogueDocument,
    #[serde(default)]
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub state: JournalState,
    pub ack_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    pub state: JournalState,
    pub seq: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalEntry {
    pub snapshot: Option<SnapshotRecord>,
    pub pending: Option<PendingRecord>,
}

impl JournalEntry {
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none() && self.pending.is_none()
    }

    /// Pending holds edits the remote side never acknowledged.
    pub fn needs_resubmit(&self) -> bool {
        match (&self.pending, &self.snapshot) {
            (Some(pending), Some(snapshot)) => pending.seq > snapshot.ack_seq,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// The state a restarted editor should resume from.
    pub fn authoritative(&self) -> Option<&JournalState> {
        if self.needs_resubmit() {
            return self.pending.as_ref().map(|pending| &pending.state);
        }
        self.snapshot.as_ref().map(|snapshot| &snapshot.state)
    }

    /// Highest sequence number the journal has seen for this document.
    pub fn last_seq(&self) -> u64 {
        let pending = self.pending.as_ref().map_or(0, |pending| pending.seq);
        let acked = self.snapshot.as_ref().map_or(0, |snapshot| snapshot.ack_seq);
        pending.max(acked)
    }
}

/// Storage backend for the durability journal.
///
/// Calls take `&self`; backends synchronize internally so a journal can be shared behind an `Arc`.
pub trait JournalStore: Send + Sync + fmt::Debug {
    fn set_pending(
        &self,
        doc_id: &DocumentId,
        state: &JournalState,
        seq: u64,
    ) -> Result<(), JournalError>;

    fn write_snapshot(
        &self,
        doc_id: &DocumentId,
        state: &JournalState,
        ack_seq: u64,
    ) -> Result<(), JournalError>;

    fn clear_pending(&self, doc_id: &DocumentId) -> Result<(), JournalError>;

    fn read_document(&self, doc_id: &DocumentId) -> Result<JournalEntry, JournalError>;

    /// Blocks until queued writes reached the backing store.
    fn flush(&self) -> Result<(), JournalError> {
        Ok(())
    }
}

#[derive(Debug)]
pub enum JournalError {
    PersistenceUnavailable {
        reason: String,
        source: Option<io::Error>,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl JournalError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::PersistenceUnavailable {
            reason: reason.into(),
            source: None,
        }
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersistenceUnavailable { reason, .. } => {
                write!(f, "journal persistence unavailable: {reason}")
            }
            Self::Io { path, source } => write!(f, "io error at {path:?}: {source}"),
            Self::Json { path, source } => write!(f, "json error at {path:?}: {source}"),
        }
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PersistenceUnavailable { source, .. } => source
                .as_ref()
                .map(|source| source as &(dyn std::error::Error + 'static)),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

/// In-process journal. Survives editor restarts within one process only.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    entries: Mutex<HashMap<DocumentId, JournalEntry>>,
}

impl MemoryJournal {
    fn with_entry<R>(&self, doc_id: &DocumentId, f: impl FnOnce(&mut JournalEntry) -> R) -> R {
        let mut entries = self.entries.lock().expect("memory journal lock poisoned");
        f(entries.entry(doc_id.clone()).or_default())
    }
}

impl JournalStore for MemoryJournal {
    fn set_pending(
        &self,
        doc_id: &DocumentId,
        state: &JournalState,
        seq: u64,
    ) -> Result<(), JournalError> {
        self.with_entry(doc_id, |entry| {
            entry.pending = Some(PendingRecord {
                state: state.clone(),
                seq,
            });
        });
        Ok(())
    }

    fn write_snapshot(
        &self,
        doc_id: &DocumentId,
        state: &JournalState,
        ack_seq: u64,
    ) -> Result<(), JournalError> {
        self.with_entry(doc_id, |entry| {
            entry.snapshot = Some(SnapshotRecord {
                state: state.clone(),
                ack_seq,
            });
        });
        Ok(())
    }

    fn clear_pending(&self, doc_id: &DocumentId) -> Result<(), JournalError> {
        self.with_entry(doc_id, |entry| entry.pending = None);
        Ok(())
    }

    fn read_document(&self, doc_id: &DocumentId) -> Result<JournalEntry, JournalError> {
        let entries = self.entries.lock().expect("memory journal lock poisoned");
        Ok(entries.get(doc_id).cloned().unwrap_or_default())
    }
}

/// Stand-in for a journal whose storage is disabled or could not be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledJournal;

impl DisabledJournal {
    fn refuse<T>(&self) -> Result<T, JournalError> {
        Err(JournalError::unavailable("local storage is disabled"))
    }
}

impl JournalStore for DisabledJournal {
    fn set_pending(&self, _: &DocumentId, _: &JournalState, _: u64) -> Result<(), JournalError> {
        self.refuse()
    }

    fn write_snapshot(
        &self,
        _: &DocumentId,
        _: &JournalState,
        _: u64,
    ) -> Result<(), JournalError> {
        self.refuse()
    }

    fn clear_pending(&self, _: &DocumentId) -> Result<(), JournalError> {
        self.refuse()
    }

    fn read_document(&self, _: &DocumentId) -> Result<JournalEntry, JournalError> {
        self.refuse()
    }

    fn flush(&self) -> Result<(), JournalError> {
        self.refuse()
    }
}
