// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Local durability journal.
//!
//! Each document keeps the last acknowledged state (`snapshot`) and the latest unacknowledged
//! local state (`pending`). The backends live behind [`JournalStore`] so the editor can run against
//! a folder on disk, an in-memory map, or nothing at all.

pub mod folder;
pub mod journal;

pub use folder::FolderJournal;
pub use journal::{
    DisabledJournal, JournalEntry, JournalError, JournalState, JournalStore, MemoryJournal,
    PendingRecord, SnapshotRecord,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteDurability {
    /// Fast, best-effort persistence.
    ///
    /// - Writes a temp file and renames atomically into place.
    /// - Does not perform per-file fsync/sync.
    #[default]
    BestEffort,

    /// Slower, best-effort durability.
    ///
    /// Attempts to flush written file contents and rename operations to stable storage where
    /// possible. Exact guarantees are platform/filesystem-dependent.
    Durable,
}
