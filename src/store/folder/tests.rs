// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fs;

use tempfile::TempDir;
use test_log::test;

use super::{
    encode_persisted_id_segment, fill_temp_file, FolderJournal, PENDING_FILENAME,
    SNAPSHOT_FILENAME,
};
use crate::layout::Layout;
use crate::model::fixtures::{nid, tavern_document};
use crate::model::{DialogueDocument, DialogueNode, DocumentId, Point};
use crate::store::{JournalError, JournalState, JournalStore, WriteDurability};

fn doc_id(value: &str) -> DocumentId {
    DocumentId::new(value).expect("doc id")
}

fn state(line: &str) -> JournalState {
    JournalState {
        document: DialogueDocument::new(vec![DialogueNode::new(nid("A"), "Ann", line)]),
        layout: Layout::default().with_position("A", Point::new(1.0, 2.0)),
    }
}

fn line_of(state: &JournalState) -> &str {
    &state.document.nodes[0].line
}

#[test]
fn pending_is_visible_before_and_after_the_writer_runs() {
    let tmp = TempDir::new().expect("tempdir");
    let journal = FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("open");
    let id = doc_id("tavern");

    journal.set_pending(&id, &state("draft"), 1).expect("pending");
    let entry = journal.read_document(&id).expect("read");
    assert_eq!(entry.pending.as_ref().map(|p| p.seq), Some(1));

    journal.flush().expect("flush");
    assert!(journal.document_dir(&id).join(PENDING_FILENAME).is_file());
    let entry = journal.read_document(&id).expect("read");
    assert_eq!(entry.pending.map(|p| line_of(&p.state).to_owned()), Some("draft".to_owned()));
}

#[test]
fn entries_survive_reopening() {
    let tmp = TempDir::new().expect("tempdir");
    let id = doc_id("tavern");
    let full = JournalState {
        document: tavern_document(),
        layout: Layout::default(),
    };
    {
        let journal = FolderJournal::open(tmp.path(), WriteDurability::Durable).expect("open");
        journal.write_snapshot(&id, &full, 4).expect("snapshot");
        journal.set_pending(&id, &state("unsent"), 5).expect("pending");
    }

    let journal = FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("reopen");
    let entry = journal.read_document(&id).expect("read");
    assert!(entry.needs_resubmit());
    assert_eq!(entry.snapshot.as_ref().map(|s| &s.state), Some(&full));
    assert_eq!(entry.authoritative().map(line_of), Some("unsent"));
}

#[test]
fn rapid_pending_writes_coalesce_to_the_latest() {
    let tmp = TempDir::new().expect("tempdir");
    let journal = FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("open");
    let id = doc_id("tavern");

    for seq in 1..=25 {
        journal
            .set_pending(&id, &state(&format!("edit {seq}")), seq)
            .expect("pending");
    }
    journal.flush().expect("flush");

    let raw = fs::read_to_string(journal.document_dir(&id).join(PENDING_FILENAME)).expect("file");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["seq"], 25);
}

#[test]
fn clear_pending_removes_the_file() {
    let tmp = TempDir::new().expect("tempdir");
    let journal = FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("open");
    let id = doc_id("tavern");

    journal.set_pending(&id, &state("draft"), 1).expect("pending");
    journal.write_snapshot(&id, &state("draft"), 1).expect("snapshot");
    journal.clear_pending(&id).expect("clear");
    assert_eq!(journal.read_document(&id).expect("read").pending, None);

    journal.flush().expect("flush");
    let dir = journal.document_dir(&id);
    assert!(!dir.join(PENDING_FILENAME).exists());
    assert!(dir.join(SNAPSHOT_FILENAME).is_file());
}

#[test]
fn unsafe_document_ids_are_encoded() {
    assert_eq!(encode_persisted_id_segment("tavern"), "tavern");
    assert_eq!(encode_persisted_id_segment("a:b"), "~613a62");
    assert_eq!(encode_persisted_id_segment("CON"), "~434f4e");
    assert_eq!(encode_persisted_id_segment(".hidden"), "~2e68696464656e");
}

#[test]
fn open_fails_when_the_root_is_a_file() {
    let tmp = TempDir::new().expect("tempdir");
    let root = tmp.path().join("journal");
    fs::write(&root, b"not a dir").expect("write");

    let err = FolderJournal::open(&root, WriteDurability::BestEffort).expect_err("unavailable");
    assert!(matches!(err, JournalError::PersistenceUnavailable { .. }));
}

#[test]
fn writer_failure_makes_the_journal_unavailable() {
    let tmp = TempDir::new().expect("tempdir");
    let journal = FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("open");
    let id = doc_id("blocked");
    // A file where the document directory should go.
    fs::write(journal.document_dir(&id), b"in the way").expect("write");

    journal.set_pending(&id, &state("draft"), 1).expect("queued");
    let err = journal.flush().expect_err("writer failed");
    assert!(matches!(err, JournalError::PersistenceUnavailable { .. }));

    let err = journal
        .set_pending(&doc_id("other"), &state("draft"), 2)
        .expect_err("still unavailable");
    assert!(matches!(err, JournalError::PersistenceUnavailable { .. }));
    assert!(journal.read_document(&id).is_err());
}

#[test]
fn failed_temp_write_leaves_no_file_behind() {
    let tmp = TempDir::new().expect("tempdir");
    let tmp_path = tmp.path().join(".nereid.tmp.pending.json.1");
    fs::write(&tmp_path, b"").expect("create");
    // Read-only handle, so the write itself fails.
    let file = fs::File::open(&tmp_path).expect("open");

    let err = fill_temp_file(&tmp_path, file, b"{}", WriteDurability::Durable)
        .expect_err("write fails");
    assert!(matches!(err, JournalError::Io { ref path, .. } if *path == tmp_path));
    assert!(!tmp_path.exists());
    assert_eq!(fs::read_dir(tmp.path()).expect("read dir").count(), 0);
}
