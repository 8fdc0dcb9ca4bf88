// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use test_log::test;

use nereid_dialogue::model::{Choice, DialogueDocument, DialogueNode, NodeId, Point};
use nereid_dialogue::remote::{PersistenceEndpoint, RemoteError, SaveAck};
use nereid_dialogue::store::WriteDurability;
use nereid_dialogue::{DocumentId, Editor, EditorConfig, FolderJournal, JournalStore};

fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

fn doc_id() -> DocumentId {
    DocumentId::new("chapter:one").expect("doc id")
}

fn config(root: &Path) -> EditorConfig {
    EditorConfig::from_toml_str(&format!(
        "[journal]\nroot = {:?}\ndurability = \"durable\"\n",
        root.to_string_lossy()
    ))
    .expect("config")
}

fn document() -> DialogueDocument {
    DialogueDocument::new(vec![
        DialogueNode::new(nid("gate"), "Guard", "Halt.")
            .with_choice(Choice::new("Let me pass.").with_target(nid("END"))),
        DialogueNode::new(nid("END"), "", ""),
    ])
}

/// Acknowledges saves while `online` is set.
struct Endpoint {
    online: Cell<bool>,
}

impl PersistenceEndpoint for Endpoint {
    fn save(&self, _: &DocumentId, _: &DialogueDocument, seq: u64) -> Result<SaveAck, RemoteError> {
        if self.online.get() {
            Ok(SaveAck { ack_seq: seq })
        } else {
            Err(RemoteError::Unavailable {
                reason: "offline".to_owned(),
            })
        }
    }
}

#[test]
fn offline_edits_survive_a_restart_and_resubmit() {
    let tmp = TempDir::new().expect("tempdir");
    let config = config(tmp.path());
    let endpoint = Endpoint {
        online: Cell::new(true),
    };

    let expected = {
        let mut editor = Editor::open(&config, doc_id());
        assert!(editor.has_journal());
        editor.load(&document(), None);
        editor
            .update_position(nid("gate"), Point::new(40.0, 40.0))
            .expect("move");
        assert!(editor.save_with(&endpoint).expect("save").up_to_date);

        endpoint.online.set(false);
        editor
            .add_node(DialogueNode::new(nid("bribe"), "Guard", "Make it quick."), None)
            .expect("add");
        editor
            .connect(nid("bribe"), nid("END"), None, Some("next"))
            .expect("connect");
        assert!(editor.save_with(&endpoint).is_err());
        editor.flush_journal().expect("flush");
        editor.export_document()
    };

    let journal: Arc<dyn JournalStore> = Arc::new(
        FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("reopen"),
    );
    let mut editor = Editor::recover(&config, doc_id(), journal.clone()).expect("recover");
    assert_eq!(editor.export_document(), expected);
    assert!(editor.needs_resubmit());
    assert_eq!(editor.acked_seq(), 1);
    assert_eq!(editor.local_seq(), 3);

    endpoint.online.set(true);
    let outcome = editor.save_with(&endpoint).expect("resubmit");
    assert!(outcome.accepted);
    assert!(outcome.up_to_date);
    journal.flush().expect("flush");

    let entry = journal.read_document(&doc_id()).expect("read");
    assert!(entry.pending.is_none());
    assert_eq!(entry.snapshot.map(|snapshot| snapshot.ack_seq), Some(3));
}

#[test]
fn acknowledged_sessions_restart_clean() {
    let tmp = TempDir::new().expect("tempdir");
    let config = config(tmp.path());
    let endpoint = Endpoint {
        online: Cell::new(true),
    };

    {
        let mut editor = Editor::open(&config, doc_id());
        editor.load(&document(), None);
        editor
            .update_position(nid("END"), Point::new(0.0, 400.0))
            .expect("move");
        editor.save_with(&endpoint).expect("save");
    }

    let journal = Arc::new(
        FolderJournal::open(tmp.path(), WriteDurability::BestEffort).expect("reopen"),
    );
    let editor = Editor::recover(&config, doc_id(), journal).expect("recover");
    assert!(!editor.needs_resubmit());
    assert!(!editor.ui().dirty);
    assert_eq!(editor.export_document(), document());
    assert_eq!(
        editor.layout().nodes.get("END").copied(),
        Some(Point::new(0.0, 400.0))
    );
}

#[test]
fn an_unusable_journal_root_falls_back_to_memory() {
    let tmp = TempDir::new().expect("tempdir");
    let file = tmp.path().join("occupied");
    std::fs::write(&file, b"not a directory").expect("write");

    let mut editor = Editor::open(&config(&file), doc_id());
    assert!(!editor.has_journal());

    editor.load(&document(), None);
    let outcome = editor
        .update_position(nid("gate"), Point::new(10.0, 10.0))
        .expect("move");
    assert!(outcome.journal_error.is_none());
    assert!(editor.can_undo());
}
