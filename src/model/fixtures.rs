// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::document::{Choice, DialogueDocument, DialogueNode, TestOutcome};
use super::ids::NodeId;

pub(crate) fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

/// `START` with a single tested choice whose success leads to `END`.
pub(crate) fn skill_check_document() -> DialogueDocument {
    DialogueDocument::new(vec![
        DialogueNode::new(nid("START"), "Guard", "Hi").with_choice(
            Choice::new("Go")
                .with_test("Int:8")
                .with_outcome(TestOutcome::Success, nid("END")),
        ),
        DialogueNode::new(nid("END"), "", ""),
    ])
}

/// A small tavern conversation touching every link kind.
pub(crate) fn tavern_document() -> DialogueDocument {
    DialogueDocument::new(vec![
        DialogueNode::new(nid("greet"), "Barkeep", "What'll it be?")
            .with_choice(Choice::new("Ale, please.").with_target(nid("ale")))
            .with_choice(
                Choice::new("Tell me about the mine.")
                    .with_choice_id("ask-mine")
                    .with_test("Cha:6")
                    .with_outcome(TestOutcome::Failure, nid("rebuff"))
                    .with_outcome(TestOutcome::Success, nid("rumor"))
                    .with_outcome(TestOutcome::CriticalSuccess, nid("secret")),
            )
            .with_choice(Choice::new("Nothing.")),
        DialogueNode::new(nid("ale"), "Barkeep", "Two copper.").with_next(nid("END")),
        DialogueNode::new(nid("rebuff"), "Barkeep", "Mind your business.").with_next(nid("END")),
        DialogueNode::new(nid("rumor"), "Barkeep", "Folks vanish down there.")
            .with_next(nid("END")),
        DialogueNode::new(nid("secret"), "Barkeep", "There's a second shaft.")
            .with_next(nid("END")),
        DialogueNode::new(nid("END"), "", ""),
    ])
}
