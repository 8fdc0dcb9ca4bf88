// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use nereid_dialogue::model::{Choice, DialogueDocument, DialogueNode, NodeId, TestOutcome};

#[derive(Debug, Clone, Copy)]
pub enum Case {
    Small,
    Medium,
    Large,
}

impl Case {
    pub const ALL: [Case; 3] = [Case::Small, Case::Medium, Case::Large];

    pub fn id(self) -> &'static str {
        match self {
            Case::Small => "small",
            Case::Medium => "medium",
            Case::Large => "large",
        }
    }

    fn node_count(self) -> usize {
        match self {
            Case::Small => 20,
            Case::Medium => 200,
            Case::Large => 2_000,
        }
    }
}

pub fn node_id(index: usize) -> NodeId {
    NodeId::new(format!("n{index:05}")).expect("node id")
}

/// A layered conversation: every node offers three choices; every fourth choice is a skill check
/// with all four outcomes wired. The last node links to `END`.
pub fn document(case: Case) -> DialogueDocument {
    let count = case.node_count();
    let target = |index: usize| {
        if index < count {
            node_id(index)
        } else {
            NodeId::new("END").expect("node id")
        }
    };

    let mut nodes = Vec::with_capacity(count + 1);
    for index in 0..count {
        let mut node = DialogueNode::new(
            node_id(index),
            format!("speaker_{}", index % 7),
            format!("bench line {index:05} with some filler text to label edges"),
        );
        for slot in 0..3 {
            let serial = index * 3 + slot;
            let choice = Choice::new(format!("option {slot} of node {index}"));
            let choice = if serial % 4 == 0 {
                choice
                    .with_test(format!("Skill:{}", serial % 20))
                    .with_outcome(TestOutcome::CriticalFailure, target(index + 1))
                    .with_outcome(TestOutcome::Failure, target(index + 2))
                    .with_outcome(TestOutcome::Success, target(index + 3))
                    .with_outcome(TestOutcome::CriticalSuccess, target(index + 4))
            } else {
                choice.with_target(target(index + slot + 1))
            };
            node = node.with_choice(choice);
        }
        nodes.push(node);
    }
    nodes.push(DialogueNode::new(
        NodeId::new("END").expect("node id"),
        "",
        "",
    ));
    DialogueDocument::new(nodes)
}

pub fn checksum_document(document: &DialogueDocument) -> u64 {
    let mut acc = 0u64;
    for node in &document.nodes {
        acc = acc
            .wrapping_mul(131)
            .wrapping_add(node.id.as_str().len() as u64);
        acc = acc.wrapping_mul(131).wrapping_add(node.choices.len() as u64);
        for choice in &node.choices {
            acc = acc
                .wrapping_mul(131)
                .wrapping_add(u64::from(choice.target_node.is_some()))
                .wrapping_add(u64::from(choice.has_test()));
        }
    }
    acc
}
