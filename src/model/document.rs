// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The canonical branching-dialogue document.
//!
//! This is the persisted format and the single source of truth. Graph-only constructs (test
//! nodes, positions, edges) never appear here.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ids::NodeId;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Reserved id of the conventional terminal node.
pub const END_NODE_ID: &str = "END";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialogueDocument {
    pub schema_version: u32,
    pub nodes: Vec<DialogueNode>,
}

impl Default for DialogueDocument {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            nodes: Vec::new(),
        }
    }
}

impl DialogueDocument {
    pub fn new(nodes: Vec<DialogueNode>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            nodes,
        }
    }

    pub fn node(&self, node_id: &str) -> Option<&DialogueNode> {
        self.nodes.iter().find(|node| node.id.as_str() == node_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DialogueNode {
    pub id: NodeId,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub line: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_node: Option<NodeId>,
    /// Keys this crate does not interpret, carried through verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DialogueNode {
    pub fn new(id: NodeId, speaker: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            id,
            speaker: speaker.into(),
            line: line.into(),
            choices: Vec::new(),
            next_node: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_next(mut self, next_node: NodeId) -> Self {
        self.next_node = Some(next_node);
        self
    }

    /// Whether this node projects as the terminal `End` marker rather than a dialogue node.
    pub fn is_end_marker(&self) -> bool {
        self.id.as_str() == END_NODE_ID && self.choices.is_empty() && self.next_node.is_none()
    }

    /// Returns true if any stored link (`nextNode`, `targetNode`, `test*Node`) points at `target`.
    pub fn references(&self, target: &NodeId) -> bool {
        self.next_node.as_ref() == Some(target)
            || self.choices.iter().any(|choice| choice.references(target))
    }

    /// Clears every stored link pointing at `target`. Returns whether anything was cleared.
    pub fn clear_references_to(&mut self, target: &NodeId) -> bool {
        let mut cleared = false;
        if self.next_node.as_ref() == Some(target) {
            self.next_node = None;
            cleared = true;
        }
        for choice in &mut self.choices {
            cleared |= choice.clear_references_to(target);
        }
        cleared
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestOutcome {
    CriticalFailure,
    Failure,
    Success,
    CriticalSuccess,
}

impl TestOutcome {
    pub const ALL: [TestOutcome; 4] = [
        TestOutcome::CriticalFailure,
        TestOutcome::Failure,
        TestOutcome::Success,
        TestOutcome::CriticalSuccess,
    ];

    pub fn index(self) -> usize {
        match self {
            Self::CriticalFailure => 0,
            Self::Failure => 1,
            Self::Success => 2,
            Self::CriticalSuccess => 3,
        }
    }

    /// Handle token used in edge ids and by callers naming a connection handle.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CriticalFailure => "criticalFailure",
            Self::Failure => "failure",
            Self::Success => "success",
            Self::CriticalSuccess => "criticalSuccess",
        }
    }

    /// Accepts the handle token plus the kebab/snake spellings UIs tend to send.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "criticalFailure" | "critical-failure" | "critical_failure" => {
                Some(Self::CriticalFailure)
            }
            "failure" => Some(Self::Failure),
            "success" => Some(Self::Success),
            "criticalSuccess" | "critical-success" | "critical_success" => {
                Some(Self::CriticalSuccess)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_node: Option<NodeId>,
    /// Skill-check descriptor, e.g. `"Int:8"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_critical_failure_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_failure_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_success_node: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_critical_success_node: Option<NodeId>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Choice {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target_node = Some(target);
        self
    }

    pub fn with_test(mut self, test: impl Into<String>) -> Self {
        self.test = Some(test.into());
        self
    }

    pub fn with_outcome(mut self, outcome: TestOutcome, target: NodeId) -> Self {
        self.set_outcome(outcome, Some(target));
        self
    }

    pub fn with_choice_id(mut self, choice_id: impl Into<String>) -> Self {
        self.choice_id = Some(choice_id.into());
        self
    }

    pub fn has_test(&self) -> bool {
        self.test.is_some()
    }

    pub fn outcome(&self, outcome: TestOutcome) -> Option<&NodeId> {
        match outcome {
            TestOutcome::CriticalFailure => self.test_critical_failure_node.as_ref(),
            TestOutcome::Failure => self.test_failure_node.as_ref(),
            TestOutcome::Success => self.test_success_node.as_ref(),
            TestOutcome::CriticalSuccess => self.test_critical_success_node.as_ref(),
        }
    }

    pub fn set_outcome(&mut self, outcome: TestOutcome, target: Option<NodeId>) {
        let slot = match outcome {
            TestOutcome::CriticalFailure => &mut self.test_critical_failure_node,
            TestOutcome::Failure => &mut self.test_failure_node,
            TestOutcome::Success => &mut self.test_success_node,
            TestOutcome::CriticalSuccess => &mut self.test_critical_success_node,
        };
        *slot = target;
    }

    pub fn clear_outcomes(&mut self) {
        for outcome in TestOutcome::ALL {
            self.set_outcome(outcome, None);
        }
    }

    /// Drops the test construct entirely: descriptor and all four outcome targets.
    pub fn clear_test(&mut self) {
        self.test = None;
        self.clear_outcomes();
    }

    /// Enforces that `targetNode` and `test` are never both set. `test` wins.
    pub fn normalize_exclusive(&mut self) -> bool {
        if self.test.is_some() && self.target_node.is_some() {
            self.target_node = None;
            return true;
        }
        false
    }

    pub fn references(&self, target: &NodeId) -> bool {
        self.target_node.as_ref() == Some(target)
            || TestOutcome::ALL
                .iter()
                .any(|outcome| self.outcome(*outcome) == Some(target))
    }

    pub fn clear_references_to(&mut self, target: &NodeId) -> bool {
        let mut cleared = false;
        if self.target_node.as_ref() == Some(target) {
            self.target_node = None;
            cleared = true;
        }
        for outcome in TestOutcome::ALL {
            if self.outcome(outcome) == Some(target) {
                self.set_outcome(outcome, None);
                cleared = true;
            }
        }
        cleared
    }
}
