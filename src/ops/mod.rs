// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Mutation operations for the dialogue graph.
//!
//! Operations are applied transactionally: either every op in a batch succeeds and the state is
//! replaced, or the state is left untouched. Each application produces a coarse delta the UI can
//! use to refresh derived state.

use std::collections::HashSet;
use std::fmt;

use crate::config::GraphSettings;
use crate::layout::stacked_position;
use crate::model::{
    choice_key, duplicate_choice_key, find_choice_index, is_reserved_node_id, Choice, DialogueNode,
    EdgeId, GraphNode, GraphState, Handle, NodeId, Point, TestNodeData, TestOutcome,
};
use crate::projection::derived::{remove_edge, sync_source_from_view};
use crate::projection::links::{reconcile_node, reconcile_referrers};

#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    AddNode {
        node: DialogueNode,
        /// `None` places the node on the fallback stack.
        position: Option<Point>,
    },
    UpdateNode {
        node_id: NodeId,
        patch: NodePatch,
    },
    DeleteNode {
        node_id: NodeId,
    },
    Connect {
        source_id: NodeId,
        target_id: NodeId,
        /// Which choice of a dialogue source the link belongs to.
        choice_index: Option<usize>,
        /// Handle name as sent by the UI: an outcome (`"failure"`), `"next"`, `"choice-<key>"`, or
        /// `None` to infer it from the source and `choice_index`.
        handle: Option<String>,
    },
    Disconnect {
        edge_id: EdgeId,
    },
    UpdatePosition {
        node_id: NodeId,
        position: Point,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodePatch {
    Dialogue(DialoguePatch),
    Test(TestPatch),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialoguePatch {
    pub speaker: Option<String>,
    pub line: Option<String>,
    pub choices: Option<Vec<Choice>>,
    pub next_node: Option<Option<NodeId>>,
}

/// Edit of a test node. `Some(None)` clears a field; clearing `test` removes the whole construct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestPatch {
    pub test: Option<Option<String>>,
    pub critical_failure_node: Option<Option<NodeId>>,
    pub failure_node: Option<Option<NodeId>>,
    pub success_node: Option<Option<NodeId>>,
    pub critical_success_node: Option<Option<NodeId>>,
}

impl TestPatch {
    pub fn with_test(mut self, test: Option<String>) -> Self {
        self.test = Some(test);
        self
    }

    pub fn with_outcome(mut self, outcome: TestOutcome, target: Option<NodeId>) -> Self {
        *self.outcome_slot(outcome) = Some(target);
        self
    }

    pub fn outcome(&self, outcome: TestOutcome) -> Option<&Option<NodeId>> {
        match outcome {
            TestOutcome::CriticalFailure => self.critical_failure_node.as_ref(),
            TestOutcome::Failure => self.failure_node.as_ref(),
            TestOutcome::Success => self.success_node.as_ref(),
            TestOutcome::CriticalSuccess => self.critical_success_node.as_ref(),
        }
    }

    fn outcome_slot(&mut self, outcome: TestOutcome) -> &mut Option<Option<NodeId>> {
        match outcome {
            TestOutcome::CriticalFailure => &mut self.critical_failure_node,
            TestOutcome::Failure => &mut self.failure_node,
            TestOutcome::Success => &mut self.success_node,
            TestOutcome::CriticalSuccess => &mut self.critical_success_node,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub node_count: usize,
    pub edge_count: usize,
    pub changed: bool,
    pub delta: Delta,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementRef {
    Node(NodeId),
    Edge(EdgeId),
}

/// Minimal delta describing which graph elements changed as the result of applying ops.
///
/// This is intentionally coarse: it reports only added/removed/updated element refs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delta {
    pub added: Vec<ElementRef>,
    pub removed: Vec<ElementRef>,
    pub updated: Vec<ElementRef>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeltaBuilder {
    added: HashSet<ElementRef>,
    removed: HashSet<ElementRef>,
    updated: HashSet<ElementRef>,
}

impl DeltaBuilder {
    pub(crate) fn record_added(&mut self, element: ElementRef) {
        // Re-adding something removed earlier in the same batch nets out to an update.
        if self.removed.remove(&element) {
            self.updated.insert(element);
            return;
        }
        self.updated.remove(&element);
        self.added.insert(element);
    }

    pub(crate) fn record_removed(&mut self, element: ElementRef) {
        self.updated.remove(&element);
        if self.added.remove(&element) {
            return;
        }
        self.removed.insert(element);
    }

    pub(crate) fn record_updated(&mut self, element: ElementRef) {
        if self.added.contains(&element) || self.removed.contains(&element) {
            return;
        }
        self.updated.insert(element);
    }

    pub(crate) fn finish(self) -> Delta {
        let mut added = self.added.into_iter().collect::<Vec<_>>();
        let mut removed = self.removed.into_iter().collect::<Vec<_>>();
        let mut updated = self.updated.into_iter().collect::<Vec<_>>();

        added.sort();
        removed.sort();
        updated.sort();

        Delta {
            added,
            removed,
            updated,
        }
    }
}

/// Applies `ops` in order. On error `state` is left exactly as it was.
pub fn apply_ops(
    state: &mut GraphState,
    ops: &[GraphOp],
    settings: &GraphSettings,
) -> Result<ApplyResult, ApplyError> {
    if ops.is_empty() {
        return Ok(ApplyResult {
            node_count: state.node_count(),
            edge_count: state.edge_count(),
            changed: false,
            delta: Delta::default(),
        });
    }

    let mut next = state.clone();
    let mut delta = DeltaBuilder::default();
    for op in ops {
        apply_op(&mut next, op, settings, &mut delta)?;
    }

    let delta = delta.finish();
    let changed = !delta.is_empty() || next.selection() != state.selection();
    *state = next;
    tracing::debug!(
        ops = ops.len(),
        added = delta.added.len(),
        removed = delta.removed.len(),
        updated = delta.updated.len(),
        "applied graph ops"
    );

    Ok(ApplyResult {
        node_count: state.node_count(),
        edge_count: state.edge_count(),
        changed,
        delta,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKindTag {
    Dialogue,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    NotFound {
        kind: ElementKind,
        id: String,
    },
    AlreadyExists {
        node_id: NodeId,
    },
    /// Document node ids may not use the derived test node id shape.
    ReservedId {
        node_id: NodeId,
    },
    KindMismatch {
        node_id: NodeId,
        node_kind: NodeKindTag,
        patch_kind: NodeKindTag,
    },
    InvalidHandle {
        source_id: NodeId,
        handle: String,
        reason: &'static str,
    },
    InvalidTarget {
        target_id: NodeId,
    },
    ChoiceNotFound {
        node_id: NodeId,
        choice: String,
    },
    /// Two choices of one node resolve to the same key.
    DuplicateChoiceId {
        node_id: NodeId,
        choice: String,
    },
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind:?} not found (id={id})"),
            Self::AlreadyExists { node_id } => write!(f, "node already exists (id={node_id})"),
            Self::ReservedId { node_id } => {
                write!(f, "node id {node_id} is reserved for derived test nodes")
            }
            Self::KindMismatch {
                node_id,
                node_kind,
                patch_kind,
            } => write!(
                f,
                "patch kind mismatch (node={node_id}, node_kind={node_kind:?}, patch_kind={patch_kind:?})"
            ),
            Self::InvalidHandle {
                source_id,
                handle,
                reason,
            } => write!(f, "invalid handle '{handle}' on {source_id}: {reason}"),
            Self::InvalidTarget { target_id } => {
                write!(f, "node {target_id} cannot be a link target")
            }
            Self::ChoiceNotFound { node_id, choice } => {
                write!(f, "choice {choice} not found on node {node_id}")
            }
            Self::DuplicateChoiceId { node_id, choice } => {
                write!(f, "node {node_id} has more than one choice with id {choice}")
            }
        }
    }
}

impl std::error::Error for ApplyError {}

// Extracted per-op implementation.
include!("ops_impl.rs");
