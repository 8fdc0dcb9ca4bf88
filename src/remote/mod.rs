// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Seams to the collaborators that live outside the engine.
//!
//! The engine never performs network I/O. A host implements these traits over whatever transport
//! it uses and hands them to the [`Editor`](crate::editor::Editor) per call.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;
use crate::model::{DialogueDocument, DocumentId, GraphEdge, GraphNode, GraphState, NodeId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
}

/// Structural or narrative annotation returned by a validator.
///
/// Stored as transient UI state; it never alters the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            kind: kind.into(),
            node_id: None,
            message: message.into(),
            severity,
        }
    }

    pub fn on_node(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAck {
    pub ack_seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The collaborator could not be reached.
    Unavailable { reason: String },
    /// The collaborator answered with a refusal.
    Rejected { reason: String },
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "remote service unavailable: {reason}"),
            Self::Rejected { reason } => write!(f, "remote service rejected the request: {reason}"),
        }
    }
}

impl std::error::Error for RemoteError {}

pub trait Validator {
    fn validate(
        &self,
        nodes: &[GraphNode],
        edges: &[GraphEdge],
    ) -> Result<Vec<ValidationIssue>, RemoteError>;
}

pub trait LayoutService {
    fn arrange(&self, state: &GraphState) -> Result<Layout, RemoteError>;
}

pub trait PersistenceEndpoint {
    /// Saves the reified document. `seq` is the local sequence number the ack must echo back.
    fn save(
        &self,
        doc_id: &DocumentId,
        document: &DialogueDocument,
        seq: u64,
    ) -> Result<SaveAck, RemoteError>;
}
