// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Core data model.
//!
//! The canonical dialogue document, the visual graph derived from it, and the identity rules that
//! tie the two together.

pub mod document;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod graph;
pub mod identity;
pub mod ids;

pub use document::{
    Choice, DialogueDocument, DialogueNode, TestOutcome, CURRENT_SCHEMA_VERSION, END_NODE_ID,
};
pub use graph::{
    DocumentMeta, GraphEdge, GraphNode, GraphNodeKind, GraphState, Point, TestNodeData,
};
pub use identity::{
    choice_key, duplicate_choice_key, edge_id, find_choice_index, is_reserved_node_id,
    parse_test_node_id, test_node_id, ChoiceKey, Handle,
};
pub use ids::{DocumentId, EdgeId, Id, IdError, NodeId};
