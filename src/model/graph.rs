// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The visual graph representation edited by the UI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::document::{DialogueNode, TestOutcome, CURRENT_SCHEMA_VERSION};
use super::identity::{ChoiceKey, Handle};
use super::ids::{EdgeId, NodeId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// True when either axis moved by more than `epsilon`.
    pub fn differs_from(&self, other: &Point, epsilon: f64) -> bool {
        (self.x - other.x).abs() > epsilon || (self.y - other.y).abs() > epsilon
    }
}

/// View-only materialization of a choice's test construct.
#[derive(Debug, Clone, PartialEq)]
pub struct TestNodeData {
    parent_id: NodeId,
    choice_key: ChoiceKey,
    test: String,
    outcomes: [Option<NodeId>; 4],
}

impl TestNodeData {
    pub fn new(parent_id: NodeId, choice_key: ChoiceKey, test: impl Into<String>) -> Self {
        Self {
            parent_id,
            choice_key,
            test: test.into(),
            outcomes: Default::default(),
        }
    }

    pub fn parent_id(&self) -> &NodeId {
        &self.parent_id
    }

    pub fn choice_key(&self) -> &ChoiceKey {
        &self.choice_key
    }

    pub fn test(&self) -> &str {
        &self.test
    }

    pub fn set_test(&mut self, test: impl Into<String>) {
        self.test = test.into();
    }

    pub fn outcome(&self, outcome: TestOutcome) -> Option<&NodeId> {
        self.outcomes[outcome.index()].as_ref()
    }

    pub fn set_outcome(&mut self, outcome: TestOutcome, target: Option<NodeId>) {
        self.outcomes[outcome.index()] = target;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphNodeKind {
    Dialogue(DialogueNode),
    Test(TestNodeData),
    /// Terminal marker. Carries its document record so it reifies unchanged.
    End(DialogueNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    id: NodeId,
    position: Point,
    kind: GraphNodeKind,
}

impl GraphNode {
    /// Wraps a document node, picking `End` or `Dialogue` from its content.
    pub fn from_document(node: DialogueNode, position: Point) -> Self {
        let id = node.id.clone();
        let kind = if node.is_end_marker() {
            GraphNodeKind::End(node)
        } else {
            GraphNodeKind::Dialogue(node)
        };
        Self { id, position, kind }
    }

    pub fn test(id: NodeId, data: TestNodeData, position: Point) -> Self {
        Self {
            id,
            position,
            kind: GraphNodeKind::Test(data),
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    pub fn kind(&self) -> &GraphNodeKind {
        &self.kind
    }

    pub fn is_test(&self) -> bool {
        matches!(self.kind, GraphNodeKind::Test(_))
    }

    pub fn is_end(&self) -> bool {
        matches!(self.kind, GraphNodeKind::End(_))
    }

    /// The persisted record behind a dialogue or end node.
    pub fn document_node(&self) -> Option<&DialogueNode> {
        match &self.kind {
            GraphNodeKind::Dialogue(node) | GraphNodeKind::End(node) => Some(node),
            GraphNodeKind::Test(_) => None,
        }
    }

    pub fn document_node_mut(&mut self) -> Option<&mut DialogueNode> {
        match &mut self.kind {
            GraphNodeKind::Dialogue(node) | GraphNodeKind::End(node) => Some(node),
            GraphNodeKind::Test(_) => None,
        }
    }

    pub fn test_data(&self) -> Option<&TestNodeData> {
        match &self.kind {
            GraphNodeKind::Test(data) => Some(data),
            GraphNodeKind::Dialogue(_) | GraphNodeKind::End(_) => None,
        }
    }

    pub fn test_data_mut(&mut self) -> Option<&mut TestNodeData> {
        match &mut self.kind {
            GraphNodeKind::Test(data) => Some(data),
            GraphNodeKind::Dialogue(_) | GraphNodeKind::End(_) => None,
        }
    }

    /// Re-evaluates `End` vs `Dialogue` after the record changed. Returns whether the kind flipped.
    pub fn reclassify(&mut self) -> bool {
        let kind = std::mem::replace(
            &mut self.kind,
            GraphNodeKind::End(DialogueNode::new(self.id.clone(), "", "")),
        );
        let (kind, flipped) = match kind {
            GraphNodeKind::Dialogue(node) if node.is_end_marker() => {
                (GraphNodeKind::End(node), true)
            }
            GraphNodeKind::End(node) if !node.is_end_marker() => {
                (GraphNodeKind::Dialogue(node), true)
            }
            other => (other, false),
        };
        self.kind = kind;
        flipped
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    id: EdgeId,
    source: NodeId,
    target: NodeId,
    handle: Handle,
    label: Option<String>,
}

impl GraphEdge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        handle: Handle,
        label: Option<String>,
    ) -> Self {
        Self {
            id,
            source,
            target,
            handle,
            label,
        }
    }

    pub fn id(&self) -> &EdgeId {
        &self.id
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label<T: Into<String>>(&mut self, label: Option<T>) {
        self.label = label.map(Into::into);
    }

    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub schema_version: u32,
    /// Opaque viewport state from the layout side-channel.
    pub viewport: Option<serde_json::Value>,
}

impl Default for DocumentMeta {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            viewport: None,
        }
    }
}

/// Persistent editing state: everything undo/redo restores.
///
/// Nodes keep document order (test nodes are appended after their parent's position is known);
/// edges are keyed by their deterministic id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphState {
    nodes: Vec<GraphNode>,
    edges: BTreeMap<EdgeId, GraphEdge>,
    selection: Option<NodeId>,
    meta: DocumentMeta,
}

impl GraphState {
    pub fn new(meta: DocumentMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [GraphNode] {
        &mut self.nodes
    }

    pub fn edges(&self) -> &BTreeMap<EdgeId, GraphEdge> {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut DocumentMeta {
        &mut self.meta
    }

    pub fn selection(&self) -> Option<&NodeId> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: Option<NodeId>) {
        self.selection = selection;
    }

    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.node_index(node_id).is_some()
    }

    pub fn node_index(&self, node_id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == node_id)
    }

    pub fn node(&self, node_id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id() == node_id)
    }

    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|node| node.id() == node_id)
    }

    pub fn document_node(&self, node_id: &NodeId) -> Option<&DialogueNode> {
        self.node(node_id).and_then(GraphNode::document_node)
    }

    pub fn document_node_mut(&mut self, node_id: &NodeId) -> Option<&mut DialogueNode> {
        self.node_mut(node_id).and_then(GraphNode::document_node_mut)
    }

    pub fn push_node(&mut self, node: GraphNode) {
        self.nodes.push(node);
    }

    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<GraphNode> {
        let index = self.node_index(node_id)?;
        Some(self.nodes.remove(index))
    }

    /// Ids of the test nodes derived from `parent_id`'s choices.
    pub fn test_nodes_of(&self, parent_id: &NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| {
                node.test_data()
                    .is_some_and(|data| data.parent_id() == parent_id)
            })
            .map(|node| node.id().clone())
            .collect()
    }

    /// A node exists and can be the target of a stored link (test nodes cannot).
    pub fn is_link_target(&self, node_id: &NodeId) -> bool {
        self.node(node_id).is_some_and(|node| !node.is_test())
    }

    pub fn edge(&self, edge_id: &EdgeId) -> Option<&GraphEdge> {
        self.edges.get(edge_id)
    }

    pub fn edge_mut(&mut self, edge_id: &EdgeId) -> Option<&mut GraphEdge> {
        self.edges.get_mut(edge_id)
    }

    pub fn insert_edge(&mut self, edge: GraphEdge) -> Option<GraphEdge> {
        self.edges.insert(edge.id().clone(), edge)
    }

    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Option<GraphEdge> {
        self.edges.remove(edge_id)
    }

    pub fn edges_touching(&self, node_id: &NodeId) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|edge| edge.touches(node_id))
            .map(|edge| edge.id().clone())
            .collect()
    }

    pub fn edges_from<'a>(&'a self, node_id: &'a NodeId) -> impl Iterator<Item = &'a GraphEdge> {
        self.edges
            .values()
            .filter(move |edge| edge.source() == node_id)
    }

    pub fn inbound_edge_count(&self, node_id: &NodeId) -> usize {
        self.edges
            .values()
            .filter(|edge| edge.target() == node_id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::{GraphNode, GraphNodeKind, Point};
    use crate::model::{Choice, DialogueNode, NodeId};

    fn nid(value: &str) -> NodeId {
        NodeId::new(value).expect("node id")
    }

    #[test]
    fn point_epsilon_comparison() {
        let a = Point::new(10.0, 10.0);
        assert!(!a.differs_from(&Point::new(10.2, 9.9), 0.5));
        assert!(a.differs_from(&Point::new(10.6, 10.0), 0.5));
        assert!(a.differs_from(&Point::new(10.0, 8.0), 0.5));
    }

    #[test]
    fn reclassify_flips_between_end_and_dialogue() {
        let mut node = GraphNode::from_document(
            DialogueNode::new(nid("END"), "", "The end."),
            Point::default(),
        );
        assert!(node.is_end());

        node.document_node_mut()
            .expect("document node")
            .choices
            .push(Choice::new("again?"));
        assert!(node.reclassify());
        assert!(matches!(node.kind(), GraphNodeKind::Dialogue(_)));
        assert_eq!(node.document_node().map(|n| n.line.as_str()), Some("The end."));

        node.document_node_mut().expect("document node").choices.clear();
        assert!(node.reclassify());
        assert!(node.is_end());
        assert!(!node.reclassify());
    }
}
