// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashMap;

use crate::model::{
    find_choice_index, DialogueDocument, DialogueNode, GraphNode, GraphState, Handle, NodeId,
};

/// Rebuilds the canonical document from the graph.
///
/// Records are taken in graph order with every edge-backed link field cleared, then the links are
/// replayed from the edges. Test nodes contribute their outcome edges to the parent choice and
/// nothing else. A `nextNode` shadowed by choices has no edge and is carried over as stored.
pub fn reify(state: &GraphState) -> DialogueDocument {
    let mut nodes = state
        .nodes()
        .iter()
        .filter_map(GraphNode::document_node)
        .cloned()
        .map(cleared_links)
        .collect::<Vec<_>>();
    let index = nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.id.clone(), position))
        .collect::<HashMap<NodeId, usize>>();

    for edge in state.edges().values() {
        match edge.handle() {
            Handle::Choice(key) => {
                if state.node(edge.target()).is_some_and(GraphNode::is_test) {
                    continue;
                }
                let Some(record) = index.get(edge.source()).map(|at| &mut nodes[*at]) else {
                    continue;
                };
                let Some(choice_index) = find_choice_index(&record.choices, key) else {
                    continue;
                };
                let choice = &mut record.choices[choice_index];
                if !choice.has_test() {
                    choice.target_node = Some(edge.target().clone());
                }
            }
            Handle::Outcome(outcome) => {
                let Some(view) = state.node(edge.source()).and_then(GraphNode::test_data) else {
                    continue;
                };
                let Some(record) = index.get(view.parent_id()).map(|at| &mut nodes[*at]) else {
                    continue;
                };
                let Some(choice_index) = find_choice_index(&record.choices, view.choice_key())
                else {
                    continue;
                };
                let choice = &mut record.choices[choice_index];
                if choice.has_test() {
                    choice.set_outcome(*outcome, Some(edge.target().clone()));
                }
            }
            Handle::Next => {
                let Some(record) = index.get(edge.source()).map(|at| &mut nodes[*at]) else {
                    continue;
                };
                if record.choices.is_empty() {
                    record.next_node = Some(edge.target().clone());
                }
            }
        }
    }

    DialogueDocument {
        schema_version: state.meta().schema_version,
        nodes,
    }
}

fn cleared_links(mut node: DialogueNode) -> DialogueNode {
    if node.choices.is_empty() {
        node.next_node = None;
    }
    for choice in &mut node.choices {
        choice.target_node = None;
        choice.clear_outcomes();
    }
    node
}
