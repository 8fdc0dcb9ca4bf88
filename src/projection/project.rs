// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashSet;

use crate::config::GraphSettings;
use crate::layout::{stacked_position, Layout};
use crate::model::{
    is_reserved_node_id, DialogueDocument, DialogueNode, DocumentMeta, GraphNode, GraphState,
    NodeId, TestOutcome,
};
use crate::ops::DeltaBuilder;

use super::links::reconcile_node;

/// Builds the visual graph for `document`.
///
/// Positions come from `layout` when it has one for a node, otherwise from the fallback stack
/// (document nodes) or from the parent's position (test nodes). References to missing nodes are
/// kept in the records but produce no edge.
pub fn project(
    document: &DialogueDocument,
    layout: Option<&Layout>,
    settings: &GraphSettings,
) -> GraphState {
    let mut state = GraphState::new(DocumentMeta {
        schema_version: document.schema_version,
        viewport: layout.and_then(|layout| layout.viewport.clone()),
    });

    let mut seen = HashSet::with_capacity(document.nodes.len());
    for node in &document.nodes {
        if is_reserved_node_id(&node.id) {
            tracing::warn!("node id {} is reserved for test nodes; skipping it", node.id);
            continue;
        }
        if !seen.insert(&node.id) {
            tracing::warn!("duplicate node id {} in document; keeping the first", node.id);
            continue;
        }
        let index = state.node_count();
        let position = layout
            .and_then(|layout| layout.position(&node.id))
            .unwrap_or_else(|| stacked_position(settings, index));
        state.push_node(GraphNode::from_document(node.clone(), position));
    }

    let document_ids = state
        .nodes()
        .iter()
        .map(|node| node.id().clone())
        .collect::<Vec<_>>();
    let mut delta = DeltaBuilder::default();
    for node_id in &document_ids {
        reconcile_node(&mut state, settings, node_id, &mut delta);
    }

    if let Some(layout) = layout {
        for node in state.nodes_mut().iter_mut().filter(|node| node.is_test()) {
            if let Some(position) = layout.position(node.id()) {
                node.set_position(position);
            }
        }
    }

    for node_id in &document_ids {
        if let Some(record) = state.document_node(node_id) {
            for target in dangling_targets(&state, record) {
                tracing::warn!("{}: dropping link to missing node {}", node_id, target);
            }
        }
    }

    tracing::debug!(
        nodes = state.node_count(),
        edges = state.edge_count(),
        "projected document"
    );
    state
}

fn dangling_targets<'a>(state: &GraphState, record: &'a DialogueNode) -> Vec<&'a NodeId> {
    let choice_links = record.choices.iter().flat_map(|choice| {
        std::iter::once(choice.target_node.as_ref())
            .chain(
                TestOutcome::ALL
                    .into_iter()
                    .map(move |outcome| choice.outcome(outcome)),
            )
            .flatten()
    });
    record
        .next_node
        .iter()
        .chain(choice_links)
        .filter(|target| !state.is_link_target(target))
        .collect()
}
