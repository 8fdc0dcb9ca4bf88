// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeSet;

use smallvec::SmallVec;

use crate::config::GraphSettings;
use crate::model::{choice_key, ChoiceKey, EdgeId, GraphNode, GraphState, Handle, NodeId};
use crate::ops::{DeltaBuilder, ElementRef};

use super::derived::{ensure_edge, remove_edge, remove_view, sync_view_from_source};
use super::preview_label;

/// Brings every edge and test node owned by `node_id` in line with its document record.
///
/// Idempotent: reconciling an already consistent node records nothing in `delta`.
pub(crate) fn reconcile_node(
    state: &mut GraphState,
    settings: &GraphSettings,
    node_id: &NodeId,
    delta: &mut DeltaBuilder,
) {
    let Some(node) = state.node_mut(node_id) else {
        return;
    };
    let Some(record) = node.document_node_mut() else {
        return;
    };
    let mut normalized = false;
    for choice in &mut record.choices {
        normalized |= choice.normalize_exclusive();
    }
    if normalized {
        tracing::debug!("{}: choice had both targetNode and test; kept test", node_id);
    }
    if node.reclassify() || normalized {
        delta.record_updated(ElementRef::Node(node_id.clone()));
    }

    let Some(record) = state.document_node(node_id).cloned() else {
        return;
    };
    let keys = record
        .choices
        .iter()
        .enumerate()
        .map(|(index, choice)| choice_key(choice, index))
        .collect::<BTreeSet<ChoiceKey>>();
    if keys.len() != record.choices.len() {
        tracing::warn!("{}: duplicate choice ids; later choices shadow earlier ones", node_id);
    }

    // Views and links of choices that no longer exist.
    for view_id in state.test_nodes_of(node_id) {
        let orphaned = state
            .node(&view_id)
            .and_then(GraphNode::test_data)
            .is_some_and(|data| !keys.contains(data.choice_key()));
        if orphaned {
            remove_view(state, &view_id, delta);
        }
    }
    let stale = state
        .edges_from(node_id)
        .filter(|edge| {
            edge.handle()
                .choice_key()
                .is_some_and(|key| !keys.contains(key))
        })
        .map(|edge| edge.id().clone())
        .collect::<Vec<EdgeId>>();
    for edge_id in stale {
        remove_edge(state, &edge_id, delta);
    }

    for (index, choice) in record.choices.iter().enumerate() {
        sync_view_from_source(state, settings, node_id, index, delta);
        if choice.has_test() {
            continue;
        }
        let desired = choice
            .target_node
            .as_ref()
            .filter(|target| state.is_link_target(target))
            .cloned();
        let handle = Handle::Choice(choice_key(choice, index));
        let label = preview_label(&choice.text, settings.label_preview_chars);
        retarget(state, node_id, &handle, desired, label, delta);
    }

    let desired_next = record
        .next_node
        .as_ref()
        .filter(|_| record.choices.is_empty())
        .filter(|target| state.is_link_target(target))
        .cloned();
    retarget(state, node_id, &Handle::Next, desired_next, None, delta);
}

/// Re-reconciles every node whose stored links mention `target_id`.
pub(crate) fn reconcile_referrers(
    state: &mut GraphState,
    settings: &GraphSettings,
    target_id: &NodeId,
    delta: &mut DeltaBuilder,
) {
    let referrers = state
        .nodes()
        .iter()
        .filter(|node| node.id() != target_id)
        .filter(|node| {
            node.document_node()
                .is_some_and(|record| record.references(target_id))
        })
        .map(|node| node.id().clone())
        .collect::<Vec<_>>();
    for referrer in referrers {
        reconcile_node(state, settings, &referrer, delta);
    }
}

fn retarget(
    state: &mut GraphState,
    source: &NodeId,
    handle: &Handle,
    desired: Option<NodeId>,
    label: Option<String>,
    delta: &mut DeltaBuilder,
) {
    let mismatched = state
        .edges_from(source)
        .filter(|edge| edge.handle() == handle && Some(edge.target()) != desired.as_ref())
        .map(|edge| edge.id().clone())
        .collect::<SmallVec<[EdgeId; 2]>>();
    for edge_id in mismatched {
        remove_edge(state, &edge_id, delta);
    }
    if let Some(target) = desired {
        ensure_edge(state, source, handle, &target, label, delta);
    }
}

#[cfg(test)]
mod tests {
    use super::reconcile_node;
    use crate::config::GraphSettings;
    use crate::model::fixtures::{nid, tavern_document};
    use crate::model::{edge_id, ChoiceKey, Handle};
    use crate::ops::DeltaBuilder;
    use crate::projection::project;

    #[test]
    fn retargeting_a_plain_choice_swaps_its_edge() {
        let settings = GraphSettings::default();
        let mut state = project(&tavern_document(), None, &settings);
        let handle = Handle::Choice(ChoiceKey::positional(0));

        state
            .document_node_mut(&nid("greet"))
            .expect("greet")
            .choices[0]
            .target_node = Some(nid("rumor"));
        let mut delta = DeltaBuilder::default();
        reconcile_node(&mut state, &settings, &nid("greet"), &mut delta);

        assert!(state
            .edge(&edge_id(&nid("greet"), &handle, &nid("ale")))
            .is_none());
        let edge = state
            .edge(&edge_id(&nid("greet"), &handle, &nid("rumor")))
            .expect("new edge");
        assert_eq!(edge.label(), Some("Ale, please."));
    }

    #[test]
    fn next_edge_is_suppressed_while_choices_exist() {
        let settings = GraphSettings::default();
        let mut state = project(&tavern_document(), None, &settings);
        let next = edge_id(&nid("ale"), &Handle::Next, &nid("END"));
        assert!(state.edge(&next).is_some());

        state
            .document_node_mut(&nid("ale"))
            .expect("ale")
            .choices
            .push(crate::model::Choice::new("Pay"));
        let mut delta = DeltaBuilder::default();
        reconcile_node(&mut state, &settings, &nid("ale"), &mut delta);

        assert!(state.edge(&next).is_none());
        assert_eq!(
            state.document_node(&nid("ale")).and_then(|n| n.next_node.clone()),
            Some(nid("END"))
        );
    }
}
