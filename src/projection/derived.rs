// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Test-node synchronization: the only code allowed to write across the view/source boundary.
//!
//! `sync_view_from_source` re-derives a test node from its choice. `sync_source_from_view` turns a
//! view edit into a [`SourceUpdate`], which can only be consumed by writing the choice back and
//! re-deriving the view once. A mutation therefore redirects at most once and never ping-pongs.

use smallvec::SmallVec;

use crate::config::GraphSettings;
use crate::layout::test_node_position;
use crate::model::{
    choice_key, edge_id, test_node_id, Choice, EdgeId, GraphEdge, GraphNode, GraphState, Handle,
    NodeId, TestNodeData, TestOutcome,
};
use crate::ops::{DeltaBuilder, ElementRef, TestPatch};

use super::preview_label;

/// Creates, updates or deletes the test node of `parent_id`'s `choice_index`-th choice so it
/// mirrors the choice, and reconciles the choice link and the four outcome edges.
pub(crate) fn sync_view_from_source(
    state: &mut GraphState,
    settings: &GraphSettings,
    parent_id: &NodeId,
    choice_index: usize,
    delta: &mut DeltaBuilder,
) {
    let Some(choice) = state
        .document_node(parent_id)
        .and_then(|node| node.choices.get(choice_index))
        .cloned()
    else {
        return;
    };

    let key = choice_key(&choice, choice_index);
    let view_id = test_node_id(parent_id, &key);

    let Some(test) = choice.test.as_deref() else {
        remove_view(state, &view_id, delta);
        return;
    };

    upsert_view(state, settings, parent_id, choice_index, &view_id, &choice, test, delta);

    let link = Handle::Choice(key);
    let label = preview_label(&choice.text, settings.label_preview_chars);
    ensure_edge(state, parent_id, &link, &view_id, label, delta);

    // A choice that just gained a test loses its direct target edge.
    let stale = state
        .edges_from(parent_id)
        .filter(|edge| edge.handle() == &link && edge.target() != &view_id)
        .map(|edge| edge.id().clone())
        .collect::<SmallVec<[EdgeId; 2]>>();
    for edge_id in stale {
        remove_edge(state, &edge_id, delta);
    }

    for outcome in TestOutcome::ALL {
        let handle = Handle::Outcome(outcome);
        let desired = choice
            .outcome(outcome)
            .filter(|target| state.is_link_target(target))
            .cloned();

        let mismatched = state
            .edges_from(&view_id)
            .filter(|edge| edge.handle() == &handle && Some(edge.target()) != desired.as_ref())
            .map(|edge| edge.id().clone())
            .collect::<SmallVec<[EdgeId; 4]>>();
        for edge_id in mismatched {
            remove_edge(state, &edge_id, delta);
        }

        if let Some(target) = desired {
            ensure_edge(state, &view_id, &handle, &target, None, delta);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn upsert_view(
    state: &mut GraphState,
    settings: &GraphSettings,
    parent_id: &NodeId,
    choice_index: usize,
    view_id: &NodeId,
    choice: &Choice,
    test: &str,
    delta: &mut DeltaBuilder,
) {
    let key = choice_key(choice, choice_index);
    let mut data = TestNodeData::new(parent_id.clone(), key, test);
    for outcome in TestOutcome::ALL {
        data.set_outcome(outcome, choice.outcome(outcome).cloned());
    }

    if let Some(existing) = state.node_mut(view_id) {
        let Some(current) = existing.test_data_mut() else {
            tracing::warn!(
                "node {} collides with the derived test node id; leaving it untouched",
                view_id
            );
            return;
        };
        if *current != data {
            *current = data;
            delta.record_updated(ElementRef::Node(view_id.clone()));
        }
        return;
    }

    let parent_position = state
        .node(parent_id)
        .map(GraphNode::position)
        .unwrap_or_default();
    let position = test_node_position(settings, parent_position, choice_index);
    state.push_node(GraphNode::test(view_id.clone(), data, position));
    tracing::debug!("derived test node {}", view_id);
    delta.record_added(ElementRef::Node(view_id.clone()));
}

/// Removes a test node and every edge touching it. Selection falls back to the parent.
pub(crate) fn remove_view(state: &mut GraphState, view_id: &NodeId, delta: &mut DeltaBuilder) {
    let Some(parent_id) = state
        .node(view_id)
        .and_then(GraphNode::test_data)
        .map(|data| data.parent_id().clone())
    else {
        return;
    };

    for edge_id in state.edges_touching(view_id) {
        remove_edge(state, &edge_id, delta);
    }
    state.remove_node(view_id);
    tracing::debug!("removed test node {}", view_id);
    delta.record_removed(ElementRef::Node(view_id.clone()));

    if state.selection() == Some(view_id) {
        state.set_selection(Some(parent_id));
    }
}

/// Builds the choice that results from applying `patch` to the view, on top of the parent's
/// current choice. Text, condition and other choice fields are left untouched.
pub(crate) fn sync_source_from_view(
    view: &TestNodeData,
    patch: &TestPatch,
    choice_index: usize,
    existing_choice: &Choice,
) -> SourceUpdate {
    let mut choice = existing_choice.clone();
    choice.test = Some(view.test().to_owned());
    for outcome in TestOutcome::ALL {
        choice.set_outcome(outcome, view.outcome(outcome).cloned());
    }

    if let Some(test) = &patch.test {
        choice.test = test.clone();
    }
    for outcome in TestOutcome::ALL {
        if let Some(target) = patch.outcome(outcome) {
            choice.set_outcome(outcome, target.clone());
        }
    }

    if choice.test.is_some() {
        choice.target_node = None;
    } else {
        choice.clear_outcomes();
    }

    SourceUpdate {
        parent_id: view.parent_id().clone(),
        choice_index,
        choice,
    }
}

/// A choice rewritten from its view, waiting to be committed.
#[must_use = "a source update must be applied to keep the view consistent"]
#[derive(Debug)]
pub(crate) struct SourceUpdate {
    parent_id: NodeId,
    choice_index: usize,
    choice: Choice,
}

impl SourceUpdate {
    pub(crate) fn parent_id(&self) -> &NodeId {
        &self.parent_id
    }

    /// Writes the choice into the parent record and re-derives the view from it.
    pub(crate) fn apply(
        self,
        state: &mut GraphState,
        settings: &GraphSettings,
        delta: &mut DeltaBuilder,
    ) {
        let Some(slot) = state
            .document_node_mut(&self.parent_id)
            .and_then(|node| node.choices.get_mut(self.choice_index))
        else {
            return;
        };
        if *slot != self.choice {
            *slot = self.choice;
            delta.record_updated(ElementRef::Node(self.parent_id.clone()));
        }
        sync_view_from_source(state, settings, &self.parent_id, self.choice_index, delta);
    }
}

pub(crate) fn ensure_edge(
    state: &mut GraphState,
    source: &NodeId,
    handle: &Handle,
    target: &NodeId,
    label: Option<String>,
    delta: &mut DeltaBuilder,
) {
    let id = edge_id(source, handle, target);
    if let Some(existing) = state.edge_mut(&id) {
        if existing.label() != label.as_deref() {
            existing.set_label(label);
            delta.record_updated(ElementRef::Edge(id));
        }
        return;
    }
    state.insert_edge(GraphEdge::new(
        id.clone(),
        source.clone(),
        target.clone(),
        handle.clone(),
        label,
    ));
    delta.record_added(ElementRef::Edge(id));
}

pub(crate) fn remove_edge(state: &mut GraphState, edge_id: &EdgeId, delta: &mut DeltaBuilder) {
    if state.remove_edge(edge_id).is_some() {
        delta.record_removed(ElementRef::Edge(edge_id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::{sync_source_from_view, sync_view_from_source};
    use crate::config::GraphSettings;
    use crate::model::fixtures::{nid, skill_check_document};
    use crate::model::{test_node_id, ChoiceKey, TestOutcome};
    use crate::ops::{DeltaBuilder, TestPatch};
    use crate::projection::project;

    #[test]
    fn clearing_test_removes_view_and_its_edges() {
        let settings = GraphSettings::default();
        let mut state = project(&skill_check_document(), None, &settings);
        let view_id = test_node_id(&nid("START"), &ChoiceKey::positional(0));
        state.set_selection(Some(view_id.clone()));

        state
            .document_node_mut(&nid("START"))
            .expect("start")
            .choices[0]
            .clear_test();
        let mut delta = DeltaBuilder::default();
        sync_view_from_source(&mut state, &settings, &nid("START"), 0, &mut delta);

        assert!(!state.contains_node(&view_id));
        assert_eq!(state.edge_count(), 0);
        assert_eq!(state.selection(), Some(&nid("START")));
        assert_eq!(delta.finish().removed.len(), 3);
    }

    #[test]
    fn resync_is_idempotent() {
        let settings = GraphSettings::default();
        let mut state = project(&skill_check_document(), None, &settings);
        let before = state.clone();

        let mut delta = DeltaBuilder::default();
        sync_view_from_source(&mut state, &settings, &nid("START"), 0, &mut delta);

        assert_eq!(state, before);
        let delta = delta.finish();
        assert!(delta.added.is_empty() && delta.removed.is_empty() && delta.updated.is_empty());
    }

    #[test]
    fn source_from_view_leaves_text_untouched() {
        let settings = GraphSettings::default();
        let state = project(&skill_check_document(), None, &settings);
        let view_id = test_node_id(&nid("START"), &ChoiceKey::positional(0));
        let view = state
            .node(&view_id)
            .and_then(|node| node.test_data())
            .expect("view");
        let mut existing = state.document_node(&nid("START")).expect("start").choices[0].clone();
        existing.condition = Some("has_key".to_owned());

        let patch = TestPatch::default().with_outcome(TestOutcome::Failure, Some(nid("END")));
        let update = sync_source_from_view(view, &patch, 0, &existing);

        assert_eq!(update.parent_id(), &nid("START"));
        assert_eq!(update.choice.text, "Go");
        assert_eq!(update.choice.condition.as_deref(), Some("has_key"));
        assert_eq!(update.choice.test_failure_node, Some(nid("END")));
        assert_eq!(update.choice.test_success_node, Some(nid("END")));
    }
}
