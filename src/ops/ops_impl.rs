// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

/// Per-op mutation helpers used by `apply_ops`.
/// Keeps `ops::mod` focused on public op types and orchestration.
fn apply_op(
    state: &mut GraphState,
    op: &GraphOp,
    settings: &GraphSettings,
    delta: &mut DeltaBuilder,
) -> Result<(), ApplyError> {
    match op {
        GraphOp::AddNode { node, position } => add_node(state, settings, node, *position, delta),
        GraphOp::UpdateNode { node_id, patch } => {
            update_node(state, settings, node_id, patch, delta)
        }
        GraphOp::DeleteNode { node_id } => delete_node(state, settings, node_id, delta),
        GraphOp::Connect {
            source_id,
            target_id,
            choice_index,
            handle,
        } => connect(
            state,
            settings,
            source_id,
            target_id,
            *choice_index,
            handle.as_deref(),
            delta,
        ),
        GraphOp::Disconnect { edge_id } => disconnect(state, settings, edge_id, delta),
        GraphOp::UpdatePosition { node_id, position } => {
            let Some(node) = state.node_mut(node_id) else {
                return Err(node_not_found(node_id));
            };
            if node
                .position()
                .differs_from(position, settings.position_epsilon)
            {
                node.set_position(*position);
                delta.record_updated(ElementRef::Node(node_id.clone()));
            }
            Ok(())
        }
    }
}

fn add_node(
    state: &mut GraphState,
    settings: &GraphSettings,
    node: &DialogueNode,
    position: Option<Point>,
    delta: &mut DeltaBuilder,
) -> Result<(), ApplyError> {
    if state.contains_node(&node.id) {
        return Err(ApplyError::AlreadyExists {
            node_id: node.id.clone(),
        });
    }
    if is_reserved_node_id(&node.id) {
        return Err(ApplyError::ReservedId {
            node_id: node.id.clone(),
        });
    }
    reject_duplicate_choices(&node.id, &node.choices)?;
    reject_view_targets(state, node)?;

    let position = position.unwrap_or_else(|| {
        let index = state.nodes().iter().filter(|node| !node.is_test()).count();
        stacked_position(settings, index)
    });
    state.push_node(GraphNode::from_document(node.clone(), position));
    delta.record_added(ElementRef::Node(node.id.clone()));

    reconcile_node(state, settings, &node.id, delta);
    // Links that were dangling until now.
    reconcile_referrers(state, settings, &node.id, delta);
    Ok(())
}

fn reject_duplicate_choices(node_id: &NodeId, choices: &[Choice]) -> Result<(), ApplyError> {
    match duplicate_choice_key(choices) {
        Some(key) => Err(ApplyError::DuplicateChoiceId {
            node_id: node_id.clone(),
            choice: key.to_string(),
        }),
        None => Ok(()),
    }
}

fn update_node(
    state: &mut GraphState,
    settings: &GraphSettings,
    node_id: &NodeId,
    patch: &NodePatch,
    delta: &mut DeltaBuilder,
) -> Result<(), ApplyError> {
    let Some(node) = state.node(node_id) else {
        return Err(node_not_found(node_id));
    };

    match (node.test_data(), patch) {
        (Some(view), NodePatch::Test(patch)) => {
            for outcome in TestOutcome::ALL {
                if let Some(Some(target)) = patch.outcome(outcome) {
                    reject_view_target(state, target)?;
                }
            }
            let view = view.clone();
            let (choice_index, choice) = parent_choice(state, &view)?;
            sync_source_from_view(&view, patch, choice_index, &choice).apply(state, settings, delta);
            Ok(())
        }
        (None, NodePatch::Dialogue(patch)) => {
            if let Some(Some(target)) = &patch.next_node {
                reject_view_target(state, target)?;
            }
            if let Some(choices) = &patch.choices {
                reject_duplicate_choices(node_id, choices)?;
                for choice in choices {
                    reject_choice_view_targets(state, choice)?;
                }
            }
            let Some(record) = state.document_node_mut(node_id) else {
                return Err(node_not_found(node_id));
            };
            let before = record.clone();
            if let Some(speaker) = &patch.speaker {
                record.speaker.clone_from(speaker);
            }
            if let Some(line) = &patch.line {
                record.line.clone_from(line);
            }
            if let Some(choices) = &patch.choices {
                record.choices.clone_from(choices);
            }
            if let Some(next_node) = &patch.next_node {
                record.next_node.clone_from(next_node);
            }
            if *record != before {
                delta.record_updated(ElementRef::Node(node_id.clone()));
            }
            reconcile_node(state, settings, node_id, delta);
            Ok(())
        }
        (Some(_), NodePatch::Dialogue(_)) => Err(ApplyError::KindMismatch {
            node_id: node_id.clone(),
            node_kind: NodeKindTag::Test,
            patch_kind: NodeKindTag::Dialogue,
        }),
        (None, NodePatch::Test(_)) => Err(ApplyError::KindMismatch {
            node_id: node_id.clone(),
            node_kind: NodeKindTag::Dialogue,
            patch_kind: NodeKindTag::Test,
        }),
    }
}

fn delete_node(
    state: &mut GraphState,
    settings: &GraphSettings,
    node_id: &NodeId,
    delta: &mut DeltaBuilder,
) -> Result<(), ApplyError> {
    let Some(node) = state.node(node_id) else {
        return Err(node_not_found(node_id));
    };

    // Deleting a view deletes the test construct, never the parent.
    if let Some(view) = node.test_data() {
        let view = view.clone();
        let (choice_index, choice) = parent_choice(state, &view)?;
        let clear = TestPatch::default().with_test(None);
        sync_source_from_view(&view, &clear, choice_index, &choice).apply(state, settings, delta);
        state.set_selection(Some(view.parent_id().clone()));
        return Ok(());
    }

    let linked_ends = state
        .nodes()
        .iter()
        .filter(|node| node.is_end() && node.id() != node_id)
        .map(|node| node.id().clone())
        .filter(|end_id| state.inbound_edge_count(end_id) > 0)
        .collect::<Vec<_>>();

    let mut removed = vec![node_id.clone()];
    removed.extend(state.test_nodes_of(node_id));
    for id in &removed {
        remove_node_and_edges(state, id, delta);
    }
    clear_inbound(state, settings, node_id, delta);

    for end_id in linked_ends {
        if state.inbound_edge_count(&end_id) > 0 {
            continue;
        }
        tracing::debug!("pruning end marker {} orphaned by deleting {}", end_id, node_id);
        remove_node_and_edges(state, &end_id, delta);
        clear_inbound(state, settings, &end_id, delta);
        removed.push(end_id);
    }

    if state
        .selection()
        .is_some_and(|selected| removed.contains(selected))
    {
        state.set_selection(None);
    }
    Ok(())
}

fn remove_node_and_edges(state: &mut GraphState, node_id: &NodeId, delta: &mut DeltaBuilder) {
    for edge_id in state.edges_touching(node_id) {
        remove_edge(state, &edge_id, delta);
    }
    if state.remove_node(node_id).is_some() {
        delta.record_removed(ElementRef::Node(node_id.clone()));
    }
}

/// Clears every stored link to `target_id` and reconciles the nodes that held one.
fn clear_inbound(
    state: &mut GraphState,
    settings: &GraphSettings,
    target_id: &NodeId,
    delta: &mut DeltaBuilder,
) {
    let referrers = state
        .nodes()
        .iter()
        .filter(|node| {
            node.document_node()
                .is_some_and(|record| record.references(target_id))
        })
        .map(|node| node.id().clone())
        .collect::<Vec<_>>();
    for referrer in referrers {
        if let Some(record) = state.document_node_mut(&referrer) {
            if record.clear_references_to(target_id) {
                delta.record_updated(ElementRef::Node(referrer.clone()));
            }
        }
        reconcile_node(state, settings, &referrer, delta);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectHandle {
    /// Outcome link leaving a test node.
    ViewOutcome(TestOutcome),
    /// Outcome of a tested choice, addressed from the dialogue node.
    ChoiceOutcome(usize, TestOutcome),
    Choice(usize),
    Next,
}

fn resolve_connect_handle(
    source: &GraphNode,
    choice_index: Option<usize>,
    handle: Option<&str>,
) -> Result<ConnectHandle, ApplyError> {
    let raw = handle.map(str::trim).filter(|raw| !raw.is_empty());
    let invalid = |reason: &'static str| ApplyError::InvalidHandle {
        source_id: source.id().clone(),
        handle: raw.unwrap_or("<none>").to_owned(),
        reason,
    };

    let Some(record) = source.document_node() else {
        return match raw.and_then(TestOutcome::parse) {
            Some(outcome) => Ok(ConnectHandle::ViewOutcome(outcome)),
            None => Err(invalid("test nodes only link through an outcome handle")),
        };
    };

    let existing_choice = |index: usize| {
        if index < record.choices.len() {
            Ok(index)
        } else {
            Err(ApplyError::ChoiceNotFound {
                node_id: source.id().clone(),
                choice: index.to_string(),
            })
        }
    };

    match raw {
        Some("next") => {
            if record.choices.is_empty() {
                Ok(ConnectHandle::Next)
            } else {
                Err(invalid("a node with choices links through its choices"))
            }
        }
        Some(token) if TestOutcome::parse(token).is_some() => {
            let outcome = TestOutcome::parse(token).ok_or_else(|| invalid("unknown outcome"))?;
            let index = choice_index.ok_or_else(|| invalid("an outcome handle needs a choice"))?;
            let index = existing_choice(index)?;
            if record.choices[index].has_test() {
                Ok(ConnectHandle::ChoiceOutcome(index, outcome))
            } else {
                Err(invalid("the choice has no test"))
            }
        }
        Some(token) if token.starts_with("choice-") => {
            let key = &token["choice-".len()..];
            record
                .choices
                .iter()
                .enumerate()
                .position(|(index, choice)| choice_key(choice, index).as_str() == key)
                .map(ConnectHandle::Choice)
                .ok_or_else(|| ApplyError::ChoiceNotFound {
                    node_id: source.id().clone(),
                    choice: key.to_owned(),
                })
        }
        Some("choice") | None => match choice_index {
            Some(index) => existing_choice(index).map(ConnectHandle::Choice),
            None if record.choices.is_empty() => Ok(ConnectHandle::Next),
            None => Err(invalid("a choice index is required")),
        },
        Some(_) => Err(invalid("unknown handle")),
    }
}

fn connect(
    state: &mut GraphState,
    settings: &GraphSettings,
    source_id: &NodeId,
    target_id: &NodeId,
    choice_index: Option<usize>,
    handle: Option<&str>,
    delta: &mut DeltaBuilder,
) -> Result<(), ApplyError> {
    let Some(source) = state.node(source_id) else {
        return Err(node_not_found(source_id));
    };
    if !state.contains_node(target_id) {
        return Err(node_not_found(target_id));
    }
    reject_view_target(state, target_id)?;

    let resolved = resolve_connect_handle(source, choice_index, handle)?;
    if let ConnectHandle::ViewOutcome(outcome) = resolved {
        let Some(view) = source.test_data().cloned() else {
            return Err(node_not_found(source_id));
        };
        let (choice_index, choice) = parent_choice(state, &view)?;
        let patch = TestPatch::default().with_outcome(outcome, Some(target_id.clone()));
        sync_source_from_view(&view, &patch, choice_index, &choice).apply(state, settings, delta);
        return Ok(());
    }

    let Some(record) = state.document_node_mut(source_id) else {
        return Err(node_not_found(source_id));
    };
    let before = record.clone();
    match resolved {
        ConnectHandle::ChoiceOutcome(index, outcome) => {
            record.choices[index].set_outcome(outcome, Some(target_id.clone()));
        }
        ConnectHandle::Choice(index) => {
            // A plain link replaces any test on the choice.
            let choice = &mut record.choices[index];
            choice.clear_test();
            choice.target_node = Some(target_id.clone());
        }
        ConnectHandle::Next => record.next_node = Some(target_id.clone()),
        ConnectHandle::ViewOutcome(_) => {}
    }
    if *record != before {
        delta.record_updated(ElementRef::Node(source_id.clone()));
    }
    reconcile_node(state, settings, source_id, delta);
    Ok(())
}

fn disconnect(
    state: &mut GraphState,
    settings: &GraphSettings,
    edge_id: &EdgeId,
    delta: &mut DeltaBuilder,
) -> Result<(), ApplyError> {
    let Some(edge) = state.edge(edge_id).cloned() else {
        return Err(ApplyError::NotFound {
            kind: ElementKind::Edge,
            id: edge_id.to_string(),
        });
    };

    match edge.handle() {
        Handle::Choice(key) => {
            let into_view = state.node(edge.target()).is_some_and(GraphNode::is_test);
            if let Some(record) = state.document_node_mut(edge.source()) {
                if let Some(index) = find_choice_index(&record.choices, key) {
                    let choice = &mut record.choices[index];
                    if into_view {
                        choice.clear_test();
                    } else {
                        choice.target_node = None;
                    }
                    delta.record_updated(ElementRef::Node(edge.source().clone()));
                }
            }
            remove_edge(state, edge_id, delta);
            reconcile_node(state, settings, edge.source(), delta);
        }
        Handle::Outcome(outcome) => {
            let view = state
                .node(edge.source())
                .and_then(GraphNode::test_data)
                .cloned();
            match view {
                Some(view) => {
                    let (choice_index, choice) = parent_choice(state, &view)?;
                    let patch = TestPatch::default().with_outcome(*outcome, None);
                    sync_source_from_view(&view, &patch, choice_index, &choice)
                        .apply(state, settings, delta);
                }
                None => remove_edge(state, edge_id, delta),
            }
        }
        Handle::Next => {
            if let Some(record) = state.document_node_mut(edge.source()) {
                record.next_node = None;
                delta.record_updated(ElementRef::Node(edge.source().clone()));
            }
            remove_edge(state, edge_id, delta);
            reconcile_node(state, settings, edge.source(), delta);
        }
    }
    Ok(())
}

/// Index and current value of the choice a test node mirrors.
fn parent_choice(state: &GraphState, view: &TestNodeData) -> Result<(usize, Choice), ApplyError> {
    let Some(parent) = state.document_node(view.parent_id()) else {
        return Err(node_not_found(view.parent_id()));
    };
    let Some(index) = find_choice_index(&parent.choices, view.choice_key()) else {
        return Err(ApplyError::ChoiceNotFound {
            node_id: view.parent_id().clone(),
            choice: view.choice_key().to_string(),
        });
    };
    Ok((index, parent.choices[index].clone()))
}

fn reject_view_target(state: &GraphState, target_id: &NodeId) -> Result<(), ApplyError> {
    if state.node(target_id).is_some_and(GraphNode::is_test) {
        return Err(ApplyError::InvalidTarget {
            target_id: target_id.clone(),
        });
    }
    Ok(())
}

fn reject_choice_view_targets(state: &GraphState, choice: &Choice) -> Result<(), ApplyError> {
    if let Some(target) = &choice.target_node {
        reject_view_target(state, target)?;
    }
    for outcome in TestOutcome::ALL {
        if let Some(target) = choice.outcome(outcome) {
            reject_view_target(state, target)?;
        }
    }
    Ok(())
}

fn reject_view_targets(state: &GraphState, node: &DialogueNode) -> Result<(), ApplyError> {
    if let Some(target) = &node.next_node {
        reject_view_target(state, target)?;
    }
    for choice in &node.choices {
        reject_choice_view_targets(state, choice)?;
    }
    Ok(())
}

fn node_not_found(node_id: &NodeId) -> ApplyError {
    ApplyError::NotFound {
        kind: ElementKind::Node,
        id: node_id.to_string(),
    }
}
