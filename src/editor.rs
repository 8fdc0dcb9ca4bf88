// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editing session for one document.
//!
//! [`Editor`] is the single owner of a [`GraphState`]. Every committed mutation is recorded in the
//! undo history and mirrored into the journal's `pending` slot; remote acknowledgments move the
//! acknowledged state into the `snapshot` slot.
//!
//! A journal that stops working is dropped and the session continues memory-only. The failure is
//! reported once, in the outcome of the call that hit it.

use std::fmt;
use std::sync::Arc;

use crate::config::{EditorConfig, GraphSettings};
use crate::format::{parse_document, FormatError};
use crate::history::History;
use crate::layout::Layout;
use crate::model::{DialogueDocument, DialogueNode, DocumentId, EdgeId, GraphState, NodeId, Point};
use crate::ops::{apply_ops, ApplyError, ApplyResult, ElementKind, GraphOp, NodePatch};
use crate::projection::{project, reify};
use crate::remote::{
    LayoutService, PersistenceEndpoint, RemoteError, SaveAck, ValidationIssue, Validator,
};
use crate::store::{JournalError, JournalState, JournalStore};

/// Transient UI state. Never part of history or the journal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    pub loading: bool,
    pub validation: Vec<ValidationIssue>,
    pub modal_open: bool,
    /// Local edits exist that no remote save acknowledged yet.
    pub dirty: bool,
}

#[derive(Debug)]
pub struct MutationOutcome {
    pub result: ApplyResult,
    /// Set when the journal failed during this call and was dropped.
    pub journal_error: Option<JournalError>,
}

#[derive(Debug)]
pub struct Committed {
    /// False when the state equals the newest history entry.
    pub recorded: bool,
    pub journal_error: Option<JournalError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub seq: u64,
    pub document: DialogueDocument,
}

#[derive(Debug)]
pub struct AckOutcome {
    /// False for acks of superseded or unknown saves; those change nothing.
    pub accepted: bool,
    /// No local edits happened after the acknowledged save.
    pub up_to_date: bool,
    pub journal_error: Option<JournalError>,
}

impl AckOutcome {
    fn ignored() -> Self {
        Self {
            accepted: false,
            up_to_date: false,
            journal_error: None,
        }
    }
}

#[derive(Debug)]
struct InFlightSave {
    seq: u64,
    state: JournalState,
}

#[derive(Debug)]
pub struct Editor {
    doc_id: DocumentId,
    settings: GraphSettings,
    state: GraphState,
    ui: UiState,
    history: History<GraphState>,
    journal: Option<Arc<dyn JournalStore>>,
    local_seq: u64,
    acked_seq: u64,
    in_flight: Option<InFlightSave>,
}

impl Editor {
    pub fn new(
        config: &EditorConfig,
        doc_id: DocumentId,
        journal: Option<Arc<dyn JournalStore>>,
    ) -> Self {
        let state = GraphState::default();
        let mut history = History::with_capacity(config.history_capacity);
        history.reset(state.clone());
        Self {
            doc_id,
            settings: config.graph.clone(),
            state,
            ui: UiState::default(),
            history,
            journal,
            local_seq: 0,
            acked_seq: 0,
            in_flight: None,
        }
    }

    /// Like [`Editor::new`] with the journal backend named by `config`.
    ///
    /// A backend that cannot be opened is logged and the session runs memory-only.
    pub fn open(config: &EditorConfig, doc_id: DocumentId) -> Self {
        let journal = match config.open_journal() {
            Ok(journal) => Some(journal),
            Err(err) => {
                tracing::warn!("continuing without a local journal: {}", err);
                None
            }
        };
        Self::new(config, doc_id, journal)
    }

    /// Rebuilds a session from the journal after a restart.
    ///
    /// Unacknowledged pending edits win over the snapshot; the session then reports
    /// [`Editor::needs_resubmit`] so the host can save again.
    pub fn recover(
        config: &EditorConfig,
        doc_id: DocumentId,
        journal: Arc<dyn JournalStore>,
    ) -> Result<Self, EditorError> {
        let entry = journal.read_document(&doc_id)?;
        let mut editor = Self::new(config, doc_id, Some(journal));
        if let Some(state) = entry.authoritative() {
            editor.load(&state.document, Some(&state.layout));
        }
        editor.local_seq = entry.last_seq();
        editor.acked_seq = entry.snapshot.as_ref().map_or(0, |snapshot| snapshot.ack_seq);
        editor.ui.dirty = entry.needs_resubmit();
        tracing::info!(
            doc = %editor.doc_id,
            local_seq = editor.local_seq,
            acked_seq = editor.acked_seq,
            resubmit = editor.ui.dirty,
            "recovered document from journal"
        );
        Ok(editor)
    }

    /// Replaces the session contents with `document`. History starts over.
    pub fn load(&mut self, document: &DialogueDocument, layout: Option<&Layout>) {
        self.state = project(document, layout, &self.settings);
        self.history.reset(self.state.clone());
        self.in_flight = None;
        self.acked_seq = self.local_seq;
        self.ui = UiState::default();
        tracing::info!(
            doc = %self.doc_id,
            nodes = self.state.node_count(),
            edges = self.state.edge_count(),
            "loaded document"
        );
    }

    pub fn load_json(&mut self, raw: &str, layout: Option<&Layout>) -> Result<(), EditorError> {
        let document = parse_document(raw)?;
        self.load(&document, layout);
        Ok(())
    }

    pub fn doc_id(&self) -> &DocumentId {
        &self.doc_id
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    pub fn state(&self) -> &GraphState {
        &self.state
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.ui.loading = loading;
    }

    pub fn set_modal_open(&mut self, open: bool) {
        self.ui.modal_open = open;
    }

    pub fn local_seq(&self) -> u64 {
        self.local_seq
    }

    pub fn acked_seq(&self) -> u64 {
        self.acked_seq
    }

    pub fn needs_resubmit(&self) -> bool {
        self.local_seq > self.acked_seq
    }

    pub fn has_journal(&self) -> bool {
        self.journal.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Applies `ops` as one undoable step.
    pub fn apply(&mut self, ops: &[GraphOp]) -> Result<MutationOutcome, EditorError> {
        let result = apply_ops(&mut self.state, ops, &self.settings)?;
        let journal_error = if result.changed {
            self.checkpoint().journal_error
        } else {
            None
        };
        Ok(MutationOutcome {
            result,
            journal_error,
        })
    }

    /// Applies `ops` without recording history or journaling. Follow up with
    /// [`Editor::checkpoint`] once the gesture is over.
    pub fn apply_transient(&mut self, ops: &[GraphOp]) -> Result<ApplyResult, EditorError> {
        let result = apply_ops(&mut self.state, ops, &self.settings)?;
        if result.changed {
            self.ui.dirty = true;
        }
        Ok(result)
    }

    /// Records the current state in history and the journal's pending slot.
    pub fn checkpoint(&mut self) -> Committed {
        if !self.history.record(self.state.clone()) {
            return Committed {
                recorded: false,
                journal_error: None,
            };
        }
        self.ui.dirty = true;
        Committed {
            recorded: true,
            journal_error: self.persist_pending(),
        }
    }

    pub fn add_node(
        &mut self,
        node: DialogueNode,
        position: Option<Point>,
    ) -> Result<MutationOutcome, EditorError> {
        self.apply(&[GraphOp::AddNode { node, position }])
    }

    pub fn update_node(
        &mut self,
        node_id: NodeId,
        patch: NodePatch,
    ) -> Result<MutationOutcome, EditorError> {
        self.apply(&[GraphOp::UpdateNode { node_id, patch }])
    }

    pub fn delete_node(&mut self, node_id: NodeId) -> Result<MutationOutcome, EditorError> {
        self.apply(&[GraphOp::DeleteNode { node_id }])
    }

    pub fn connect(
        &mut self,
        source_id: NodeId,
        target_id: NodeId,
        choice_index: Option<usize>,
        handle: Option<&str>,
    ) -> Result<MutationOutcome, EditorError> {
        self.apply(&[GraphOp::Connect {
            source_id,
            target_id,
            choice_index,
            handle: handle.map(str::to_owned),
        }])
    }

    pub fn disconnect(&mut self, edge_id: EdgeId) -> Result<MutationOutcome, EditorError> {
        self.apply(&[GraphOp::Disconnect { edge_id }])
    }

    pub fn update_position(
        &mut self,
        node_id: NodeId,
        position: Point,
    ) -> Result<MutationOutcome, EditorError> {
        self.apply(&[GraphOp::UpdatePosition { node_id, position }])
    }

    /// Selection is persistent state but selecting alone does not create a history entry.
    pub fn select(&mut self, node_id: Option<NodeId>) -> Result<(), EditorError> {
        if let Some(node_id) = &node_id {
            if !self.state.contains_node(node_id) {
                return Err(ApplyError::NotFound {
                    kind: ElementKind::Node,
                    id: node_id.to_string(),
                }
                .into());
            }
        }
        self.state.set_selection(node_id);
        Ok(())
    }

    pub fn undo(&mut self) -> Option<Committed> {
        let previous = self.history.undo()?;
        Some(self.restore(previous))
    }

    pub fn redo(&mut self) -> Option<Committed> {
        let next = self.history.redo()?;
        Some(self.restore(next))
    }

    fn restore(&mut self, state: GraphState) -> Committed {
        self.state = state;
        self.ui.dirty = true;
        Committed {
            recorded: false,
            journal_error: self.persist_pending(),
        }
    }

    /// The canonical document for the current graph.
    pub fn export_document(&self) -> DialogueDocument {
        reify(&self.state)
    }

    /// Current positions of every node, test nodes included.
    pub fn layout(&self) -> Layout {
        Layout::from_graph(&self.state)
    }

    /// Moves nodes to the positions in `layout` as a single undoable step.
    ///
    /// Entries for ids that are not in the graph are ignored.
    pub fn apply_layout(&mut self, layout: &Layout) -> Result<MutationOutcome, EditorError> {
        let ops = self
            .state
            .nodes()
            .iter()
            .filter_map(|node| {
                layout
                    .position(node.id())
                    .map(|position| GraphOp::UpdatePosition {
                        node_id: node.id().clone(),
                        position,
                    })
            })
            .collect::<Vec<_>>();
        let unknown = layout.nodes.len().saturating_sub(ops.len());
        if unknown > 0 {
            tracing::debug!("ignoring {} layout entries for unknown nodes", unknown);
        }

        let mut result = apply_ops(&mut self.state, &ops, &self.settings)?;
        if layout.viewport.is_some() && layout.viewport != self.state.meta().viewport {
            self.state.meta_mut().viewport = layout.viewport.clone();
            result.changed = true;
        }

        let journal_error = if result.changed {
            self.checkpoint().journal_error
        } else {
            None
        };
        Ok(MutationOutcome {
            result,
            journal_error,
        })
    }

    pub fn arrange_with(
        &mut self,
        service: &dyn LayoutService,
    ) -> Result<MutationOutcome, EditorError> {
        let layout = service.arrange(&self.state)?;
        self.apply_layout(&layout)
    }

    /// Asks `validator` about the current graph and keeps the answer as UI annotations.
    ///
    /// On failure the previous annotations stay in place.
    pub fn refresh_validation(
        &mut self,
        validator: &dyn Validator,
    ) -> Result<&[ValidationIssue], EditorError> {
        let edges = self.state.edges().values().cloned().collect::<Vec<_>>();
        let issues = validator.validate(self.state.nodes(), &edges)?;
        tracing::debug!(doc = %self.doc_id, issues = issues.len(), "validation refreshed");
        self.ui.validation = issues;
        Ok(&self.ui.validation)
    }

    /// Starts a remote save of the current state. A newer call supersedes an older one.
    pub fn begin_save(&mut self) -> SaveRequest {
        let state = self.journal_state();
        let seq = self.local_seq;
        let superseded = self.in_flight.replace(InFlightSave {
            seq,
            state: state.clone(),
        });
        if let Some(previous) = superseded {
            tracing::debug!(doc = %self.doc_id, "save {} superseded by {}", previous.seq, seq);
        }
        SaveRequest {
            seq,
            document: state.document,
        }
    }

    /// Applies a remote acknowledgment: the saved state becomes the journal snapshot, and the
    /// pending slot is cleared when nothing changed since.
    pub fn acknowledge_save(&mut self, ack: SaveAck) -> AckOutcome {
        let save = match self.in_flight.take() {
            Some(save) if save.seq == ack.ack_seq => save,
            other => {
                self.in_flight = other;
                tracing::debug!(doc = %self.doc_id, ack = ack.ack_seq, "ignoring stale save ack");
                return AckOutcome::ignored();
            }
        };

        self.acked_seq = self.acked_seq.max(save.seq);
        let up_to_date = self.local_seq == save.seq;
        self.ui.dirty = !up_to_date;
        let journal_error = self.record_ack(&save, up_to_date);
        tracing::info!(doc = %self.doc_id, ack = save.seq, up_to_date, "save acknowledged");
        AckOutcome {
            accepted: true,
            up_to_date,
            journal_error,
        }
    }

    /// Forgets the in-flight save `seq`. Pending edits stay journaled for a retry.
    pub fn fail_save(&mut self, seq: u64) {
        if self.in_flight.as_ref().is_some_and(|save| save.seq == seq) {
            self.in_flight = None;
        }
        tracing::warn!(doc = %self.doc_id, seq, "remote save failed; keeping pending edits");
    }

    pub fn save_with(
        &mut self,
        endpoint: &dyn PersistenceEndpoint,
    ) -> Result<AckOutcome, EditorError> {
        let request = self.begin_save();
        match endpoint.save(&self.doc_id, &request.document, request.seq) {
            Ok(ack) => Ok(self.acknowledge_save(ack)),
            Err(err) => {
                self.fail_save(request.seq);
                Err(err.into())
            }
        }
    }

    /// Waits for queued journal writes.
    pub fn flush_journal(&mut self) -> Result<(), EditorError> {
        let Some(journal) = self.journal.as_ref() else {
            return Ok(());
        };
        match journal.flush() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.drop_journal(err).into()),
        }
    }

    fn journal_state(&self) -> JournalState {
        JournalState {
            document: reify(&self.state),
            layout: Layout::from_graph(&self.state),
        }
    }

    fn persist_pending(&mut self) -> Option<JournalError> {
        self.local_seq += 1;
        let journal = self.journal.as_ref()?;
        let state = self.journal_state();
        match journal.set_pending(&self.doc_id, &state, self.local_seq) {
            Ok(()) => None,
            Err(err) => Some(self.drop_journal(err)),
        }
    }

    fn record_ack(&mut self, save: &InFlightSave, clear_pending: bool) -> Option<JournalError> {
        let journal = self.journal.as_ref()?;
        let result = journal
            .write_snapshot(&self.doc_id, &save.state, save.seq)
            .and_then(|()| {
                if clear_pending {
                    journal.clear_pending(&self.doc_id)
                } else {
                    Ok(())
                }
            });
        result.err().map(|err| self.drop_journal(err))
    }

    fn drop_journal(&mut self, err: JournalError) -> JournalError {
        tracing::warn!(
            doc = %self.doc_id,
            "local journal unavailable, continuing in memory: {}",
            err
        );
        self.journal = None;
        err
    }
}

#[derive(Debug)]
pub enum EditorError {
    Apply(ApplyError),
    Journal(JournalError),
    Remote(RemoteError),
    Format(FormatError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply(err) => write!(f, "graph operation failed: {err}"),
            Self::Journal(err) => write!(f, "journal error: {err}"),
            Self::Remote(err) => write!(f, "remote call failed: {err}"),
            Self::Format(err) => write!(f, "document format error: {err}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Apply(err) => Some(err),
            Self::Journal(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Format(err) => Some(err),
        }
    }
}

impl From<ApplyError> for EditorError {
    fn from(err: ApplyError) -> Self {
        Self::Apply(err)
    }
}

impl From<JournalError> for EditorError {
    fn from(err: JournalError) -> Self {
        Self::Journal(err)
    }
}

impl From<RemoteError> for EditorError {
    fn from(err: RemoteError) -> Self {
        Self::Remote(err)
    }
}

impl From<FormatError> for EditorError {
    fn from(err: FormatError) -> Self {
        Self::Format(err)
    }
}
