// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nereid dialogue: branching-dialogue graph editing core.
//!
//! A canonical dialogue document (flat nodes with inline choices and skill-check tests) is edited
//! as a node-link graph. Test constructs appear in the graph as derived test nodes that never reach
//! the document. The [`Editor`] owns the graph, records undo history, and mirrors every change into
//! a local journal until a remote save acknowledges it.

pub mod config;
pub mod drag;
pub mod editor;
pub mod format;
pub mod history;
pub mod layout;
pub mod model;
pub mod ops;
pub mod projection;
pub mod remote;
pub mod store;

pub use config::{ConfigError, EditorConfig, GraphSettings};
pub use drag::DragCoalescer;
pub use editor::{Editor, EditorError, MutationOutcome, UiState};
pub use format::{document_json_schema, export_document_json, parse_document, FormatError};
pub use layout::Layout;
pub use model::{
    Choice, DialogueDocument, DialogueNode, DocumentId, EdgeId, GraphState, NodeId, Point,
    TestOutcome,
};
pub use ops::{apply_ops, ApplyError, ApplyResult, GraphOp, NodePatch};
pub use projection::{project, reify};
pub use store::{FolderJournal, JournalError, JournalStore, MemoryJournal};
