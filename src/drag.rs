// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Frame coalescing for continuous position updates.
//!
//! Pointer events arrive far more often than frames. The coalescer keeps only the latest position
//! per node, applies them once per frame without touching history, and commits the whole gesture
//! as one undoable step on release.

use std::collections::BTreeMap;

use crate::editor::{Committed, Editor, EditorError};
use crate::model::{NodeId, Point};
use crate::ops::{ApplyResult, GraphOp};

#[derive(Debug, Default)]
pub struct DragCoalescer {
    latest: BTreeMap<NodeId, Point>,
}

impl DragCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag(&mut self, node_id: NodeId, position: Point) {
        self.latest.insert(node_id, position);
    }

    pub fn has_pending(&self) -> bool {
        !self.latest.is_empty()
    }

    /// Applies the positions gathered since the previous frame. Nodes deleted mid-gesture are
    /// skipped.
    pub fn on_frame(&mut self, editor: &mut Editor) -> Result<Option<ApplyResult>, EditorError> {
        if self.latest.is_empty() {
            return Ok(None);
        }

        let latest = std::mem::take(&mut self.latest);
        let ops = latest
            .into_iter()
            .filter(|(node_id, _)| {
                let known = editor.state().contains_node(node_id);
                if !known {
                    tracing::debug!("dropping drag update for removed node {}", node_id);
                }
                known
            })
            .map(|(node_id, position)| GraphOp::UpdatePosition { node_id, position })
            .collect::<Vec<_>>();

        editor.apply_transient(&ops).map(Some)
    }

    /// Flushes the final positions and records the gesture.
    pub fn release(&mut self, editor: &mut Editor) -> Result<Committed, EditorError> {
        self.on_frame(editor)?;
        Ok(editor.checkpoint())
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::DragCoalescer;
    use crate::config::EditorConfig;
    use crate::editor::Editor;
    use crate::model::fixtures::{nid, tavern_document};
    use crate::model::{DocumentId, GraphNode, Point};

    #[fixture]
    fn editor() -> Editor {
        let mut editor = Editor::new(
            &EditorConfig::default(),
            DocumentId::new("drag").expect("doc id"),
            None,
        );
        editor.load(&tavern_document(), None);
        editor
    }

    fn position_of(editor: &Editor, id: &str) -> Option<Point> {
        editor.state().node(&nid(id)).map(GraphNode::position)
    }

    #[rstest]
    fn a_frame_applies_only_the_latest_position(mut editor: Editor) {
        let mut drag = DragCoalescer::new();
        for step in 1..=20 {
            drag.drag(nid("ale"), Point::new(f64::from(step) * 10.0, 160.0));
        }

        let result = drag.on_frame(&mut editor).expect("frame").expect("applied");
        assert_eq!(result.delta.updated.len(), 1);
        assert_eq!(position_of(&editor, "ale"), Some(Point::new(200.0, 160.0)));
        assert!(!drag.has_pending());
        assert!(drag.on_frame(&mut editor).expect("idle frame").is_none());
        assert!(!editor.can_undo());
    }

    #[rstest]
    fn release_commits_one_history_entry(mut editor: Editor) {
        let mut drag = DragCoalescer::new();
        drag.drag(nid("ale"), Point::new(50.0, 160.0));
        drag.on_frame(&mut editor).expect("frame");
        drag.drag(nid("ale"), Point::new(90.0, 160.0));

        let committed = drag.release(&mut editor).expect("release");
        assert!(committed.recorded);
        assert_eq!(position_of(&editor, "ale"), Some(Point::new(90.0, 160.0)));
        assert_eq!(editor.local_seq(), 1);

        editor.undo().expect("undo");
        assert_eq!(position_of(&editor, "ale"), Some(Point::new(0.0, 160.0)));
        assert!(!editor.can_undo());
    }

    #[rstest]
    fn removed_nodes_are_skipped(mut editor: Editor) {
        let mut drag = DragCoalescer::new();
        drag.drag(nid("ale"), Point::new(40.0, 160.0));
        drag.drag(nid("rumor"), Point::new(40.0, 480.0));
        editor.delete_node(nid("rumor")).expect("delete");

        let result = drag.on_frame(&mut editor).expect("frame").expect("applied");
        assert_eq!(result.delta.updated.len(), 1);
        assert_eq!(position_of(&editor, "ale"), Some(Point::new(40.0, 160.0)));
    }
}
