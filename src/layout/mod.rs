// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Layout side-channel and deterministic fallback placement.
//!
//! The layout is persisted independently of document content. It only seeds positions; it never
//! decides which nodes exist.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GraphSettings;
use crate::model::{GraphState, NodeId, Point};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub nodes: BTreeMap<String, Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<serde_json::Value>,
}

impl Layout {
    pub fn position(&self, node_id: &NodeId) -> Option<Point> {
        self.nodes.get(node_id.as_str()).copied()
    }

    pub fn with_position(mut self, node_id: impl Into<String>, position: Point) -> Self {
        self.nodes.insert(node_id.into(), position);
        self
    }

    /// Captures the current positions of every graph node, test nodes included.
    pub fn from_graph(state: &GraphState) -> Self {
        Self {
            nodes: state
                .nodes()
                .iter()
                .map(|node| (node.id().to_string(), node.position()))
                .collect(),
            viewport: state.meta().viewport.clone(),
        }
    }
}

/// Position of the `index`-th document node when the layout has none: a vertical stack.
pub fn stacked_position(settings: &GraphSettings, index: usize) -> Point {
    settings
        .stack_origin
        .offset(0.0, settings.stack_spacing * index as f64)
}

/// Default position of the test node for the `choice_index`-th choice of a parent at `parent`.
pub fn test_node_position(settings: &GraphSettings, parent: Point, choice_index: usize) -> Point {
    parent
        .offset(settings.test_node_offset.x, settings.test_node_offset.y)
        .offset(0.0, settings.test_node_spacing * choice_index as f64)
}

#[cfg(test)]
mod tests {
    use super::{stacked_position, test_node_position, Layout};
    use crate::config::GraphSettings;
    use crate::model::{NodeId, Point};

    #[test]
    fn stacked_positions_are_deterministic() {
        let settings = GraphSettings::default();
        assert_eq!(stacked_position(&settings, 0), Point::new(0.0, 0.0));
        assert_eq!(stacked_position(&settings, 3), Point::new(0.0, 480.0));
    }

    #[test]
    fn test_nodes_fan_out_beside_their_parent() {
        let settings = GraphSettings::default();
        let parent = Point::new(100.0, 50.0);
        assert_eq!(test_node_position(&settings, parent, 0), Point::new(420.0, 50.0));
        assert_eq!(test_node_position(&settings, parent, 2), Point::new(420.0, 290.0));
    }

    #[test]
    fn layout_json_accepts_missing_viewport() {
        let layout: Layout =
            serde_json::from_str(r#"{"nodes":{"START":{"x":1.0,"y":2.0}}}"#).expect("layout");
        let start = NodeId::new("START").expect("node id");
        assert_eq!(layout.position(&start), Some(Point::new(1.0, 2.0)));
        assert_eq!(layout.viewport, None);
    }
}
