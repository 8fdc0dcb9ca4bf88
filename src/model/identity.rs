// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Deterministic identities for choices, derived test nodes and edges.
//!
//! Every id produced here is a pure function of document content: re-projecting an unchanged
//! document yields byte-identical ids.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use smol_str::SmolStr;

use super::document::{Choice, TestOutcome};
use super::ids::{EdgeId, NodeId};

const POSITIONAL_PREFIX: &str = "c";
const TEST_NODE_SEPARATOR: &str = "::test::";

/// Resolved identity of a choice within its parent node.
///
/// `%` and `/` are percent-encoded so keys can be embedded in node and edge ids. Positional keys
/// own the `c<digits>` shape; an explicit id of that shape has its leading `c` encoded as `%63`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChoiceKey(SmolStr);

impl ChoiceKey {
    /// Key of an explicit `choiceId`.
    pub fn new(value: impl AsRef<str>) -> Self {
        let value = value.as_ref();
        let escaped = if value.contains(['%', '/']) {
            value.replace('%', "%25").replace('/', "%2F")
        } else {
            value.to_owned()
        };
        if is_positional_shape(&escaped) {
            return Self(SmolStr::from(format!("%63{}", &escaped[POSITIONAL_PREFIX.len()..])));
        }
        Self(SmolStr::from(escaped))
    }

    /// Fallback key of the unnamed choice at `index`.
    pub fn positional(index: usize) -> Self {
        let mut buf = itoa::Buffer::new();
        let digits = buf.format(index);
        let mut raw = String::with_capacity(POSITIONAL_PREFIX.len() + digits.len());
        raw.push_str(POSITIONAL_PREFIX);
        raw.push_str(digits);
        Self(SmolStr::from(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_positional_shape(value: &str) -> bool {
    value
        .strip_prefix(POSITIONAL_PREFIX)
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Returns the explicit `choiceId` when set, else the positional token `c<index>`.
pub fn choice_key(choice: &Choice, index: usize) -> ChoiceKey {
    match choice.choice_id.as_deref().filter(|id| !id.is_empty()) {
        Some(explicit) => ChoiceKey::new(explicit),
        None => ChoiceKey::positional(index),
    }
}

/// First key shared by two choices of the same node. Only repeated explicit ids can collide.
pub fn duplicate_choice_key(choices: &[Choice]) -> Option<ChoiceKey> {
    let mut seen = HashSet::with_capacity(choices.len());
    choices
        .iter()
        .enumerate()
        .map(|(index, choice)| choice_key(choice, index))
        .find(|key| !seen.insert(key.clone()))
}

/// Document ids may not take the shape of a derived test node id.
pub fn is_reserved_node_id(id: &NodeId) -> bool {
    parse_test_node_id(id).is_some()
}

/// Finds the index of the choice whose resolved key equals `key`.
pub fn find_choice_index(choices: &[Choice], key: &ChoiceKey) -> Option<usize> {
    choices
        .iter()
        .enumerate()
        .position(|(index, choice)| &choice_key(choice, index) == key)
}

/// Deterministic id of the test node materializing `parent`'s choice `key`.
pub fn test_node_id(parent: &NodeId, key: &ChoiceKey) -> NodeId {
    let raw = format!("{parent}{TEST_NODE_SEPARATOR}{key}");
    NodeId::new(raw).expect("derived test node id is a non-empty segment")
}

/// Inverse of [`test_node_id`]. Splits on the first separator occurrence.
pub fn parse_test_node_id(id: &NodeId) -> Option<(NodeId, ChoiceKey)> {
    let (parent, key) = id.as_str().split_once(TEST_NODE_SEPARATOR)?;
    if key.is_empty() {
        return None;
    }
    let parent = NodeId::new(parent).ok()?;
    // Already encoded when the id was built.
    Some((parent, ChoiceKey(SmolStr::new(key))))
}

/// Semantic link carried by an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Handle {
    /// A choice's link: to its `targetNode`, or to its test node when the choice has a test.
    Choice(ChoiceKey),
    /// One of the four outcome links leaving a test node.
    Outcome(TestOutcome),
    /// Linear fallthrough (`nextNode`) of a node without choices.
    Next,
}

impl Handle {
    pub fn token(&self) -> String {
        match self {
            Self::Choice(key) => format!("choice-{key}"),
            Self::Outcome(outcome) => outcome.as_str().to_owned(),
            Self::Next => "next".to_owned(),
        }
    }

    pub fn choice_key(&self) -> Option<&ChoiceKey> {
        match self {
            Self::Choice(key) => Some(key),
            Self::Outcome(_) | Self::Next => None,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Edge identity is a pure function of (source, handle, target).
///
/// `%` and `:` are percent-encoded inside each component, so `:` only ever separates them.
pub fn edge_id(source: &NodeId, handle: &Handle, target: &NodeId) -> EdgeId {
    let source = encode_edge_component(source.as_str());
    let token = handle.token();
    let token = encode_edge_component(&token);
    let target = encode_edge_component(target.as_str());
    let raw = format!("e:{source}:{token}:{target}");
    EdgeId::new(raw).expect("derived edge id is a non-empty segment")
}

fn encode_edge_component(value: &str) -> Cow<'_, str> {
    if !value.contains(['%', ':']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
