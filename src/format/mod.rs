// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canonical JSON document format.
//!
//! The versioned form is `{ "schemaVersion": 1, "nodes": [...] }`. A bare array of nodes is the
//! legacy form and is read as the current schema version.

use std::fmt;

use serde_json::Value;

use crate::model::{
    duplicate_choice_key, is_reserved_node_id, ChoiceKey, DialogueDocument, DialogueNode, NodeId,
    CURRENT_SCHEMA_VERSION,
};

const SCHEMA_VERSION_KEY: &str = "schemaVersion";

#[derive(Debug)]
pub enum FormatError {
    Json(serde_json::Error),
    UnsupportedVersion { found: u64, supported: u32 },
    InvalidVersion { found: Value },
    UnexpectedShape { found: &'static str },
    ReservedNodeId { node_id: NodeId },
    DuplicateChoiceId { node_id: NodeId, choice: ChoiceKey },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(source) => write!(f, "invalid document json: {source}"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "document schemaVersion {found} is newer than the supported version {supported}"
            ),
            Self::InvalidVersion { found } => {
                write!(f, "schemaVersion must be a positive integer (got {found})")
            }
            Self::UnexpectedShape { found } => {
                write!(f, "expected a document object or a node array (got {found})")
            }
            Self::ReservedNodeId { node_id } => {
                write!(f, "node id {node_id} is reserved for derived test nodes")
            }
            Self::DuplicateChoiceId { node_id, choice } => {
                write!(f, "node {node_id} has more than one choice with id {choice}")
            }
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(source) => Some(source),
            Self::UnsupportedVersion { .. }
            | Self::InvalidVersion { .. }
            | Self::UnexpectedShape { .. }
            | Self::ReservedNodeId { .. }
            | Self::DuplicateChoiceId { .. } => None,
        }
    }
}

impl From<serde_json::Error> for FormatError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json(source)
    }
}

pub fn parse_document(raw: &str) -> Result<DialogueDocument, FormatError> {
    let value: Value = serde_json::from_str(raw)?;
    document_from_value(value)
}

pub fn document_from_value(value: Value) -> Result<DialogueDocument, FormatError> {
    let document = document_from_value_unchecked(value)?;
    check_identities(&document)?;
    Ok(document)
}

/// Rejects ids that would shadow a derived test node and choices that share a key.
fn check_identities(document: &DialogueDocument) -> Result<(), FormatError> {
    for node in &document.nodes {
        if is_reserved_node_id(&node.id) {
            return Err(FormatError::ReservedNodeId {
                node_id: node.id.clone(),
            });
        }
        if let Some(choice) = duplicate_choice_key(&node.choices) {
            return Err(FormatError::DuplicateChoiceId {
                node_id: node.id.clone(),
                choice,
            });
        }
    }
    Ok(())
}

fn document_from_value_unchecked(value: Value) -> Result<DialogueDocument, FormatError> {
    match value {
        Value::Array(_) => {
            let nodes: Vec<DialogueNode> = serde_json::from_value(value)?;
            tracing::debug!("read legacy node array ({} nodes)", nodes.len());
            Ok(DialogueDocument::new(nodes))
        }
        Value::Object(mut object) => {
            match object.get(SCHEMA_VERSION_KEY) {
                None => {
                    object.insert(SCHEMA_VERSION_KEY.to_owned(), CURRENT_SCHEMA_VERSION.into());
                }
                Some(version) => {
                    let Some(found) = version.as_u64().filter(|found| *found > 0) else {
                        return Err(FormatError::InvalidVersion {
                            found: version.clone(),
                        });
                    };
                    if found > u64::from(CURRENT_SCHEMA_VERSION) {
                        return Err(FormatError::UnsupportedVersion {
                            found,
                            supported: CURRENT_SCHEMA_VERSION,
                        });
                    }
                }
            }
            Ok(serde_json::from_value(Value::Object(object))?)
        }
        Value::Null => Err(FormatError::UnexpectedShape { found: "null" }),
        Value::Bool(_) => Err(FormatError::UnexpectedShape { found: "boolean" }),
        Value::Number(_) => Err(FormatError::UnexpectedShape { found: "number" }),
        Value::String(_) => Err(FormatError::UnexpectedShape { found: "string" }),
    }
}

/// Pretty-printed versioned form with a trailing newline.
pub fn export_document_json(document: &DialogueDocument) -> Result<String, FormatError> {
    let mut out = serde_json::to_string_pretty(document)?;
    out.push('\n');
    Ok(out)
}

/// JSON Schema of the versioned document form.
pub fn document_json_schema() -> Value {
    schemars::schema_for!(DialogueDocument).to_value()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{document_json_schema, export_document_json, parse_document, FormatError};
    use crate::model::fixtures::{nid, tavern_document};
    use crate::model::{TestOutcome, CURRENT_SCHEMA_VERSION};

    #[test]
    fn versioned_form_parses() {
        let document = parse_document(
            r#"{
                "schemaVersion": 1,
                "nodes": [
                    {"id": "START", "speaker": "Guard", "line": "Hi", "choices": [
                        {"text": "Go", "test": "Int:8", "testSuccessNode": "END"}
                    ]},
                    {"id": "END"}
                ]
            }"#,
        )
        .expect("document");

        assert_eq!(document.nodes.len(), 2);
        let choice = &document.nodes[0].choices[0];
        assert_eq!(choice.outcome(TestOutcome::Success), Some(&nid("END")));
        assert_eq!(document.nodes[1].line, "");
    }

    #[test]
    fn legacy_array_gets_the_current_version() {
        let document =
            parse_document(r#"[{"id": "A", "line": "hello", "nextNode": "B"}, {"id": "B"}]"#)
                .expect("document");
        assert_eq!(document.schema_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(document.nodes[0].next_node, Some(nid("B")));
    }

    #[rstest]
    #[case::newer(r#"{"schemaVersion": 99, "nodes": []}"#)]
    #[case::not_a_number(r#"{"schemaVersion": "one", "nodes": []}"#)]
    #[case::scalar("42")]
    #[case::bad_id(r#"[{"id": "a/b"}]"#)]
    #[case::broken("{")]
    fn malformed_documents_are_rejected(#[case] raw: &str) {
        assert!(parse_document(raw).is_err());
    }

    #[test]
    fn newer_versions_name_both_numbers() {
        let err = parse_document(r#"{"schemaVersion": 3, "nodes": []}"#).expect_err("newer");
        assert!(matches!(
            err,
            FormatError::UnsupportedVersion {
                found: 3,
                supported: 1
            }
        ));
    }

    #[test]
    fn ids_shaped_like_test_nodes_are_rejected() {
        let err = parse_document(
            r#"[{"id": "A", "choices": [{"test": "Int:3"}]}, {"id": "A::test::c0"}]"#,
        )
        .expect_err("reserved id");
        assert!(matches!(
            err,
            FormatError::ReservedNodeId { ref node_id } if node_id.as_str() == "A::test::c0"
        ));
    }

    #[test]
    fn repeated_choice_ids_are_rejected() {
        let err = parse_document(
            r#"[{"id": "A", "choices": [
                {"choiceId": "go", "targetNode": "B"},
                {"choiceId": "go", "targetNode": "C"}
            ]}, {"id": "B"}, {"id": "C"}]"#,
        )
        .expect_err("duplicate choice id");
        assert!(matches!(
            err,
            FormatError::DuplicateChoiceId { ref choice, .. } if choice.as_str() == "go"
        ));
    }

    #[test]
    fn explicit_id_matching_a_positional_token_loads() {
        let document = parse_document(
            r#"[{"id": "A", "choices": [
                {"choiceId": "c1", "targetNode": "B"},
                {"targetNode": "C"}
            ]}, {"id": "B"}, {"id": "C"}]"#,
        )
        .expect("document");
        assert_eq!(document.nodes[0].choices.len(), 2);
    }

    #[test]
    fn export_then_parse_is_lossless() {
        let document = tavern_document();
        let json = export_document_json(&document).expect("export");
        assert!(json.ends_with('\n'));
        assert!(json.contains("\"schemaVersion\": 1"));
        assert_eq!(parse_document(&json).expect("parse"), document);
    }

    #[test]
    fn schema_describes_the_versioned_form() {
        let schema = document_json_schema();
        let properties = &schema["properties"];
        assert!(properties.get("schemaVersion").is_some());
        assert!(properties.get("nodes").is_some());
    }
}
