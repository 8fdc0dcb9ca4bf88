// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Editor configuration, loadable from TOML.
//!
//! ```toml
//! history_capacity = 50
//!
//! [graph]
//! position_epsilon = 0.5
//! label_preview_chars = 32
//!
//! [journal]
//! enabled = true
//! root = ".dialogue-journal"
//! durability = "durable"
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::Point;
use crate::store::{
    DisabledJournal, FolderJournal, JournalError, JournalStore, MemoryJournal, WriteDurability,
};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_capacity: usize,
    pub graph: GraphSettings,
    pub journal: JournalConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            graph: GraphSettings::default(),
            journal: JournalConfig::default(),
        }
    }
}

/// Knobs shared by the projector and the mutation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Moves at or below this distance on both axes are treated as jitter.
    pub position_epsilon: f64,
    /// Choice edge labels are cut to this many characters (plus an ellipsis).
    pub label_preview_chars: usize,
    /// Where the fallback vertical stack starts when no layout position is known.
    pub stack_origin: Point,
    pub stack_spacing: f64,
    /// Offset of a freshly derived test node from its parent.
    pub test_node_offset: Point,
    /// Vertical distance between test nodes of the same parent.
    pub test_node_spacing: f64,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            position_epsilon: 0.5,
            label_preview_chars: 32,
            stack_origin: Point::new(0.0, 0.0),
            stack_spacing: 160.0,
            test_node_offset: Point::new(320.0, 0.0),
            test_node_spacing: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// `false` models disabled local storage: every journal call reports it unavailable.
    pub enabled: bool,
    /// On-disk journal directory. `None` keeps the journal in memory.
    pub root: Option<PathBuf>,
    pub durability: WriteDurability,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: None,
            durability: WriteDurability::default(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml::de::Error,
    },
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read config {path:?}: {source}"),
            Self::Toml {
                path: Some(path),
                source,
            } => write!(f, "invalid config {path:?}: {source}"),
            Self::Toml { path: None, source } => write!(f, "invalid config: {source}"),
            Self::Invalid { field, reason } => write!(f, "invalid config value for {field}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Toml { source, .. } => Some(source),
            Self::Invalid { .. } => None,
        }
    }
}

impl EditorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(raw).map_err(|source| ConfigError::Toml { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!("reading editor config from {:?}", path);
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Toml {
            path: Some(path.to_path_buf()),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "history_capacity",
                reason: "must be at least 1",
            });
        }
        if !(self.graph.position_epsilon >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "graph.position_epsilon",
                reason: "must be a non-negative number",
            });
        }
        if !(self.graph.stack_spacing > 0.0) {
            return Err(ConfigError::Invalid {
                field: "graph.stack_spacing",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Opens the configured journal backend.
    ///
    /// Fails with `PersistenceUnavailable` when an on-disk root cannot be opened; callers are
    /// expected to continue memory-only in that case.
    pub fn open_journal(&self) -> Result<Arc<dyn JournalStore>, JournalError> {
        if !self.journal.enabled {
            tracing::info!("journal disabled by configuration");
            return Ok(Arc::new(DisabledJournal));
        }
        match &self.journal.root {
            Some(root) => {
                let journal = FolderJournal::open(root, self.journal.durability)?;
                Ok(Arc::new(journal))
            }
            None => Ok(Arc::new(MemoryJournal::default())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EditorConfig};
    use crate::store::WriteDurability;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = EditorConfig::from_toml_str("").expect("config");
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.history_capacity, 50);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
history_capacity = 10

[graph]
position_epsilon = 2.0

[journal]
root = "/tmp/journal"
durability = "durable"
"#,
        )
        .expect("config");

        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.graph.position_epsilon, 2.0);
        assert_eq!(config.graph.label_preview_chars, 32);
        assert!(config.journal.enabled);
        assert_eq!(config.journal.durability, WriteDurability::Durable);
    }

    #[test]
    fn zero_history_capacity_is_rejected() {
        let err = EditorConfig::from_toml_str("history_capacity = 0").expect_err("invalid");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "history_capacity",
                ..
            }
        ));
    }

    #[test]
    fn disabled_journal_reports_unavailable() {
        let config = EditorConfig::from_toml_str("[journal]\nenabled = false").expect("config");
        let journal = config.open_journal().expect("journal handle");
        let doc_id = crate::model::DocumentId::new("doc").expect("doc id");
        assert!(journal.read_document(&doc_id).is_err());
    }
}
