// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nereid and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document <-> graph synchronization.
//!
//! `project` builds a graph from a document, `reify` rebuilds the document from a graph, and the
//! `links`/`derived` helpers keep edges and test nodes aligned with the document records after
//! every mutation.

pub(crate) mod derived;
pub(crate) mod links;
pub mod project;
pub mod reify;

pub use project::project;
pub use reify::reify;

/// Truncated preview of a choice's text, used as the edge label.
pub fn preview_label(text: &str, max_chars: usize) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        None => Some(text.to_owned()),
        Some((cut, _)) => {
            let mut label = text[..cut].trim_end().to_owned();
            label.push('…');
            Some(label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::preview_label;

    #[test]
    fn preview_label_truncates_on_char_boundaries() {
        assert_eq!(preview_label("Go", 32), Some("Go".to_owned()));
        assert_eq!(preview_label("  ", 32), None);
        assert_eq!(preview_label("abcdef", 3), Some("abc…".to_owned()));
        assert_eq!(preview_label("héllo wörld", 5), Some("héllo…".to_owned()));
        assert_eq!(preview_label("abc", 3), Some("abc".to_owned()));
    }
}
