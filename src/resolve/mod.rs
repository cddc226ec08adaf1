//! Element resolution engine
//!
//! The target UI is obfuscated, frame-heavy and re-renders at will, so
//! nothing here trusts a single selector. Discovery runs as a cascade:
//! ranked candidate descriptors first, then label proximity, then a generic
//! interactive-role scan - each tier returning `Option` so the orchestrator
//! decides what to try next. Every query runs against the main document
//! before any iframe, and iframe hits come back in top-level viewport
//! coordinates.

pub mod cascade;
pub mod descriptors;
pub mod frames;

pub use cascade::{pick_entry, EntrySnapshot, TargetResolver};
pub use frames::FrameEvaluator;

use std::fmt;

/// One ranked rule for finding a UI element
///
/// List position is priority: the resolver exhausts a candidate across the
/// whole document tree before moving to the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorCandidate {
    /// CSS selector
    Css(String),
    /// Visible text contains the needle (case-insensitive)
    TextContains(String),
    /// Attribute value contains the needle (case-insensitive)
    AttrContains { name: String, value: String },
}

impl SelectorCandidate {
    /// CSS selector candidate
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Text-containment candidate
    pub fn text(needle: impl Into<String>) -> Self {
        Self::TextContains(needle.into())
    }

    /// Attribute-containment candidate
    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::AttrContains {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Which document a resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentHandle {
    /// The top-level document
    Main,
    /// An iframe, by DOM registration order
    Frame { index: usize },
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main document"),
            Self::Frame { index } => write!(f, "iframe[{}]", index),
        }
    }
}

/// Which discovery tier produced a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Explicit candidate list, by index
    Candidate(usize),
    /// Label wording near an input-like descendant
    LabelProximity,
    /// Generic interactive-role scan
    GenericRole,
    /// Exact trimmed lower-cased text match
    ExactText,
    /// Text matched on a leaf; clicked its nearest clickable ancestor
    TextAncestor,
    /// Allow-listed label inside a dialog container
    DialogLabel,
    /// First labeled control inside any open dialog
    DialogAny,
    /// Fallback scan over visible editable elements
    EditableScan,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candidate(i) => write!(f, "candidate[{}]", i),
            Self::LabelProximity => write!(f, "label-proximity"),
            Self::GenericRole => write!(f, "generic-role"),
            Self::ExactText => write!(f, "exact-text"),
            Self::TextAncestor => write!(f, "text-ancestor"),
            Self::DialogLabel => write!(f, "dialog-label"),
            Self::DialogAny => write!(f, "dialog-any"),
            Self::EditableScan => write!(f, "editable-scan"),
        }
    }
}

/// A successfully resolved click/fill target
///
/// Coordinates are top-level viewport space regardless of the owning
/// document. Never cache one across polling attempts - the DOM may have
/// re-rendered underneath it.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub x: f64,
    pub y: f64,
    pub document: DocumentHandle,
    pub strategy: Strategy,
    /// Human-readable element summary for logs
    pub detail: String,
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at ({:.0}, {:.0}) in {} via {}",
            self.detail, self.x, self.y, self.document, self.strategy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_tags_render() {
        assert_eq!(Strategy::Candidate(3).to_string(), "candidate[3]");
        assert_eq!(Strategy::LabelProximity.to_string(), "label-proximity");
        assert_eq!(Strategy::GenericRole.to_string(), "generic-role");
    }

    #[test]
    fn document_handles_render() {
        assert_eq!(DocumentHandle::Main.to_string(), "main document");
        assert_eq!(DocumentHandle::Frame { index: 2 }.to_string(), "iframe[2]");
    }
}
