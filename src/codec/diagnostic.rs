//! Diagnostic types for document parsing and reference resolution.
//!
//! Diagnostics are non-fatal. The Gherkin codec emits them for lines it skipped and example rows
//! it dropped; the graph assembler emits [UnresolvedReference]s for related ids that name no node.

use std::fmt;

use crate::properties::RelationKind;

/// A reference to a node id that is not present in the graph.
///
/// Unresolved references are tolerated: queries simply omit them. They are kept so callers can
/// report them.
///
/// # Examples
///
/// ```
/// # use lamad_core::{codec::UnresolvedReference, properties::RelationKind};
/// let unresolved = UnresolvedReference::new(
///     "feature_auth_login",
///     "auth",
///     "auth/login.feature",
///     RelationKind::BelongsTo,
/// );
/// assert_eq!(unresolved.target_id, "auth");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    /// The node holding the reference
    pub from_id: String,

    /// The id that could not be resolved
    pub target_id: String,

    /// Source file of the referencing node
    pub source_path: String,

    /// How the reference would have been related had it resolved
    pub relation_kind: RelationKind,
}

impl UnresolvedReference {
    pub fn new(
        from_id: impl Into<String>,
        target_id: impl Into<String>,
        source_path: impl Into<String>,
        relation_kind: RelationKind,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            target_id: target_id.into(),
            source_path: source_path.into(),
            relation_kind,
        }
    }
}

/// Diagnostic information produced while parsing a source artifact or assembling a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDiagnostic {
    /// A related id that names no node in the graph.
    UnresolvedReference(UnresolvedReference),

    /// A line the parser did not recognise and stepped over. Only reported in strict mode.
    SkippedLine {
        /// 1-based line number
        line: usize,
        text: String,
    },

    /// Something was dropped or degraded (e.g. a misaligned example row).
    Warning(String),

    /// An informational message about the parse
    Info(String),
}

impl ParseDiagnostic {
    pub fn skipped_line(line: usize, text: impl Into<String>) -> Self {
        Self::SkippedLine {
            line,
            text: text.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info(message.into())
    }

    pub fn is_skipped_line(&self) -> bool {
        matches!(self, Self::SkippedLine { .. })
    }

    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, Self::UnresolvedReference(_))
    }

    pub fn as_unresolved_reference(&self) -> Option<&UnresolvedReference> {
        match self {
            Self::UnresolvedReference(unresolved) => Some(unresolved),
            _ => None,
        }
    }

    /// Whether this diagnostic should be surfaced as a warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::SkippedLine { .. } | Self::Warning(_))
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference(unresolved) => write!(
                f,
                "Unresolved reference in {:?}: {} -> {} ({:?})",
                unresolved.source_path,
                unresolved.from_id,
                unresolved.target_id,
                unresolved.relation_kind
            ),
            Self::SkippedLine { line, text } => write!(f, "Skipped line {line}: {text:?}"),
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::Info(msg) => write!(f, "Info: {msg}"),
        }
    }
}
