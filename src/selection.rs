//! Rules deciding which content is exported as a Gherkin feature, and where it is filed.
//!
//! The rules apply to anything [Classifiable]: compiled [DocumentNode]s as well as
//! [ContentRecord]s fetched from a content service.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{paths::DEFAULT_CATEGORY, properties::DocumentNode};

pub const GHERKIN_FORMAT: &str = "gherkin";
pub const MARKDOWN_FORMAT: &str = "markdown";

/// Checked in order against tags when no explicit category or epic tag is present.
pub const PRODUCT_KEYWORDS: [&str; 6] = [
    "lamad",
    "shefa",
    "imagodei",
    "doorway",
    "navigation",
    "smoke",
];

static LABELLED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^@?(category|epic):\s*(\S.*)$").expect("constant regex")
});

/// The fields the selection rules look at.
pub trait Classifiable {
    fn content_format(&self) -> &str;
    fn content_type(&self) -> &str;
    fn tags(&self) -> &[String];
}

impl Classifiable for DocumentNode {
    fn content_format(&self) -> &str {
        match self {
            DocumentNode::Epic(_) => MARKDOWN_FORMAT,
            DocumentNode::Feature(_) | DocumentNode::Scenario(_) => GHERKIN_FORMAT,
        }
    }

    fn content_type(&self) -> &str {
        self.node_type().as_str()
    }

    fn tags(&self) -> &[String] {
        DocumentNode::tags(self)
    }
}

/// A content node as served by an external content store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content_format: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// The document body; Gherkin text for feature content.
    #[serde(default)]
    pub content: String,
}

impl Classifiable for ContentRecord {
    fn content_format(&self) -> &str {
        &self.content_format
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Trim, drop a leading `@` and case-fold.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('@').to_lowercase()
}

pub fn is_gherkin_feature<T: Classifiable + ?Sized>(node: &T) -> bool {
    node.content_format().eq_ignore_ascii_case(GHERKIN_FORMAT)
        || ["feature", "scenario"]
            .iter()
            .any(|t| node.content_type().eq_ignore_ascii_case(t))
}

/// True when `filter_tags` is empty, or when some filter tag is a substring of some node tag.
///
/// Filter tags that normalize to nothing (`"@"`, whitespace) are ignored. A non-empty filter list
/// made only of such tags matches no node.
pub fn matches_tags<T, S>(node: &T, filter_tags: &[S]) -> bool
where
    T: Classifiable + ?Sized,
    S: AsRef<str>,
{
    if filter_tags.is_empty() {
        return true;
    }
    let filters: Vec<String> = filter_tags
        .iter()
        .map(|t| normalize_tag(t.as_ref()))
        .filter(|t| !t.is_empty())
        .collect();
    if filters.is_empty() {
        return false;
    }
    let tags: Vec<String> = node.tags().iter().map(|t| normalize_tag(t)).collect();
    filters
        .iter()
        .any(|filter| tags.iter().any(|tag| tag.contains(filter.as_str())))
}

fn labelled<'a>(tags: &'a [String], label: &str) -> Option<&'a str> {
    tags.iter().find_map(|tag| {
        let captures = LABELLED_TAG.captures(tag.trim())?;
        let found = captures.get(1)?.as_str();
        if found.eq_ignore_ascii_case(label) {
            captures.get(2).map(|value| value.as_str().trim())
        } else {
            None
        }
    })
}

/// The export category: an explicit `category:` tag, else an `epic:` tag, else the first
/// [PRODUCT_KEYWORDS] entry found inside a tag, else [DEFAULT_CATEGORY].
pub fn categorize_feature<T: Classifiable + ?Sized>(node: &T) -> String {
    let tags = node.tags();
    if let Some(category) = labelled(tags, "category") {
        return category.to_string();
    }
    if let Some(epic) = labelled(tags, "epic") {
        return epic.to_string();
    }
    let normalized: Vec<String> = tags.iter().map(|t| normalize_tag(t)).collect();
    PRODUCT_KEYWORDS
        .iter()
        .find(|keyword| normalized.iter().any(|tag| tag.contains(**keyword)))
        .map(|keyword| keyword.to_string())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
}
