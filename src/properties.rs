//! [crate::properties] contains the node and relation types that make up a
//! [crate::docgraph::DocumentGraph].
//!
//! Every node shares a [NodeBase]. The three concrete shapes ([EpicNode], [FeatureNode],
//! [ScenarioNode]) are carried by the [DocumentNode] tagged union, so code that needs to treat
//! node types differently matches on it exhaustively.
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::error::LamadError;

/// Open metadata mapping attached to every node.
pub type Metadata = BTreeMap<String, serde_json::Value>;

pub const META_CATEGORY: &str = "category";
pub const META_CONTENT_HASH: &str = "contentHash";
pub const META_FEATURE_ID: &str = "featureId";
pub const META_SCENARIO_COUNT: &str = "scenarioCount";
pub const META_EPIC_ALIAS: &str = "epic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Epic,
    Feature,
    Scenario,
}

impl NodeType {
    pub const ALL: [NodeType; 3] = [NodeType::Epic, NodeType::Feature, NodeType::Scenario];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Epic => "epic",
            NodeType::Feature => "feature",
            NodeType::Scenario => "scenario",
        }
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = LamadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "epic" => Ok(NodeType::Epic),
            "feature" => Ok(NodeType::Feature),
            "scenario" => Ok(NodeType::Scenario),
            other => Err(LamadError::NotFound(format!("unknown node type '{other}'"))),
        }
    }
}

/// Fields shared by every node type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBase {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Ordered, may repeat. Stored without a leading `@`.
    pub tags: Vec<String>,
    pub source_path: String,
    /// Raw source text this node was compiled from.
    pub content: String,
    /// Ordered and deduplicated. Entries may name nodes that do not exist.
    pub related_node_ids: Vec<String>,
    pub metadata: Metadata,
}

impl NodeBase {
    pub fn new(id: impl Into<String>, source_path: impl Into<String>) -> Self {
        NodeBase {
            id: id.into(),
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    /// Appends `id` to `related_node_ids` unless it is already present or names this node.
    pub fn push_related(&mut self, id: impl Into<String>) {
        let id = id.into();
        if id != self.id && !self.related_node_ids.contains(&id) {
            self.related_node_ids.push(id);
        }
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl StepKeyword {
    pub const ALL: [StepKeyword; 5] = [
        StepKeyword::Given,
        StepKeyword::When,
        StepKeyword::Then,
        StepKeyword::And,
        StepKeyword::But,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKeyword::Given => "Given",
            StepKeyword::When => "When",
            StepKeyword::Then => "Then",
            StepKeyword::And => "And",
            StepKeyword::But => "But",
        }
    }
}

impl Display for StepKeyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKeyword {
    type Err = LamadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKeyword::ALL
            .into_iter()
            .find(|kw| kw.as_str() == s)
            .ok_or_else(|| LamadError::Codec(format!("'{s}' is not a step keyword")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GherkinStep {
    pub keyword: StepKeyword,
    pub text: String,
}

impl GherkinStep {
    pub fn new(keyword: StepKeyword, text: impl Into<String>) -> Self {
        GherkinStep {
            keyword,
            text: text.into(),
        }
    }
}

/// A scenario outline's `Examples:` table.
///
/// Every row has exactly `headers.len()` cells; [ExamplesTable::push_row] refuses anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamplesTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ExamplesTable {
    pub fn new(headers: Vec<String>) -> Self {
        ExamplesTable {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Returns false, leaving the table untouched, when the row is misaligned with the headers.
    pub fn push_row(&mut self, row: Vec<String>) -> bool {
        if row.len() != self.headers.len() {
            return false;
        }
        self.rows.push(row);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Scenario,
    ScenarioOutline,
}

/// A heading within an epic's Markdown body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    /// Stable deep-link slug, unique within its epic.
    pub anchor: String,
    /// 1 to 6
    pub level: u8,
    /// Body text owned by this heading, up to the next heading.
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub markdown_content: String,
    pub sections: Vec<Section>,
    pub feature_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub category: String,
    pub epic_ids: Vec<String>,
    /// In source order.
    pub scenario_ids: Vec<String>,
    pub feature_description: String,
    pub background: Option<Vec<GherkinStep>>,
    /// Verbatim input text.
    pub gherkin_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioNode {
    #[serde(flatten)]
    pub base: NodeBase,
    pub feature_id: String,
    pub epic_ids: Vec<String>,
    pub scenario_type: ScenarioType,
    pub steps: Vec<GherkinStep>,
    pub examples: Option<Vec<ExamplesTable>>,
}

/// A compiled documentation node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocumentNode {
    Epic(EpicNode),
    Feature(FeatureNode),
    Scenario(ScenarioNode),
}

impl DocumentNode {
    pub fn base(&self) -> &NodeBase {
        match self {
            DocumentNode::Epic(epic) => &epic.base,
            DocumentNode::Feature(feature) => &feature.base,
            DocumentNode::Scenario(scenario) => &scenario.base,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            DocumentNode::Epic(_) => NodeType::Epic,
            DocumentNode::Feature(_) => NodeType::Feature,
            DocumentNode::Scenario(_) => NodeType::Scenario,
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    pub fn title(&self) -> &str {
        &self.base().title
    }

    pub fn description(&self) -> &str {
        &self.base().description
    }

    pub fn tags(&self) -> &[String] {
        &self.base().tags
    }

    pub fn source_path(&self) -> &str {
        &self.base().source_path
    }

    pub fn related_node_ids(&self) -> &[String] {
        &self.base().related_node_ids
    }

    /// Ids of epics this node declares membership in.
    pub fn epic_ids(&self) -> &[String] {
        match self {
            DocumentNode::Epic(_) => &[],
            DocumentNode::Feature(feature) => &feature.epic_ids,
            DocumentNode::Scenario(scenario) => &scenario.epic_ids,
        }
    }

    pub fn as_epic(&self) -> Option<&EpicNode> {
        match self {
            DocumentNode::Epic(epic) => Some(epic),
            _ => None,
        }
    }

    pub fn as_feature(&self) -> Option<&FeatureNode> {
        match self {
            DocumentNode::Feature(feature) => Some(feature),
            _ => None,
        }
    }

    pub fn as_scenario(&self) -> Option<&ScenarioNode> {
        match self {
            DocumentNode::Scenario(scenario) => Some(scenario),
            _ => None,
        }
    }
}

impl From<EpicNode> for DocumentNode {
    fn from(node: EpicNode) -> Self {
        DocumentNode::Epic(node)
    }
}

impl From<FeatureNode> for DocumentNode {
    fn from(node: FeatureNode) -> Self {
        DocumentNode::Feature(node)
    }
}

impl From<ScenarioNode> for DocumentNode {
    fn from(node: ScenarioNode) -> Self {
        DocumentNode::Scenario(node)
    }
}

impl Display for DocumentNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.node_type(), self.title(), self.id())
    }
}

/// Typed edge kinds in the relation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Epic to feature, feature to scenario.
    Contains,
    /// Scenario to its feature, and feature or scenario to each epic named by an `epic:` tag.
    BelongsTo,
    /// Any other resolved `related_node_ids` entry.
    References,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub from_id: String,
    pub to_id: String,
    pub relation_kind: RelationKind,
}

impl Relation {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, kind: RelationKind) -> Self {
        Relation {
            from_id: from_id.into(),
            to_id: to_id.into(),
            relation_kind: kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_table_rejects_misaligned_rows() {
        let mut table = ExamplesTable::new(vec!["a".to_string(), "b".to_string()]);
        assert!(table.push_row(vec!["1".to_string(), "2".to_string()]));
        assert!(!table.push_row(vec!["x".to_string()]));
        assert_eq!(table.rows(), &[vec!["1".to_string(), "2".to_string()]]);
    }

    #[test]
    fn test_push_related_deduplicates_and_skips_self() {
        let mut base = NodeBase::new("feature_auth_login", "auth/login.feature");
        base.push_related("scenario_a");
        base.push_related("scenario_a");
        base.push_related("feature_auth_login");
        base.push_related("auth");
        assert_eq!(base.related_node_ids, vec!["scenario_a", "auth"]);
    }

    #[test]
    fn test_document_node_serializes_with_type_discriminant() {
        let node = DocumentNode::from(FeatureNode {
            base: NodeBase::new("feature_auth_login", "auth/login.feature"),
            category: "auth".to_string(),
            ..Default::default()
        });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "feature");
        assert_eq!(json["sourcePath"], "auth/login.feature");
        let back: DocumentNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_step_keyword_from_str() {
        assert_eq!("Given".parse::<StepKeyword>().unwrap(), StepKeyword::Given);
        assert!("given".parse::<StepKeyword>().is_err());
        assert!("Scenario".parse::<StepKeyword>().is_err());
    }
}
