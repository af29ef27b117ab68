use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use super::{graph::RelationGraph, search::SearchIndex};
use crate::{
    codec::{
        compiler::{ArtifactSource, CompileOutput, DocumentCompiler, ParseResult},
        ParseDiagnostic, UnresolvedReference,
    },
    error::LamadError,
    paths::parent_dir_name,
    properties::{
        DocumentNode, EpicNode, FeatureNode, NodeType, Relation, RelationKind, ScenarioNode,
        META_EPIC_ALIAS,
    },
};

/// Build statistics carried with every graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub built_at: DateTime<Utc>,
    pub node_count: usize,
    pub epic_count: usize,
    pub feature_count: usize,
    pub scenario_count: usize,
    pub relation_count: usize,
    pub unresolved_count: usize,
}

/// An immutable, fully indexed documentation graph.
///
/// Nodes keep their build order: epics, then features, then scenarios, each in the order they
/// were handed to [build_graph]. Related ids are stored as written and resolved when queried;
/// ids that name no node are reported in [DocumentGraph::diagnostics] and otherwise ignored.
#[derive(Debug, Clone)]
pub struct DocumentGraph {
    nodes: Vec<Arc<DocumentNode>>,
    index: HashMap<String, usize>,
    by_type: BTreeMap<NodeType, Vec<usize>>,
    aliases: HashMap<String, String>,
    search: SearchIndex,
    relations: RelationGraph,
    diagnostics: Vec<ParseDiagnostic>,
    parse_results: Vec<ParseResult>,
    metadata: GraphMetadata,
}

/// Assemble a graph. A repeated id anywhere in the input fails the whole build.
#[tracing::instrument(skip_all)]
pub fn build_graph(
    epics: Vec<EpicNode>,
    features: Vec<FeatureNode>,
    scenarios: Vec<ScenarioNode>,
) -> Result<DocumentGraph, LamadError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let bases = epics
        .iter()
        .map(|e| &e.base)
        .chain(features.iter().map(|f| &f.base))
        .chain(scenarios.iter().map(|s| &s.base));
    for base in bases {
        if let Some(first_path) = seen.insert(&base.id, &base.source_path) {
            tracing::warn!(
                "[build_graph] duplicate node id '{}' in {} and {}",
                base.id,
                first_path,
                base.source_path
            );
            return Err(LamadError::DuplicateNodeId {
                id: base.id.clone(),
                first_path: first_path.to_string(),
                second_path: base.source_path.clone(),
            });
        }
    }

    let aliases = epic_aliases(&epics);
    let mut epics = epics;
    attach_tagged_features(&mut epics, &features, &aliases);

    let mut graph = DocumentGraph {
        nodes: Vec::with_capacity(epics.len() + features.len() + scenarios.len()),
        index: HashMap::new(),
        by_type: BTreeMap::new(),
        aliases,
        search: SearchIndex::new(),
        relations: RelationGraph::new(),
        diagnostics: Vec::new(),
        parse_results: Vec::new(),
        metadata: GraphMetadata {
            built_at: Utc::now(),
            node_count: 0,
            epic_count: epics.len(),
            feature_count: features.len(),
            scenario_count: scenarios.len(),
            relation_count: 0,
            unresolved_count: 0,
        },
    };
    let nodes = epics
        .into_iter()
        .map(DocumentNode::from)
        .chain(features.into_iter().map(DocumentNode::from))
        .chain(scenarios.into_iter().map(DocumentNode::from));
    for node in nodes {
        graph.insert(node);
    }
    graph.resolve_relations();

    graph.metadata.node_count = graph.nodes.len();
    graph.metadata.relation_count = graph.relations.relation_count();
    graph.metadata.unresolved_count = graph.diagnostics.len();
    tracing::info!(
        "[build_graph] {} nodes ({} epics, {} features, {} scenarios), {} relations, {} unresolved",
        graph.metadata.node_count,
        graph.metadata.epic_count,
        graph.metadata.feature_count,
        graph.metadata.scenario_count,
        graph.metadata.relation_count,
        graph.metadata.unresolved_count
    );
    Ok(graph)
}

/// Compile `source` and assemble the result. Per-file failures are kept in
/// [DocumentGraph::parse_results]; only listing failures and duplicate ids are errors.
pub fn build_from_source<S: ArtifactSource + ?Sized>(
    compiler: &DocumentCompiler,
    source: &S,
) -> Result<DocumentGraph, LamadError> {
    DocumentGraph::from_compile(compiler.compile(source)?)
}

/// Every name an `epic:` tag may use for an epic: its id, its front-matter alias and the
/// directory holding its file. Ids win over aliases, earlier epics over later ones.
fn epic_aliases(epics: &[EpicNode]) -> HashMap<String, String> {
    let mut aliases: HashMap<String, String> = epics
        .iter()
        .map(|e| (e.base.id.clone(), e.base.id.clone()))
        .collect();
    for epic in epics {
        let names = [
            epic.base.meta_str(META_EPIC_ALIAS).map(str::to_string),
            parent_dir_name(&epic.base.source_path),
        ];
        for name in names.into_iter().flatten() {
            aliases
                .entry(name)
                .or_insert_with(|| epic.base.id.clone());
        }
    }
    aliases
}

fn attach_tagged_features(
    epics: &mut [EpicNode],
    features: &[FeatureNode],
    aliases: &HashMap<String, String>,
) {
    let positions: HashMap<String, usize> = epics
        .iter()
        .enumerate()
        .map(|(idx, e)| (e.base.id.clone(), idx))
        .collect();
    for feature in features {
        for epic_ref in feature.epic_ids.iter() {
            let Some(epic_idx) = aliases.get(epic_ref).and_then(|id| positions.get(id)) else {
                continue;
            };
            let epic = &mut epics[*epic_idx];
            if !epic.feature_ids.contains(&feature.base.id) {
                epic.feature_ids.push(feature.base.id.clone());
            }
        }
    }
}

impl DocumentGraph {
    pub fn from_compile(output: CompileOutput) -> Result<DocumentGraph, LamadError> {
        let CompileOutput {
            epics,
            features,
            scenarios,
            results,
        } = output;
        let mut graph = build_graph(epics, features, scenarios)?;
        graph.parse_results = results;
        Ok(graph)
    }

    fn insert(&mut self, node: DocumentNode) {
        let position = self.nodes.len();
        self.index.insert(node.id().to_string(), position);
        self.by_type.entry(node.node_type()).or_default().push(position);
        self.search.insert(position, &node);
        self.relations.add_node(node.id());
        self.nodes.push(Arc::new(node));
    }

    /// Id of the node `reference` names, directly or through an epic alias.
    pub fn resolve_id(&self, reference: &str) -> Option<&str> {
        if let Some(position) = self.index.get(reference) {
            return Some(self.nodes[*position].id());
        }
        self.aliases
            .get(reference)
            .filter(|id| self.index.contains_key(id.as_str()))
            .map(String::as_str)
    }

    fn resolve_relations(&mut self) {
        let mut relations = Vec::new();
        let mut unresolved = Vec::new();
        for node in self.nodes.iter() {
            let from = node.id();
            let mut typed: Vec<(&str, RelationKind)> = Vec::new();
            match node.as_ref() {
                DocumentNode::Epic(epic) => {
                    typed.extend(epic.feature_ids.iter().map(|f| (f.as_str(), RelationKind::Contains)));
                }
                DocumentNode::Feature(feature) => {
                    typed.extend(
                        feature
                            .scenario_ids
                            .iter()
                            .map(|s| (s.as_str(), RelationKind::Contains)),
                    );
                    typed.extend(feature.epic_ids.iter().map(|e| (e.as_str(), RelationKind::BelongsTo)));
                }
                DocumentNode::Scenario(scenario) => {
                    typed.push((scenario.feature_id.as_str(), RelationKind::BelongsTo));
                    typed.extend(scenario.epic_ids.iter().map(|e| (e.as_str(), RelationKind::BelongsTo)));
                }
            }
            let declared: HashSet<&str> = typed.iter().map(|(id, _)| *id).collect();
            typed.extend(
                node.related_node_ids()
                    .iter()
                    .map(String::as_str)
                    .filter(|id| !declared.contains(id))
                    .map(|id| (id, RelationKind::References)),
            );

            for (target, kind) in typed {
                match self.resolve_id(target) {
                    Some(to) if to != from => relations.push(Relation::new(from, to, kind)),
                    Some(_) => {}
                    None => unresolved.push(UnresolvedReference::new(
                        from,
                        target,
                        node.source_path(),
                        kind,
                    )),
                }
            }
        }
        for relation in relations.iter() {
            self.relations.add_relation(relation);
        }
        for reference in unresolved {
            tracing::debug!(
                "[build_graph] unresolved reference {} -> {} ({:?})",
                reference.from_id,
                reference.target_id,
                reference.relation_kind
            );
            self.diagnostics
                .push(ParseDiagnostic::UnresolvedReference(reference));
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<DocumentNode>> {
        self.index.get(id).map(|position| &self.nodes[*position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in build order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<DocumentNode>> {
        self.nodes.iter()
    }

    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Arc<DocumentNode>> {
        self.by_type
            .get(&node_type)
            .into_iter()
            .flatten()
            .map(|position| &self.nodes[*position])
    }

    /// Related nodes of `id` in `related_node_ids` order. Unresolved ids are skipped, and an id
    /// reached twice (directly and through an alias) is reported once.
    pub fn related(&self, id: &str) -> Vec<&Arc<DocumentNode>> {
        let Some(node) = self.get(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.related_node_ids()
            .iter()
            .filter_map(|related| self.resolve_id(related))
            .filter(|resolved| seen.insert(*resolved))
            .filter_map(|resolved| self.get(resolved))
            .collect()
    }

    /// Nodes matching `query`, best match first.
    pub fn search(&self, query: &str) -> Vec<&Arc<DocumentNode>> {
        self.search
            .search(query)
            .into_iter()
            .map(|(position, _)| &self.nodes[position])
            .collect()
    }

    /// Everything reachable from `id` over containment edges, depth first.
    pub fn descendants(&self, id: &str) -> Vec<&Arc<DocumentNode>> {
        self.relations
            .descendants(id, RelationKind::Contains)
            .into_iter()
            .filter_map(|descendant| self.get(descendant))
            .collect()
    }

    /// Resolved relations leaving `id`, optionally restricted to one kind.
    pub fn relations_from(&self, id: &str, kind: Option<RelationKind>) -> Vec<&Arc<DocumentNode>> {
        self.relations
            .outgoing(id, kind)
            .into_iter()
            .filter_map(|target| self.get(target))
            .collect()
    }

    /// Resolved relations arriving at `id`, optionally restricted to one kind.
    pub fn relations_to(&self, id: &str, kind: Option<RelationKind>) -> Vec<&Arc<DocumentNode>> {
        self.relations
            .incoming(id, kind)
            .into_iter()
            .filter_map(|source| self.get(source))
            .collect()
    }

    pub fn relation_graph(&self) -> &RelationGraph {
        &self.relations
    }

    pub fn relations(&self) -> Vec<Relation> {
        self.relations.relations()
    }

    /// Unresolved references found while assembling.
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    pub fn unresolved_references(&self) -> impl Iterator<Item = &UnresolvedReference> {
        self.diagnostics
            .iter()
            .filter_map(ParseDiagnostic::as_unresolved_reference)
    }

    /// Per-artifact outcomes when the graph was built through [DocumentGraph::from_compile].
    pub fn parse_results(&self) -> &[ParseResult] {
        &self.parse_results
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    pub fn search_index(&self) -> &SearchIndex {
        &self.search
    }
}
