//! The typed relation table.
//!
//! Relations are parsed out of tags and explicit id lists once, when a graph is assembled, and
//! stored here as directed, typed edges. Neighbour lists are reported in edge insertion order,
//! which follows node build order.

use petgraph::{graph::NodeIndex, visit::EdgeRef, Direction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::properties::{Relation, RelationKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationGraph {
    graph: petgraph::Graph<String, RelationKind>,
    id_to_index: BTreeMap<String, NodeIndex>,
}

impl Default for RelationGraph {
    fn default() -> Self {
        RelationGraph {
            graph: petgraph::Graph::new(),
            id_to_index: BTreeMap::new(),
        }
    }
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_relations<I>(relations: I) -> Self
    where
        I: IntoIterator<Item = Relation>,
    {
        let mut graph = RelationGraph::new();
        for relation in relations {
            graph.add_relation(&relation);
        }
        graph
    }

    pub fn as_graph(&self) -> &petgraph::Graph<String, RelationKind> {
        &self.graph
    }

    pub fn add_node(&mut self, id: &str) -> NodeIndex {
        if let Some(idx) = self.id_to_index.get(id) {
            return *idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.id_to_index.insert(id.to_string(), idx);
        idx
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    /// Add `relation` unless an identical edge already exists. Returns whether it was added.
    pub fn add_relation(&mut self, relation: &Relation) -> bool {
        let from = self.add_node(&relation.from_id);
        let to = self.add_node(&relation.to_id);
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == relation.relation_kind);
        if exists {
            return false;
        }
        self.graph.add_edge(from, to, relation.relation_kind);
        true
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All relations in insertion order.
    pub fn relations(&self) -> Vec<Relation> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| {
                Relation::new(
                    self.graph[edge.source()].clone(),
                    self.graph[edge.target()].clone(),
                    edge.weight,
                )
            })
            .collect()
    }

    fn neighbors(&self, id: &str, kind: Option<RelationKind>, dir: Direction) -> Vec<&str> {
        let Some(idx) = self.id_to_index.get(id) else {
            return Vec::new();
        };
        // petgraph yields adjacent edges newest first
        let mut edges = self
            .graph
            .edges_directed(*idx, dir)
            .filter(|edge| kind.map(|k| *edge.weight() == k).unwrap_or(true))
            .map(|edge| {
                let other = match dir {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                (edge.id().index(), other)
            })
            .collect::<Vec<_>>();
        edges.sort_by_key(|(edge_idx, _)| *edge_idx);
        edges
            .into_iter()
            .map(|(_, other)| self.graph[other].as_str())
            .collect()
    }

    /// Targets of edges leaving `id`, optionally restricted to one kind.
    pub fn outgoing(&self, id: &str, kind: Option<RelationKind>) -> Vec<&str> {
        self.neighbors(id, kind, Direction::Outgoing)
    }

    /// Sources of edges arriving at `id`, optionally restricted to one kind.
    pub fn incoming(&self, id: &str, kind: Option<RelationKind>) -> Vec<&str> {
        self.neighbors(id, kind, Direction::Incoming)
    }

    /// Depth-first preorder over `kind` edges starting below `id`. The start node is not
    /// included and each node is visited once.
    pub fn descendants(&self, id: &str, kind: RelationKind) -> Vec<&str> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        if !self.contains_node(id) {
            return order;
        }
        visited.insert(id);
        let mut stack: Vec<&str> = self.outgoing(id, Some(kind)).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            stack.extend(self.outgoing(current, Some(kind)).into_iter().rev());
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RelationGraph {
        RelationGraph::from_relations(vec![
            Relation::new("epic", "f1", RelationKind::Contains),
            Relation::new("epic", "f2", RelationKind::Contains),
            Relation::new("f1", "s1", RelationKind::Contains),
            Relation::new("f1", "s2", RelationKind::Contains),
            Relation::new("f2", "s3", RelationKind::Contains),
            Relation::new("f1", "epic", RelationKind::BelongsTo),
            Relation::new("s3", "f1", RelationKind::References),
        ])
    }

    #[test]
    fn test_neighbours_keep_insertion_order() {
        let graph = sample();
        assert_eq!(graph.outgoing("epic", None), vec!["f1", "f2"]);
        assert_eq!(graph.outgoing("f1", Some(RelationKind::Contains)), vec!["s1", "s2"]);
        assert_eq!(graph.incoming("f1", None), vec!["epic", "s3"]);
        assert!(graph.outgoing("missing", None).is_empty());
    }

    #[test]
    fn test_duplicate_edges_are_ignored() {
        let mut graph = sample();
        let count = graph.relation_count();
        assert!(!graph.add_relation(&Relation::new("epic", "f1", RelationKind::Contains)));
        assert!(graph.add_relation(&Relation::new("epic", "f1", RelationKind::References)));
        assert_eq!(graph.relation_count(), count + 1);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut graph = sample();
        // A cycle must not loop forever
        graph.add_relation(&Relation::new("s3", "epic", RelationKind::Contains));
        assert_eq!(
            graph.descendants("epic", RelationKind::Contains),
            vec!["f1", "s1", "s2", "f2", "s3"]
        );
        assert!(graph.descendants("s1", RelationKind::Contains).is_empty());
    }
}
