//! The read-only query surface over a documentation graph.
//!
//! [GraphQuery] is implemented for a built [DocumentGraph] and for a [GraphStore]. Through the
//! store every operation returns an empty result until the first build has been published;
//! callers that need to tell "not built" from "no matches" check [GraphStore::is_built].

use std::sync::Arc;

use crate::{
    docgraph::{DocumentGraph, GraphStore},
    properties::{DocumentNode, NodeType},
};

pub trait GraphQuery {
    fn get_node(&self, id: &str) -> Option<Arc<DocumentNode>>;

    /// All nodes of one type, in build order.
    fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<Arc<DocumentNode>>;

    /// The nodes named by `related_node_ids` of `id`, in that order, skipping ids that name no
    /// node.
    fn get_related_nodes(&self, id: &str) -> Vec<Arc<DocumentNode>>;

    /// Nodes sharing tokens with `query`, most shared tokens first, ties in build order. A
    /// query with no tokens matches nothing.
    fn search_nodes(&self, query: &str) -> Vec<Arc<DocumentNode>>;
}

impl GraphQuery for DocumentGraph {
    fn get_node(&self, id: &str) -> Option<Arc<DocumentNode>> {
        self.get(id).cloned()
    }

    fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<Arc<DocumentNode>> {
        self.nodes_of_type(node_type).cloned().collect()
    }

    fn get_related_nodes(&self, id: &str) -> Vec<Arc<DocumentNode>> {
        self.related(id).into_iter().cloned().collect()
    }

    fn search_nodes(&self, query: &str) -> Vec<Arc<DocumentNode>> {
        self.search(query).into_iter().cloned().collect()
    }
}

impl GraphQuery for GraphStore {
    fn get_node(&self, id: &str) -> Option<Arc<DocumentNode>> {
        self.current().and_then(|graph| graph.get_node(id))
    }

    fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<Arc<DocumentNode>> {
        self.current()
            .map(|graph| graph.get_nodes_by_type(node_type))
            .unwrap_or_default()
    }

    fn get_related_nodes(&self, id: &str) -> Vec<Arc<DocumentNode>> {
        self.current()
            .map(|graph| graph.get_related_nodes(id))
            .unwrap_or_default()
    }

    fn search_nodes(&self, query: &str) -> Vec<Arc<DocumentNode>> {
        self.current()
            .map(|graph| graph.search_nodes(query))
            .unwrap_or_default()
    }
}

impl<T: GraphQuery + ?Sized> GraphQuery for Arc<T> {
    fn get_node(&self, id: &str) -> Option<Arc<DocumentNode>> {
        self.as_ref().get_node(id)
    }

    fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<Arc<DocumentNode>> {
        self.as_ref().get_nodes_by_type(node_type)
    }

    fn get_related_nodes(&self, id: &str) -> Vec<Arc<DocumentNode>> {
        self.as_ref().get_related_nodes(id)
    }

    fn search_nodes(&self, query: &str) -> Vec<Arc<DocumentNode>> {
        self.as_ref().search_nodes(query)
    }
}
