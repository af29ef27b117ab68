use std::collections::{BTreeSet, HashMap};

use crate::properties::DocumentNode;

/// Case-fold `text` and split it on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverted index from token to the build positions of the nodes carrying it.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    postings: HashMap<String, BTreeSet<usize>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the title, description and tags of the node at build position `position`.
    pub fn insert(&mut self, position: usize, node: &DocumentNode) {
        let fields = [node.title(), node.description()]
            .into_iter()
            .chain(node.tags().iter().map(String::as_str));
        for field in fields {
            for token in tokenize(field) {
                self.postings.entry(token).or_default().insert(position);
            }
        }
    }

    pub fn token_count(&self) -> usize {
        self.postings.len()
    }

    pub fn positions(&self, token: &str) -> Option<&BTreeSet<usize>> {
        self.postings.get(token)
    }

    /// `(position, score)` pairs, where score is the number of distinct query tokens the node
    /// carries. Highest score first, ties in build order.
    pub fn search(&self, query: &str) -> Vec<(usize, usize)> {
        let mut tokens = tokenize(query);
        tokens.sort();
        tokens.dedup();

        let mut scores: HashMap<usize, usize> = HashMap::new();
        for token in tokens.iter() {
            if let Some(positions) = self.postings.get(token) {
                for position in positions {
                    *scores.entry(*position).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(usize, usize)> = scores.into_iter().collect();
        ranked.sort_by(|(pos_a, score_a), (pos_b, score_b)| {
            score_b.cmp(score_a).then(pos_a.cmp(pos_b))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{FeatureNode, NodeBase};

    fn node(id: &str, title: &str, tags: &[&str]) -> DocumentNode {
        let mut base = NodeBase::new(id, "x/y.feature");
        base.title = title.to_string();
        base.tags = tags.iter().map(|t| t.to_string()).collect();
        FeatureNode {
            base,
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Log-in: VALID credentials!"), vec!["log", "in", "valid", "credentials"]);
        assert!(tokenize("  -- ").is_empty());
        assert_eq!(tokenize("epic:auth"), vec!["epic", "auth"]);
    }

    #[test]
    fn test_search_ranks_by_overlap_then_build_order() {
        let mut index = SearchIndex::new();
        index.insert(0, &node("a", "Login page", &[]));
        index.insert(1, &node("b", "Login with valid credentials", &["smoke"]));
        index.insert(2, &node("c", "Logout", &["login"]));
        assert_eq!(index.search("valid login"), vec![(1, 2), (0, 1), (2, 1)]);
        assert_eq!(index.search("LOGIN login"), vec![(0, 1), (1, 1), (2, 1)]);
        assert!(index.search("   ").is_empty());
        assert!(index.search("nothing").is_empty());
    }
}
