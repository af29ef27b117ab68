//! Deterministic node id synthesis.
//!
//! [generate_id] is a pure function of `(source_path, node_type, title)`:
//!
//! ```text
//! auth/login.feature, feature                      -> feature_auth_login
//! auth/login.feature, scenario, "Valid credentials" -> scenario_auth_login_valid_credentials
//! ```
//!
//! Two different artifacts can still map to the same id (two scenarios sharing a title, or two
//! files whose last two path segments agree). Every id that ends up in a graph is therefore
//! issued through an [IdAllocator], which appends a positional suffix (`_2`, `_3`, ...) to
//! repeats. Allocation is deterministic as long as artifacts are visited in the same order.

use std::collections::{HashMap, HashSet};

use crate::{
    paths::{path_tail, strip_doc_extension, to_id_slug},
    properties::NodeType,
};

pub fn generate_id(source_path: &str, node_type: NodeType, title: Option<&str>) -> String {
    let mut tail = path_tail(source_path, 2);
    if let Some(last) = tail.last_mut() {
        *last = strip_doc_extension(last).to_string();
    }
    let mut id = node_type.as_str().to_string();
    for segment in tail.iter().map(|s| to_id_slug(s)).filter(|s| !s.is_empty()) {
        id.push('_');
        id.push_str(&segment);
    }
    if let Some(title_slug) = title.map(to_id_slug).filter(|s| !s.is_empty()) {
        id.push('_');
        id.push_str(&title_slug);
    }
    id
}

/// Hands out unique ids for one build, disambiguating repeats positionally.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    issued: HashSet<String>,
    next_suffix: HashMap<String, usize>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and reserve an id for the given artifact.
    pub fn generate(&mut self, source_path: &str, node_type: NodeType, title: Option<&str>) -> String {
        self.allocate(generate_id(source_path, node_type, title))
    }

    /// Reserve `candidate`, or the first free `candidate_N` (N >= 2) if it is taken.
    pub fn allocate(&mut self, candidate: String) -> String {
        if self.issued.insert(candidate.clone()) {
            return candidate;
        }
        let counter = self.next_suffix.entry(candidate.clone()).or_insert(2);
        loop {
            let attempt = format!("{candidate}_{counter}");
            *counter += 1;
            if self.issued.insert(attempt.clone()) {
                tracing::debug!("[IdAllocator] '{candidate}' already issued, using '{attempt}'");
                return attempt;
            }
        }
    }

    /// Record an explicitly chosen id as issued and return it unchanged. Repeats are left for
    /// the graph assembler to reject as duplicates.
    pub fn reserve(&mut self, id: impl Into<String>) -> String {
        let id = id.into();
        self.issued.insert(id.clone());
        id
    }

    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// xorshift, so the sample set is reproducible without pulling in an rng crate.
    struct Sampler(u64);

    impl Sampler {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn word(&mut self) -> String {
            const SYLLABLES: [&str; 12] = [
                "ka", "lo", "mi", "ne", "su", "ta", "ri", "vo", "ze", "pa", "do", "gu",
            ];
            let len = 2 + (self.next() % 4) as usize;
            (0..len)
                .map(|_| SYLLABLES[(self.next() % SYLLABLES.len() as u64) as usize])
                .collect()
        }
    }

    #[test]
    fn test_generate_id_rules() {
        assert_eq!(
            generate_id("auth/login.feature", NodeType::Feature, None),
            "feature_auth_login"
        );
        assert_eq!(
            generate_id("docs/auth/login.feature", NodeType::Scenario, Some("Valid credentials")),
            "scenario_auth_login_valid_credentials"
        );
        assert_eq!(
            generate_id("governance/epic.md", NodeType::Epic, None),
            "epic_governance_epic"
        );
        assert_eq!(generate_id("login.feature", NodeType::Feature, None), "feature_login");
        assert_eq!(
            generate_id("auth/login.feature", NodeType::Scenario, Some("???")),
            "scenario_auth_login"
        );
    }

    #[test]
    fn test_generate_id_is_deterministic_and_collision_free() {
        let mut sampler = Sampler(0x9e37_79b9_7f4a_7c15);
        let mut seen_inputs = HashSet::new();
        let mut seen_ids = HashMap::new();
        while seen_inputs.len() < 10_000 {
            let dir = sampler.word();
            let file = format!("{}.feature", sampler.word());
            let title = sampler.word();
            let path = format!("root/{dir}/{file}");
            if !seen_inputs.insert((dir, file, title.clone())) {
                continue;
            }
            let id = generate_id(&path, NodeType::Scenario, Some(&title));
            assert_eq!(id, generate_id(&path, NodeType::Scenario, Some(&title)));
            if let Some(previous) = seen_ids.insert(id.clone(), (path.clone(), title.clone())) {
                panic!("{id} generated for both {previous:?} and {:?}", (path, title));
            }
        }
    }

    #[test]
    fn test_allocator_disambiguates_positionally() {
        let mut ids = IdAllocator::new();
        let path = "auth/login.feature";
        let first = ids.generate(path, NodeType::Scenario, Some("Retry"));
        let second = ids.generate(path, NodeType::Scenario, Some("Retry"));
        let third = ids.generate(path, NodeType::Scenario, Some("Retry"));
        assert_eq!(first, "scenario_auth_login_retry");
        assert_eq!(second, "scenario_auth_login_retry_2");
        assert_eq!(third, "scenario_auth_login_retry_3");

        // A natural id that looks like a suffixed one must not be handed out twice.
        let natural = ids.allocate("x_2".to_string());
        let repeat = ids.allocate("x".to_string());
        let again = ids.allocate("x".to_string());
        assert_eq!(natural, "x_2");
        assert_eq!(repeat, "x");
        assert_eq!(again, "x_3");
    }

    #[test]
    fn test_allocator_unique_over_colliding_inputs() {
        let mut sampler = Sampler(42);
        let mut ids = IdAllocator::new();
        let mut issued = HashSet::new();
        for _ in 0..10_000 {
            // Small vocabulary on purpose: many inputs collide before allocation.
            let dir = format!("d{}", sampler.next() % 5);
            let title = format!("t{}", sampler.next() % 7);
            let id = ids.generate(&format!("{dir}/f.feature"), NodeType::Scenario, Some(&title));
            assert!(issued.insert(id));
        }
        assert_eq!(ids.len(), 10_000);
    }
}
