//! Tests for graph assembly, querying and the published-graph store

use super::*;
use crate::{
    codec::{parse_feature_with, DocumentCompiler, MemorySource, ParseOptions},
    error::LamadError,
    ids::IdAllocator,
    properties::{DocumentNode, EpicNode, NodeBase, NodeType, RelationKind},
    query::GraphQuery,
};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

const LOGIN: &str = "@epic:auth
Feature: Login
Users can log in.

Scenario: Valid credentials
  Given a registered user
  When they submit correct credentials
  Then they are logged in

@smoke-critical
Scenario: Locked account
  Given a locked user
  Then login is refused
";

const SIGNUP: &str = "@epic:auth @epic:ghost
Feature: Signup
  Scenario: New user
    Given a visitor
";

fn epic(id: &str, path: &str, title: &str) -> EpicNode {
    let mut base = NodeBase::new(id, path);
    base.title = title.to_string();
    base.description = format!("{title} epic");
    EpicNode {
        base,
        ..Default::default()
    }
}

fn sample_graph() -> DocumentGraph {
    let mut ids = IdAllocator::new();
    let login = parse_feature_with(LOGIN, "auth/login.feature", "auth", &mut ids, ParseOptions::default())
        .unwrap();
    let signup =
        parse_feature_with(SIGNUP, "auth/signup.feature", "auth", &mut ids, ParseOptions::default())
            .unwrap();
    let epics = vec![epic("epic_auth_epic", "auth/epic.md", "Authentication")];
    let mut scenarios = login.scenarios;
    scenarios.extend(signup.scenarios);
    build_graph(epics, vec![login.feature, signup.feature], scenarios).unwrap()
}

#[test_log::test]
fn test_build_indexes_nodes_in_build_order() {
    let graph = sample_graph();
    assert_eq!(graph.len(), 6);
    let types: Vec<NodeType> = graph.nodes().map(|n| n.node_type()).collect();
    assert_eq!(
        types,
        vec![
            NodeType::Epic,
            NodeType::Feature,
            NodeType::Feature,
            NodeType::Scenario,
            NodeType::Scenario,
            NodeType::Scenario
        ]
    );
    let features: Vec<String> = graph
        .get_nodes_by_type(NodeType::Feature)
        .iter()
        .map(|n| n.id().to_string())
        .collect();
    assert_eq!(features, vec!["feature_auth_login", "feature_auth_signup"]);

    let metadata = graph.metadata();
    assert_eq!(metadata.node_count, 6);
    assert_eq!(metadata.epic_count, 1);
    assert_eq!(metadata.feature_count, 2);
    assert_eq!(metadata.scenario_count, 3);
}

#[test_log::test]
fn test_duplicate_ids_reject_the_build() {
    let first = epic("shared", "a/epic.md", "A");
    let second = epic("shared", "b/epic.md", "B");
    match build_graph(vec![first, second], vec![], vec![]) {
        Err(LamadError::DuplicateNodeId {
            id,
            first_path,
            second_path,
        }) => {
            assert_eq!(id, "shared");
            assert_eq!(first_path, "a/epic.md");
            assert_eq!(second_path, "b/epic.md");
        }
        other => panic!("expected DuplicateNodeId, got {other:?}"),
    }
}

#[test_log::test]
fn test_epic_tags_resolve_through_directory_alias() {
    let graph = sample_graph();
    // `epic:auth` names the epic stored under auth/
    let login = graph.get_node("feature_auth_login").unwrap();
    let related: Vec<String> = graph
        .get_related_nodes(login.id())
        .iter()
        .map(|n| n.id().to_string())
        .collect();
    assert_eq!(
        related,
        vec![
            "scenario_auth_login_valid_credentials",
            "scenario_auth_login_locked_account",
            "epic_auth_epic"
        ]
    );

    let epic = graph.get_node("epic_auth_epic").unwrap();
    assert_eq!(
        epic.as_epic().unwrap().feature_ids,
        vec!["feature_auth_login", "feature_auth_signup"]
    );
    let belongs: Vec<&str> = graph
        .relations_to("epic_auth_epic", Some(RelationKind::BelongsTo))
        .iter()
        .map(|n| n.id())
        .collect();
    assert!(belongs.contains(&"feature_auth_login"));
    assert!(belongs.contains(&"scenario_auth_signup_new_user"));
}

#[test_log::test]
fn test_unresolved_references_are_dropped_and_reported() {
    let graph = sample_graph();
    let signup = graph.get_node("feature_auth_signup").unwrap();
    assert!(signup.related_node_ids().contains(&"ghost".to_string()));
    let related: Vec<String> = graph
        .get_related_nodes(signup.id())
        .iter()
        .map(|n| n.id().to_string())
        .collect();
    assert_eq!(related, vec!["scenario_auth_signup_new_user", "epic_auth_epic"]);

    let ghosts: Vec<(&str, RelationKind)> = graph
        .unresolved_references()
        .filter(|u| u.target_id == "ghost")
        .map(|u| (u.from_id.as_str(), u.relation_kind))
        .collect();
    assert_eq!(
        ghosts,
        vec![
            ("feature_auth_signup", RelationKind::BelongsTo),
            ("scenario_auth_signup_new_user", RelationKind::BelongsTo)
        ]
    );
    assert_eq!(graph.metadata().unresolved_count, 2);
    assert!(graph.get_related_nodes("missing").is_empty());
    assert!(graph.get_node("ghost").is_none());
}

#[test_log::test]
fn test_descendants_walk_containment() {
    let graph = sample_graph();
    let ids: Vec<&str> = graph
        .descendants("epic_auth_epic")
        .iter()
        .map(|n| n.id())
        .collect();
    assert_eq!(
        ids,
        vec![
            "feature_auth_login",
            "scenario_auth_login_valid_credentials",
            "scenario_auth_login_locked_account",
            "feature_auth_signup",
            "scenario_auth_signup_new_user"
        ]
    );
}

#[test_log::test]
fn test_search_ranking_and_empty_queries() {
    let graph = sample_graph();
    let ids = |query: &str| -> Vec<String> {
        graph
            .search_nodes(query)
            .iter()
            .map(|n| n.id().to_string())
            .collect()
    };
    // Two matching tokens beat one
    assert_eq!(
        ids("Locked ACCOUNT login"),
        vec!["scenario_auth_login_locked_account", "feature_auth_login"]
    );
    // Equal scores keep build order
    assert_eq!(
        ids("auth"),
        vec![
            "feature_auth_login",
            "feature_auth_signup",
            "scenario_auth_login_valid_credentials",
            "scenario_auth_login_locked_account",
            "scenario_auth_signup_new_user"
        ]
    );

    assert!(graph.search_nodes("").is_empty());
    assert!(graph.search_nodes("  \t ").is_empty());
    assert!(graph.search_nodes("nonexistent").is_empty());
    // Tags are searchable
    assert_eq!(graph.search_nodes("critical").len(), 1);
}

#[test_log::test]
fn test_store_is_empty_before_first_build() {
    let store = GraphStore::new();
    assert!(!store.is_built());
    assert!(store.get_node("feature_auth_login").is_none());
    assert!(store.get_nodes_by_type(NodeType::Feature).is_empty());
    assert!(store.get_related_nodes("feature_auth_login").is_empty());
    assert!(store.search_nodes("login").is_empty());
}

#[test_log::test]
fn test_failed_rebuild_keeps_previous_graph() {
    let store = GraphStore::new();
    store.rebuild(|| Ok(sample_graph())).unwrap();
    let before = store.current().unwrap();

    let failed = store.rebuild(|| {
        build_graph(
            vec![epic("dup", "a/epic.md", "A"), epic("dup", "b/epic.md", "B")],
            vec![],
            vec![],
        )
    });
    assert!(matches!(failed, Err(LamadError::DuplicateNodeId { .. })));
    let after = store.current().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(store.get_nodes_by_type(NodeType::Scenario).len(), 3);
}

#[test_log::test]
fn test_concurrent_rebuilds_share_one_build() {
    let store = Arc::new(GraphStore::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Barrier::new(2));

    let leader = {
        let store = store.clone();
        let builds = builds.clone();
        let started = started.clone();
        thread::spawn(move || {
            store.rebuild(|| {
                builds.fetch_add(1, Ordering::SeqCst);
                started.wait();
                thread::sleep(Duration::from_millis(100));
                Ok(sample_graph())
            })
        })
    };

    // Wait until the leader is inside its build, then ask for another.
    started.wait();
    let follower = store.rebuild(|| {
        builds.fetch_add(1, Ordering::SeqCst);
        Ok(sample_graph())
    });
    let leader = leader.join().unwrap();

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&leader.unwrap(), &follower.unwrap()));
}

#[test_log::test(tokio::test)]
async fn test_subscribers_see_published_graphs() {
    let store = GraphStore::new();
    let mut rx = store.subscribe();
    assert!(rx.borrow().is_none());

    let mut source = MemorySource::new();
    source.insert("auth/login.feature", LOGIN);
    let published = store
        .rebuild_from(&DocumentCompiler::new(), &source)
        .unwrap();

    rx.changed().await.unwrap();
    let seen = rx.borrow_and_update().clone().unwrap();
    assert!(Arc::ptr_eq(&seen, &published));
    assert_eq!(seen.parse_results().len(), 1);
}

#[test_log::test]
fn test_only_successful_rebuilds_notify_subscribers() {
    let store = GraphStore::new();
    let rx = store.subscribe();

    let failed = store.rebuild(|| {
        build_graph(
            vec![epic("dup", "a/epic.md", "A"), epic("dup", "b/epic.md", "B")],
            vec![],
            vec![],
        )
    });
    assert!(failed.is_err());
    assert!(!rx.has_changed().unwrap());
    assert!(!store.is_built());

    let published = store.rebuild(|| Ok(sample_graph())).unwrap();
    assert!(rx.has_changed().unwrap());
    let seen = rx.borrow().clone().unwrap();
    assert!(Arc::ptr_eq(&seen, &published));
    assert!(Arc::ptr_eq(&store.current().unwrap(), &published));
}

#[test_log::test]
fn test_graph_node_serializes_with_type_tag() {
    let graph = sample_graph();
    let node = graph.get_node("scenario_auth_login_locked_account").unwrap();
    let json = serde_json::to_value(node.as_ref()).unwrap();
    assert_eq!(json["type"], "scenario");
    assert_eq!(json["featureId"], "feature_auth_login");
    assert_eq!(json["tags"][0], "smoke-critical");
    let back: DocumentNode = serde_json::from_value(json).unwrap();
    assert_eq!(&back, node.as_ref());
}
