use std::collections::BTreeSet;

use rand::Rng;
use segmentgraph::{
    NodeId, ParentRef, RelationKind, RelationStore, SqliteRelationStore,
    hierarchy::{children_of, resolve},
};

mod fixture_common;

use fixture_common::{fixture_iterations, labeled_rng, names, random_store};

fn ids(values: &[&str]) -> BTreeSet<NodeId> {
    values.iter().map(|id| NodeId::from(*id)).collect()
}

fn nested_store() -> SqliteRelationStore {
    let store = SqliteRelationStore::open_in_memory().unwrap();
    store.insert_segment("1", "docs").unwrap();
    store.insert_segment("2", "guide").unwrap();
    store.insert_segment("3", "intro").unwrap();
    store.insert_segment("4", "blog").unwrap();
    store.insert_relation("1", "2", RelationKind::Direct).unwrap();
    store.insert_relation("2", "3", RelationKind::Direct).unwrap();
    store
}

#[test]
fn test_root_children_exclude_parented_segments() {
    let store = nested_store();
    assert_eq!(children_of(&store, &ParentRef::Root).unwrap(), ids(&["1", "4"]));
}

#[test]
fn test_node_children_follow_direct_relations_only() {
    let store = nested_store();
    store.insert_content("10", 1, "x").unwrap();
    store.insert_relation("1", "10", RelationKind::Direct).unwrap();
    store.insert_relation("1", "4", RelationKind::Indirect).unwrap();
    let children = children_of(&store, &ParentRef::Node(NodeId::from("1"))).unwrap();
    assert_eq!(children, ids(&["10", "2"]));
}

#[test]
fn test_root_set_is_difference_for_random_forests() {
    for iter in 0..fixture_iterations() {
        let mut rng = labeled_rng(&format!("root-set-{iter}"));
        let store = random_store(&mut rng);
        let all: BTreeSet<NodeId> = store.segment_ids().unwrap().into_iter().collect();
        let parented: BTreeSet<NodeId> = store.parented_ids().unwrap().into_iter().collect();
        let expected: BTreeSet<NodeId> = all.difference(&parented).cloned().collect();
        let roots = children_of(&store, &ParentRef::Root).unwrap();
        assert_eq!(roots, expected, "iteration {iter}");

        let extra = format!("fresh{}", rng.gen_range(0..1000));
        store.insert_segment(&extra, "fresh").unwrap();
        let grown = children_of(&store, &ParentRef::Root).unwrap();
        assert!(grown.contains(&NodeId::new(extra.clone())));
        assert!(roots.is_subset(&grown));
        assert_eq!(grown.len(), roots.len() + 1);
    }
}

#[test]
fn test_resolve_nested_path() {
    let store = nested_store();
    let resolved = resolve(&store, &names(&["docs", "guide", "intro"])).unwrap();
    assert_eq!(resolved, Some(ParentRef::Node(NodeId::from("3"))));
}

#[test]
fn test_empty_path_resolves_to_root() {
    let store = nested_store();
    let empty: Vec<String> = Vec::new();
    assert_eq!(resolve(&store, &empty).unwrap(), Some(ParentRef::Root));
}

#[test]
fn test_missing_name_fails_without_backtracking() {
    let store = nested_store();
    // "intro" exists, but not directly under the root.
    assert_eq!(resolve(&store, &names(&["intro"])).unwrap(), None);
    assert_eq!(resolve(&store, &names(&["docs", "nope", "intro"])).unwrap(), None);
}

#[test]
fn test_name_match_is_case_sensitive() {
    let store = nested_store();
    assert_eq!(resolve(&store, &names(&["Docs"])).unwrap(), None);
}

#[test]
fn test_duplicate_sibling_names_pick_smallest_id() {
    let store = SqliteRelationStore::open_in_memory().unwrap();
    store.insert_segment("p", "parent").unwrap();
    store.insert_segment("b", "twin").unwrap();
    store.insert_segment("a", "twin").unwrap();
    store.insert_relation("p", "b", RelationKind::Direct).unwrap();
    store.insert_relation("p", "a", RelationKind::Direct).unwrap();
    let resolved = resolve(&store, &names(&["parent", "twin"])).unwrap();
    assert_eq!(resolved, Some(ParentRef::Node(NodeId::from("a"))));
}

#[test]
fn test_resolution_is_deterministic() {
    let store = nested_store();
    let path = names(&["docs", "guide"]);
    let first = resolve(&store, &path).unwrap();
    let second = resolve(&store, &path).unwrap();
    assert_eq!(first, second);
}
