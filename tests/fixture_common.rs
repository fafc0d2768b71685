#![allow(dead_code)]

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use segmentgraph::{
    EngineConfig, ProcedureMode, RelationKind, SegmentEngine, SqliteRelationStore,
    client::seed_scenario,
};

pub const NAMES: [&str; 4] = ["a", "b", "c", "d"];

pub fn fixture_iterations() -> usize {
    std::env::var("SEGMENTGRAPH_FIXTURE_ITERS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(12)
}

pub fn labeled_rng(label: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    label.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

pub fn open_config() -> EngineConfig {
    EngineConfig::default().with_get_token(None)
}

pub fn scenario_store() -> SqliteRelationStore {
    let store = SqliteRelationStore::open_in_memory().expect("store");
    seed_scenario(&store).expect("seed");
    store
}

pub fn scenario_engine(mode: ProcedureMode) -> SegmentEngine<SqliteRelationStore> {
    SegmentEngine::new(
        scenario_store().with_procedures(mode),
        open_config().with_procedures(mode),
    )
}

pub fn names(path: &[&str]) -> Vec<String> {
    path.iter().map(|name| name.to_string()).collect()
}

/// A random forest of segments with small, colliding names, content attached
/// through every relation kind, dangling targets and a few ids that are both
/// a segment and a content record.
pub fn random_store(rng: &mut StdRng) -> SqliteRelationStore {
    let store = SqliteRelationStore::open_in_memory().expect("store");
    let segment_count = rng.gen_range(4..24);
    for idx in 0..segment_count {
        let id = format!("s{idx:02}");
        let name = NAMES[rng.gen_range(0..NAMES.len())];
        store.insert_segment(&id, name).expect("segment");
        if idx > 0 && rng.gen_bool(0.7) {
            let parent = format!("s{:02}", rng.gen_range(0..idx));
            store
                .insert_relation(&parent, &id, RelationKind::Direct)
                .expect("parent");
        }
        if rng.gen_bool(0.1) {
            store
                .insert_content(&id, 1, &format!("segment-content {id}"))
                .expect("overlap");
        }
    }
    let content_count = rng.gen_range(0..16);
    for idx in 0..content_count {
        let id = format!("c{idx:02}");
        store
            .insert_content(&id, rng.gen_range(1..5), &format!("value {idx}"))
            .expect("content");
    }
    let relation_count = rng.gen_range(0..30);
    for _ in 0..relation_count {
        let source = format!("s{:02}", rng.gen_range(0..segment_count));
        let target = match rng.gen_range(0..10) {
            0 => format!("ghost{}", rng.gen_range(0..5)),
            1 | 2 => format!("s{:02}", rng.gen_range(0..segment_count)),
            _ if content_count > 0 => format!("c{:02}", rng.gen_range(0..content_count)),
            _ => format!("ghost{}", rng.gen_range(0..5)),
        };
        let kind = match rng.gen_range(0..3) {
            0 => RelationKind::Direct,
            1 => RelationKind::Indirect,
            _ => RelationKind::Bound,
        };
        // Extra direct relations into segments would break the forest shape.
        if kind == RelationKind::Direct && target.starts_with('s') {
            continue;
        }
        store
            .insert_relation(&source, &target, kind)
            .expect("relation");
    }
    store
}

/// Every name sequence over [`NAMES`] (plus one name that never exists) up
/// to `depth` long.
pub fn candidate_paths(depth: usize) -> Vec<Vec<String>> {
    let mut alphabet: Vec<String> = NAMES.iter().map(|name| name.to_string()).collect();
    alphabet.push("zz".to_string());
    let mut paths = vec![Vec::new()];
    let mut frontier = vec![Vec::new()];
    for _ in 0..depth {
        let mut next = Vec::new();
        for prefix in &frontier {
            for name in &alphabet {
                let mut path: Vec<String> = prefix.clone();
                path.push(name.clone());
                next.push(path);
            }
        }
        paths.extend(next.iter().cloned());
        frontier = next;
    }
    paths
}
