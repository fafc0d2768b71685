use segmentgraph::{
    EngineConfig, FailureCode, FetchType, NodeId, ProcedureMode, RelationKind, Resolution,
    ResolveRequest, SegmentEngine,
    materialize::ContentBody,
};
use serde_json::{Value, json};

mod fixture_common;

use fixture_common::{open_config, scenario_engine, scenario_store};

fn body_json(resolution: &Resolution) -> (u16, Value) {
    let reply = resolution.render();
    let body = serde_json::from_slice(&reply.body).unwrap();
    (reply.status, body)
}

#[test]
fn test_container_path_lists_children() {
    for mode in [ProcedureMode::Enabled, ProcedureMode::Disabled] {
        let engine = scenario_engine(mode);
        let resolution = engine.resolve("/docs/", FetchType::Normal);
        let (status, body) = body_json(&resolution);
        assert_eq!(status, 200);
        assert_eq!(
            body,
            json!({
                "code": 0,
                "message": "Children fetched successfully",
                "data": {
                    "type": "segment_list",
                    "path": "/docs/",
                    "items": [{ "id": "2", "name": "guide", "item_type": "segment" }],
                    "segment_id": "1",
                },
            })
        );
    }
}

#[test]
fn test_segment_without_children_lists_nothing() {
    for mode in [ProcedureMode::Enabled, ProcedureMode::Disabled] {
        let engine = scenario_engine(mode);
        match engine.resolve("/docs/guide/", FetchType::Normal) {
            Resolution::ChildListing { listing, .. } => {
                assert!(listing.items.is_empty());
                assert_eq!(listing.segment_id, Some(NodeId::from("2")));
            }
            other => panic!("expected listing, got {other:?}"),
        }
    }
}

#[test]
fn test_root_listing_omits_segment_id() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    let (status, body) = body_json(&engine.resolve("//", FetchType::Normal));
    assert_eq!(status, 200);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert!(body["data"].get("segment_id").is_none());
}

#[test]
fn test_leaf_path_returns_bound_markdown() {
    for mode in [ProcedureMode::Enabled, ProcedureMode::Disabled] {
        let engine = scenario_engine(mode);
        let reply = engine.resolve("/docs/guide", FetchType::Normal).render();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.content_type, "text/markdown");
        assert_eq!(reply.body_text(), "# Hello");
    }
}

#[test]
fn test_leaf_path_returns_binary_bytes() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    let resolution = engine.resolve("media/logo", FetchType::Normal);
    match &resolution {
        Resolution::Content(payload) => {
            assert_eq!(payload.body, ContentBody::Binary(vec![0x89, b'P', b'N', b'G']));
        }
        other => panic!("expected content, got {other:?}"),
    }
    let reply = resolution.render();
    assert_eq!(reply.content_type, "image/png");
    assert_eq!(reply.body, vec![0x89, b'P', b'N', b'G']);
}

#[test]
fn test_missing_path_and_missing_content_are_distinct() {
    for mode in [ProcedureMode::Enabled, ProcedureMode::Disabled] {
        let engine = scenario_engine(mode);
        let missing = engine.resolve("/missing/x", FetchType::Normal);
        assert_eq!(missing.code(), -1);
        let (status, body) = body_json(&missing);
        assert_eq!(status, 404);
        assert_eq!(body["message"], "Path does not exist");

        let no_content = engine.resolve("/docs", FetchType::Normal);
        assert_eq!(no_content.code(), -2);
        assert_eq!(no_content.render().status, 404);
    }
}

#[test]
fn test_leaf_root_is_path_not_found() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    assert_eq!(engine.resolve("/", FetchType::Normal).code(), -1);
    assert_eq!(engine.resolve("", FetchType::Normal).code(), -1);
}

#[test]
fn test_tree_fetch_nests_subtree() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    let (status, body) = body_json(&engine.resolve("/docs/", FetchType::Tree));
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Tree fetched successfully");
    assert_eq!(body["data"]["type"], "segment_tree");
    assert_eq!(body["data"]["segment_id"], "1");
    assert_eq!(
        body["data"]["tree"],
        json!({
            "id": "1",
            "name": "docs",
            "item_type": "segment",
            "children": [{
                "id": "2",
                "name": "guide",
                "item_type": "segment",
                "children": [],
            }],
        })
    );
}

#[test]
fn test_tree_on_root_is_rejected() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    let resolution = engine.resolve("//", FetchType::Tree);
    assert_eq!(resolution.code(), FailureCode::RootTreeRejected.as_i32());
    assert_eq!(resolution.render().status, 400);
}

#[test]
fn test_tree_on_missing_segment_is_not_found() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    let resolution = engine.resolve("/nope/", FetchType::Tree);
    assert_eq!(resolution.code(), -1);
    assert_eq!(resolution.render().status, 404);
}

#[test]
fn test_tree_without_procedures_fails_terminally() {
    let engine = scenario_engine(ProcedureMode::Disabled);
    let resolution = engine.resolve("/docs/", FetchType::Tree);
    assert_eq!(resolution.code(), FailureCode::BackendFailed.as_i32());
    assert_eq!(resolution.render().status, 500);
}

#[test]
fn test_tree_flag_ignored_for_leaf_paths() {
    let engine = scenario_engine(ProcedureMode::Enabled);
    let reply = engine.resolve("/docs/guide", FetchType::Tree).render();
    assert_eq!(reply.body_text(), "# Hello");
}

#[test]
fn test_json_content_is_reserialized() {
    let store = scenario_store();
    store.insert_segment("5", "data").unwrap();
    store.insert_content("12", 4, "{ \"a\" :  [1, 2] }").unwrap();
    store.insert_relation("5", "12", RelationKind::Bound).unwrap();
    store.insert_segment("6", "broken").unwrap();
    store.insert_content("13", 4, "{not json").unwrap();
    store.insert_relation("6", "13", RelationKind::Bound).unwrap();
    let engine = SegmentEngine::new(store, open_config());

    let reply = engine.resolve("/data", FetchType::Normal).render();
    assert_eq!(reply.content_type, "application/json");
    assert_eq!(reply.body_text(), r#"{"a":[1,2]}"#);

    let reply = engine.resolve("/broken", FetchType::Normal).render();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body_text(), "{not json");
}

#[test]
fn test_missing_blob_surfaces_binary_missing() {
    let store = scenario_store();
    store.insert_segment("7", "orphan").unwrap();
    store.insert_content("14", 21, "binary:gone").unwrap();
    store.insert_relation("7", "14", RelationKind::Bound).unwrap();
    let engine = SegmentEngine::new(store, open_config());
    let resolution = engine.resolve("/orphan", FetchType::Normal);
    assert_eq!(resolution.code(), -4);
    assert_eq!(resolution.render().status, 500);
}

#[test]
fn test_handle_checks_read_token() {
    let engine = SegmentEngine::new(scenario_store(), EngineConfig::default());
    let denied = engine.handle(&ResolveRequest::new("/docs/guide"));
    assert_eq!(denied.code(), FailureCode::InvalidToken.as_i32());
    assert_eq!(denied.render().status, 401);

    let wrong = engine.handle(&ResolveRequest::new("/docs/guide").with_token("guess"));
    assert_eq!(wrong.render().status, 401);

    let allowed = engine.handle(&ResolveRequest::new("/docs/guide").with_token("example_token"));
    assert_eq!(allowed.render().body_text(), "# Hello");
}

#[test]
fn test_handle_without_configured_token_is_open() {
    let engine = SegmentEngine::new(scenario_store(), open_config());
    let request = ResolveRequest::new("/docs/").with_fetch_type(FetchType::Tree);
    assert_eq!(engine.handle(&request).code(), 0);
}

#[test]
fn test_ping() {
    let engine = SegmentEngine::new(scenario_store(), EngineConfig::default());
    let denied = engine.ping(Some("guess"));
    assert_eq!(denied.code, 1);
    assert!(denied.data.is_none());

    let ok = engine.ping(Some("example_token"));
    assert_eq!(ok.code, 0);
    assert_eq!(
        serde_json::to_value(&ok).unwrap(),
        json!({
            "code": 0,
            "message": "Connection successful",
            "data": { "backend_reachable": true, "procedures_enabled": true },
        })
    );
}

#[test]
fn test_percent_sequences_are_not_decoded() {
    let store = scenario_store();
    store.insert_segment("8", "a%20b").unwrap();
    store.insert_content("15", 1, "literal").unwrap();
    store.insert_relation("8", "15", RelationKind::Bound).unwrap();
    let engine = SegmentEngine::new(store, open_config());
    assert_eq!(
        engine.resolve("/a%20b", FetchType::Normal).render().body_text(),
        "literal"
    );
    assert_eq!(engine.resolve("/a b", FetchType::Normal).code(), -1);
}

#[test]
fn test_ping_reports_unreachable_backend_without_schema() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("hierarchy.db");
    let store = segmentgraph::SqliteRelationStore::open(&db).unwrap();
    let engine = SegmentEngine::new(store, open_config());
    assert!(engine.ping(None).data.unwrap().backend_reachable);

    let conn = rusqlite::Connection::open(&db).unwrap();
    conn.execute_batch("DROP TABLE content_binary;").unwrap();
    let reply = engine.ping(None);
    assert_eq!(reply.code, 0);
    assert!(!reply.data.unwrap().backend_reachable);
}
