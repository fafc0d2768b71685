//! rusqlite implementation of [`RelationStore`].
//!
//! Besides the primitive reads, the store answers the three server-side
//! procedures with a single statement each, so a procedure call is exactly one
//! round trip. Byte columns are surfaced as `\x`-prefixed lowercase hex.

use std::{fmt::Write as _, path::Path};

use ahash::{AHashMap, AHashSet};
use data_encoding::HEXLOWER;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, types::Value as SqlValue};
use serde_json::{Map, Value, json};

use crate::{
    config::ProcedureMode,
    content::{CONTENT_PRECEDENCE, TierScan},
    errors::SegmentGraphError,
    schema::ensure_schema,
    store::{
        PROC_CONTENT_BY_PATH, PROC_SEGMENT_CHILDREN, PROC_SEGMENT_TREE, RelationStore,
        StoreMetrics,
    },
    types::{BinaryBlob, Content, NodeId, RelationKind, Segment},
};

/// Walks `?1` (a JSON array of names) from the root. A row with a NULL id at
/// some depth means that name had no match; `''` stands for the root.
const WALK_CTE: &str = r#"
    path(idx, name) AS (SELECT key, value FROM json_each(?1)),
    walk(depth, id) AS (
        SELECT 0, ''
        UNION ALL
        SELECT w.depth + 1,
               (SELECT s.id FROM segment s
                 WHERE s.name = p.name
                   AND CASE WHEN w.id = ''
                       THEN NOT EXISTS (SELECT 1 FROM segment_relation r
                                         WHERE r.type = 0 AND r.segment_2 = s.id)
                       ELSE EXISTS (SELECT 1 FROM segment_relation r
                                     WHERE r.type = 0 AND r.segment_1 = w.id
                                       AND r.segment_2 = s.id)
                   END
                 ORDER BY s.id LIMIT 1)
          FROM walk w JOIN path p ON p.idx = w.depth
         WHERE w.id IS NOT NULL
    ),
    resolved(id) AS (
        SELECT id FROM walk
         WHERE depth = (SELECT COUNT(*) FROM path) AND id IS NOT NULL
    )"#;

const HIERARCHY_TABLES: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub segments: i64,
    pub contents: i64,
    pub binaries: i64,
    pub relations: i64,
}

pub struct SqliteRelationStore {
    conn: Mutex<Connection>,
    procedures: ProcedureMode,
    metrics: StoreMetrics,
}

impl SqliteRelationStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SegmentGraphError> {
        let conn =
            Connection::open(path).map_err(|e| SegmentGraphError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, SegmentGraphError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SegmentGraphError::connection(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens `memory` as an in-memory database and anything else as a file.
    pub fn open_target(target: &str) -> Result<Self, SegmentGraphError> {
        if target == "memory" {
            Self::open_in_memory()
        } else {
            Self::open(target)
        }
    }

    pub fn with_procedures(mut self, mode: ProcedureMode) -> Self {
        self.procedures = mode;
        self
    }

    pub fn procedures(&self) -> ProcedureMode {
        self.procedures
    }

    pub fn insert_segment(&self, id: &str, name: &str) -> Result<(), SegmentGraphError> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO segment(id, name) VALUES(?1, ?2)",
                params![id, name],
            )
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        Ok(())
    }

    pub fn insert_content(
        &self,
        id: &str,
        type_code: i64,
        value: &str,
    ) -> Result<(), SegmentGraphError> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO content(id, type_code, value) VALUES(?1, ?2, ?3)",
                params![id, type_code, value],
            )
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        Ok(())
    }

    /// Stores `data` in a BLOB column; it comes back as `\x` hex text.
    pub fn insert_binary(&self, id: &str, data: &[u8]) -> Result<(), SegmentGraphError> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO content_binary(id, data) VALUES(?1, ?2)",
                params![id, data],
            )
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        Ok(())
    }

    pub fn insert_relation(
        &self,
        from: &str,
        to: &str,
        kind: RelationKind,
    ) -> Result<(), SegmentGraphError> {
        if from.is_empty() || to.is_empty() {
            return Err(SegmentGraphError::invalid_input(
                "relation endpoints must be non-empty ids",
            ));
        }
        self.conn
            .lock()
            .execute(
                "INSERT INTO segment_relation(segment_1, segment_2, type) VALUES(?1, ?2, ?3)",
                params![from, to, kind.code()],
            )
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        Ok(())
    }

    pub fn counts(&self) -> Result<StoreCounts, SegmentGraphError> {
        let conn = self.conn.lock();
        let count = |table: &str| -> Result<i64, SegmentGraphError> {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .map_err(|e| SegmentGraphError::query(e.to_string()))
        };
        Ok(StoreCounts {
            segments: count("segment")?,
            contents: count("content")?,
            binaries: count("content_binary")?,
            relations: count("segment_relation")?,
        })
    }

    fn from_connection(conn: Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(64);
        Self {
            conn: Mutex::new(conn),
            procedures: ProcedureMode::Enabled,
            metrics: StoreMetrics::default(),
        }
    }

    fn collect_ids(
        &self,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<NodeId>, SegmentGraphError> {
        self.metrics.record_read();
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(sql)
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        let rows = stmt
            .query_map(args, |row| row.get::<_, String>(0))
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(NodeId::new(
                id.map_err(|e| SegmentGraphError::query(e.to_string()))?,
            ));
        }
        Ok(ids)
    }

    fn segment_children(&self, path_json: &str) -> Result<Value, SegmentGraphError> {
        let sql = format!(
            r#"WITH RECURSIVE {WALK_CTE},
            child(id) AS (
                SELECT s.id FROM segment s, resolved p
                 WHERE p.id = ''
                   AND NOT EXISTS (SELECT 1 FROM segment_relation r
                                    WHERE r.type = 0 AND r.segment_2 = s.id)
                UNION
                SELECT r.segment_2 FROM segment_relation r, resolved p
                 WHERE p.id <> '' AND r.type = 0 AND r.segment_1 = p.id
            )
            SELECT s.id, s.name,
                   EXISTS (SELECT 1 FROM content c WHERE c.id = s.id),
                   NULLIF((SELECT id FROM resolved), '')
              FROM child ch JOIN segment s ON s.id = ch.id
             ORDER BY s.id"#
        );
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| SegmentGraphError::procedure(e.to_string()))?;
        let rows = stmt
            .query_map(params![path_json], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let is_content: bool = row.get(2)?;
                let segment_id: Option<String> = row.get(3)?;
                Ok(json!({
                    "id": id,
                    "name": name,
                    "item_type": if is_content { "content" } else { "segment" },
                    "segment_id": segment_id,
                }))
            })
            .map_err(|e| SegmentGraphError::procedure(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| SegmentGraphError::procedure(e.to_string()))?);
        }
        Ok(Value::Array(out))
    }

    fn content_by_path(&self, path_json: &str) -> Result<Value, SegmentGraphError> {
        let sql = content_by_path_sql();
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| SegmentGraphError::procedure(e.to_string()))?;
        let rows = stmt
            .query_map(params![path_json], |row| {
                let id: String = row.get(0)?;
                let type_code: i64 = row.get(1)?;
                let value: String = row.get(2)?;
                Ok(json!({ "id": id, "type_code": type_code, "value": value }))
            })
            .map_err(|e| SegmentGraphError::procedure(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| SegmentGraphError::procedure(e.to_string()))?);
        }
        Ok(Value::Array(out))
    }

    fn segment_tree(&self, root: &str) -> Result<Value, SegmentGraphError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                r#"WITH RECURSIVE reach(parent, child) AS (
                    SELECT segment_1, segment_2 FROM segment_relation
                     WHERE type = 0 AND segment_1 = ?1
                    UNION
                    SELECT r.segment_1, r.segment_2
                      FROM segment_relation r JOIN reach ON r.segment_1 = reach.child
                     WHERE r.type = 0
                )
                SELECT NULL, s.id, s.name, NULL, NULL, 0
                  FROM segment s WHERE s.id = ?1
                UNION ALL
                SELECT reach.parent, reach.child, s.name, c.type_code, c.value,
                       c.id IS NOT NULL
                  FROM reach
                  LEFT JOIN segment s ON s.id = reach.child
                  LEFT JOIN content c ON c.id = reach.child"#,
            )
            .map_err(|e| SegmentGraphError::procedure(e.to_string()))?;
        let rows = stmt
            .query_map(params![root], |row| {
                Ok(TreeRow {
                    parent: row.get(0)?,
                    id: row.get(1)?,
                    name: row.get(2)?,
                    type_code: row.get(3)?,
                    value: row.get(4)?,
                    is_content: row.get(5)?,
                })
            })
            .map_err(|e| SegmentGraphError::procedure(e.to_string()))?;
        let mut collected = Vec::new();
        for row in rows {
            collected.push(row.map_err(|e| SegmentGraphError::procedure(e.to_string()))?);
        }
        Ok(nest_tree(root, collected))
    }
}

impl RelationStore for SqliteRelationStore {
    fn segment_ids(&self) -> Result<Vec<NodeId>, SegmentGraphError> {
        self.collect_ids("SELECT id FROM segment ORDER BY id", params![])
    }

    fn parented_ids(&self) -> Result<Vec<NodeId>, SegmentGraphError> {
        self.collect_ids(
            "SELECT DISTINCT segment_2 FROM segment_relation WHERE type = 0 ORDER BY segment_2",
            params![],
        )
    }

    fn segment(&self, id: &NodeId) -> Result<Option<Segment>, SegmentGraphError> {
        self.metrics.record_read();
        self.conn
            .lock()
            .query_row(
                "SELECT id, name FROM segment WHERE id=?1",
                params![id.as_str()],
                |row| {
                    Ok(Segment {
                        id: NodeId::new(row.get::<_, String>(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(|e| SegmentGraphError::query(e.to_string()))
    }

    fn content(&self, id: &NodeId) -> Result<Option<Content>, SegmentGraphError> {
        self.metrics.record_read();
        self.conn
            .lock()
            .query_row(
                "SELECT id, type_code, value FROM content WHERE id=?1",
                params![id.as_str()],
                |row| {
                    Ok(Content {
                        id: NodeId::new(row.get::<_, String>(0)?),
                        type_code: row.get(1)?,
                        value: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|e| SegmentGraphError::query(e.to_string()))
    }

    fn is_content(&self, id: &NodeId) -> Result<bool, SegmentGraphError> {
        self.metrics.record_read();
        let found: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT 1 FROM content WHERE id=?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        Ok(found.is_some())
    }

    fn relation_targets(
        &self,
        source: &NodeId,
        kind: RelationKind,
        limit: Option<usize>,
    ) -> Result<Vec<NodeId>, SegmentGraphError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        self.collect_ids(
            "SELECT segment_2 FROM segment_relation \
             WHERE segment_1=?1 AND type=?2 ORDER BY rowid LIMIT ?3",
            params![source.as_str(), kind.code(), limit],
        )
    }

    fn binary(&self, id: &str) -> Result<Option<BinaryBlob>, SegmentGraphError> {
        self.metrics.record_read();
        let row: Option<(String, SqlValue)> = self
            .conn
            .lock()
            .query_row(
                "SELECT id, data FROM content_binary WHERE id=?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| SegmentGraphError::query(e.to_string()))?;
        let Some((id, data)) = row else {
            return Ok(None);
        };
        let data = match data {
            SqlValue::Blob(bytes) => format!("\\x{}", HEXLOWER.encode(&bytes)),
            SqlValue::Text(text) => text,
            other => {
                return Err(SegmentGraphError::query(format!(
                    "binary {id} has unexpected column type {:?}",
                    other.data_type()
                )));
            }
        };
        Ok(Some(BinaryBlob {
            id: NodeId::new(id),
            data,
        }))
    }

    fn ping(&self) -> Result<(), SegmentGraphError> {
        self.metrics.record_read();
        let present: i64 = self
            .conn
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' \
                 AND name IN ('segment', 'content', 'content_binary', 'segment_relation')",
                params![],
                |row| row.get(0),
            )
            .map_err(|e| SegmentGraphError::connection(e.to_string()))?;
        if present < HIERARCHY_TABLES {
            return Err(SegmentGraphError::schema(format!(
                "expected {HIERARCHY_TABLES} hierarchy tables, found {present}"
            )));
        }
        Ok(())
    }

    fn call(&self, procedure: &str, args: &Value) -> Result<Value, SegmentGraphError> {
        self.metrics.record_procedure_call();
        if self.procedures == ProcedureMode::Disabled {
            return Err(SegmentGraphError::procedure_unavailable(procedure));
        }
        match procedure {
            PROC_SEGMENT_CHILDREN => self.segment_children(&path_argument(args)?),
            PROC_CONTENT_BY_PATH => self.content_by_path(&path_argument(args)?),
            PROC_SEGMENT_TREE => {
                let root = args
                    .get("root_segment_id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        SegmentGraphError::invalid_input("root_segment_id must be a string")
                    })?;
                self.segment_tree(root)
            }
            other => Err(SegmentGraphError::procedure_unavailable(other)),
        }
    }

    fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }
}

/// Serializes `path_segments` back to JSON text for `json_each`.
fn path_argument(args: &Value) -> Result<String, SegmentGraphError> {
    let segments = args
        .get("path_segments")
        .and_then(Value::as_array)
        .ok_or_else(|| SegmentGraphError::invalid_input("path_segments must be an array"))?;
    if !segments.iter().all(Value::is_string) {
        return Err(SegmentGraphError::invalid_input(
            "path_segments must only contain strings",
        ));
    }
    serde_json::to_string(segments).map_err(|e| SegmentGraphError::invalid_input(e.to_string()))
}

/// Builds the candidate query from [`CONTENT_PRECEDENCE`]: tier 0 is the node
/// itself, then one per relation tier.
fn content_by_path_sql() -> String {
    let mut rank = String::from("CASE r.type");
    let mut kinds = Vec::new();
    let mut first_only = String::new();
    for (idx, tier) in CONTENT_PRECEDENCE.iter().enumerate() {
        let code = tier.kind.code();
        let _ = write!(rank, " WHEN {code} THEN {}", idx + 1);
        kinds.push(code.to_string());
        if tier.scan == TierScan::First {
            let _ = write!(
                first_only,
                " AND (r.type <> {code} OR r.rowid = (SELECT MIN(f.rowid) FROM segment_relation f \
                 WHERE f.segment_1 = r.segment_1 AND f.type = {code}))"
            );
        }
    }
    rank.push_str(" END");
    format!(
        r#"WITH RECURSIVE {WALK_CTE},
        candidate(tier, ord, id) AS (
            SELECT 0, 0, id FROM resolved
            UNION ALL
            SELECT {rank}, r.rowid, r.segment_2
              FROM segment_relation r JOIN resolved t ON r.segment_1 = t.id
             WHERE r.type IN ({kinds}){first_only}
        )
        SELECT c.id, c.type_code, c.value
          FROM candidate k JOIN content c ON c.id = k.id
         ORDER BY k.tier, k.ord
         LIMIT 1"#,
        kinds = kinds.join(", "),
    )
}

struct TreeRow {
    parent: Option<String>,
    id: String,
    name: Option<String>,
    type_code: Option<i64>,
    value: Option<String>,
    is_content: bool,
}

fn nest_tree(root: &str, rows: Vec<TreeRow>) -> Value {
    let mut root_name = None;
    let mut children: AHashMap<String, Vec<TreeRow>> = AHashMap::new();
    for row in rows {
        match row.parent.clone() {
            None => root_name = row.name,
            Some(parent) => children.entry(parent).or_default().push(row),
        }
    }
    let Some(root_name) = root_name else {
        return Value::Null;
    };
    for list in children.values_mut() {
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list.dedup_by(|a, b| a.id == b.id);
    }
    let mut ancestors = AHashSet::new();
    segment_node(root, &root_name, &children, &mut ancestors)
}

fn segment_node(
    id: &str,
    name: &str,
    children: &AHashMap<String, Vec<TreeRow>>,
    ancestors: &mut AHashSet<String>,
) -> Value {
    ancestors.insert(id.to_string());
    let mut nested = Vec::new();
    for child in children.get(id).map(Vec::as_slice).unwrap_or_default() {
        if child.is_content {
            let mut node = Map::new();
            node.insert("id".into(), json!(child.id));
            if let Some(name) = &child.name {
                node.insert("name".into(), json!(name));
            }
            node.insert("item_type".into(), json!("content"));
            node.insert("type_code".into(), json!(child.type_code));
            node.insert("value".into(), json!(child.value));
            nested.push(Value::Object(node));
        } else if let Some(name) = &child.name {
            if ancestors.contains(&child.id) {
                continue;
            }
            nested.push(segment_node(&child.id, name, children, ancestors));
        }
    }
    ancestors.remove(id);
    json!({
        "id": id,
        "name": name,
        "item_type": "segment",
        "children": nested,
    })
}
