use rusqlite::Connection;

use crate::errors::SegmentGraphError;

pub fn ensure_schema(conn: &Connection) -> Result<(), SegmentGraphError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS segment (
            id   TEXT PRIMARY KEY CHECK (id <> ''),
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS content (
            id        TEXT PRIMARY KEY CHECK (id <> ''),
            type_code INTEGER NOT NULL DEFAULT 1,
            value     TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE IF NOT EXISTS content_binary (
            id   TEXT PRIMARY KEY CHECK (id <> ''),
            data BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS segment_relation (
            segment_1 TEXT NOT NULL,
            segment_2 TEXT NOT NULL,
            type      INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_relation_source ON segment_relation(segment_1, type);
        CREATE INDEX IF NOT EXISTS idx_relation_target ON segment_relation(type, segment_2);
        CREATE INDEX IF NOT EXISTS idx_segment_name ON segment(name);
        "#,
    )
    .map_err(|e| SegmentGraphError::schema(e.to_string()))?;
    Ok(())
}
