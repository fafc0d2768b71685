//! Resolves slash-delimited paths over a segment/content hierarchy stored in
//! SQLite, preferring single-call server-side procedures and falling back to
//! primitive table reads when they are unavailable.

pub mod client;
pub mod config;
pub mod content;
pub mod dual_read;
pub mod engine;
pub mod errors;
pub mod hierarchy;
pub mod materialize;
pub mod path;
pub mod response;
pub mod schema;
pub mod sqlite_store;
pub mod store;
pub mod strategy;
pub mod tree;
pub mod types;

pub use crate::config::{EngineConfig, ProcedureMode};
pub use crate::engine::{FetchType, ResolveRequest, SegmentEngine};
pub use crate::errors::{Failure, FailureCode, SegmentGraphError};
pub use crate::response::{Reply, Resolution};
pub use crate::sqlite_store::SqliteRelationStore;
pub use crate::store::RelationStore;
pub use crate::types::{Content, NodeId, ParentRef, RelationKind, Segment};
