//! Read capability the resolution engine needs from the relational backend.
//!
//! The engine never writes through this trait. Every method is one backend
//! round trip, which [`StoreMetrics`] counts so callers can compare the
//! procedure strategy against the multi-query fallback.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::{
    errors::SegmentGraphError,
    types::{BinaryBlob, Content, NodeId, RelationKind, Segment},
};

pub const PROC_SEGMENT_CHILDREN: &str = "get_segment_children";
pub const PROC_CONTENT_BY_PATH: &str = "get_content_by_path";
pub const PROC_SEGMENT_TREE: &str = "get_segment_tree";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreMetricsSnapshot {
    pub reads: u64,
    pub procedure_calls: u64,
}

impl StoreMetricsSnapshot {
    pub fn round_trips(&self) -> u64 {
        self.reads + self.procedure_calls
    }
}

#[derive(Default)]
pub struct StoreMetrics {
    reads: AtomicU64,
    procedure_calls: AtomicU64,
}

impl StoreMetrics {
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            procedure_calls: self.procedure_calls.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.procedure_calls.store(0, Ordering::Relaxed);
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_procedure_call(&self) {
        self.procedure_calls.fetch_add(1, Ordering::Relaxed);
    }
}

pub trait RelationStore: Send + Sync {
    /// Ids of every segment row.
    fn segment_ids(&self) -> Result<Vec<NodeId>, SegmentGraphError>;

    /// Distinct targets of direct (type 0) relations.
    fn parented_ids(&self) -> Result<Vec<NodeId>, SegmentGraphError>;

    fn segment(&self, id: &NodeId) -> Result<Option<Segment>, SegmentGraphError>;

    fn content(&self, id: &NodeId) -> Result<Option<Content>, SegmentGraphError>;

    fn is_content(&self, id: &NodeId) -> Result<bool, SegmentGraphError> {
        Ok(self.content(id)?.is_some())
    }

    /// Targets of `kind` relations leaving `source`, in insertion order.
    fn relation_targets(
        &self,
        source: &NodeId,
        kind: RelationKind,
        limit: Option<usize>,
    ) -> Result<Vec<NodeId>, SegmentGraphError>;

    fn binary(&self, id: &str) -> Result<Option<BinaryBlob>, SegmentGraphError>;

    /// Confirms the backend answers and carries the hierarchy tables.
    fn ping(&self) -> Result<(), SegmentGraphError>;

    /// Invokes a server-side procedure by name.
    fn call(&self, procedure: &str, args: &Value) -> Result<Value, SegmentGraphError>;

    fn metrics(&self) -> &StoreMetrics;
}

impl<S> RelationStore for &S
where
    S: RelationStore + ?Sized,
{
    fn segment_ids(&self) -> Result<Vec<NodeId>, SegmentGraphError> {
        (*self).segment_ids()
    }

    fn parented_ids(&self) -> Result<Vec<NodeId>, SegmentGraphError> {
        (*self).parented_ids()
    }

    fn segment(&self, id: &NodeId) -> Result<Option<Segment>, SegmentGraphError> {
        (*self).segment(id)
    }

    fn content(&self, id: &NodeId) -> Result<Option<Content>, SegmentGraphError> {
        (*self).content(id)
    }

    fn is_content(&self, id: &NodeId) -> Result<bool, SegmentGraphError> {
        (*self).is_content(id)
    }

    fn relation_targets(
        &self,
        source: &NodeId,
        kind: RelationKind,
        limit: Option<usize>,
    ) -> Result<Vec<NodeId>, SegmentGraphError> {
        (*self).relation_targets(source, kind, limit)
    }

    fn binary(&self, id: &str) -> Result<Option<BinaryBlob>, SegmentGraphError> {
        (*self).binary(id)
    }

    fn ping(&self) -> Result<(), SegmentGraphError> {
        (*self).ping()
    }

    fn call(&self, procedure: &str, args: &Value) -> Result<Value, SegmentGraphError> {
        (*self).call(procedure, args)
    }

    fn metrics(&self) -> &StoreMetrics {
        (*self).metrics()
    }
}
