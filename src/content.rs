//! Binds a resolved node to its content record.
//!
//! A node that is itself a content record resolves to itself. Otherwise its
//! outgoing relations are searched tier by tier following
//! [`CONTENT_PRECEDENCE`]; the first target that is a real content record wins
//! and targets that are segments or dangling ids are skipped.

use tracing::trace;

use crate::{
    errors::SegmentGraphError,
    store::RelationStore,
    types::{NodeId, RelationKind},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierScan {
    /// Only the earliest relation of the tier is considered.
    First,
    /// Every relation of the tier is considered in insertion order.
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationTier {
    pub kind: RelationKind,
    pub scan: TierScan,
}

impl RelationTier {
    pub const fn new(kind: RelationKind, scan: TierScan) -> Self {
        Self { kind, scan }
    }

    fn limit(&self) -> Option<usize> {
        match self.scan {
            TierScan::First => Some(1),
            TierScan::All => None,
        }
    }
}

/// Bound content first, then direct children, then indirect descendants.
pub const CONTENT_PRECEDENCE: [RelationTier; 3] = [
    RelationTier::new(RelationKind::Bound, TierScan::First),
    RelationTier::new(RelationKind::Direct, TierScan::All),
    RelationTier::new(RelationKind::Indirect, TierScan::All),
];

pub fn resolve_content<S>(store: &S, node: &NodeId) -> Result<Option<NodeId>, SegmentGraphError>
where
    S: RelationStore + ?Sized,
{
    resolve_content_with(store, node, &CONTENT_PRECEDENCE)
}

pub fn resolve_content_with<S>(
    store: &S,
    node: &NodeId,
    tiers: &[RelationTier],
) -> Result<Option<NodeId>, SegmentGraphError>
where
    S: RelationStore + ?Sized,
{
    if store.is_content(node)? {
        return Ok(Some(node.clone()));
    }
    for tier in tiers {
        if let Some(found) = search_tier(store, node, tier)? {
            trace!(node = %node, content = %found, tier = ?tier.kind, "content bound");
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn search_tier<S>(
    store: &S,
    node: &NodeId,
    tier: &RelationTier,
) -> Result<Option<NodeId>, SegmentGraphError>
where
    S: RelationStore + ?Sized,
{
    for candidate in store.relation_targets(node, tier.kind, tier.limit())? {
        if store.is_content(&candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
