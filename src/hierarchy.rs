//! Walks the segment forest one level per name using primitive reads.
//!
//! There is no explicit root marker in storage: the root's children are all
//! segments that are not the target of a direct relation.

use std::collections::BTreeSet;

use ahash::AHashSet;
use tracing::trace;

use crate::{
    errors::SegmentGraphError,
    store::RelationStore,
    types::{NodeId, ParentRef, RelationKind},
};

/// Direct children of `parent`, ordered by id.
pub fn children_of<S>(store: &S, parent: &ParentRef) -> Result<BTreeSet<NodeId>, SegmentGraphError>
where
    S: RelationStore + ?Sized,
{
    match parent {
        ParentRef::Root => {
            let parented: AHashSet<NodeId> = store.parented_ids()?.into_iter().collect();
            Ok(store
                .segment_ids()?
                .into_iter()
                .filter(|id| !parented.contains(id))
                .collect())
        }
        ParentRef::Node(id) => Ok(store
            .relation_targets(id, RelationKind::Direct, None)?
            .into_iter()
            .collect()),
    }
}

/// Resolves `names` from the root. An empty sequence yields
/// [`ParentRef::Root`]; `None` means some name had no matching child.
pub fn resolve<S, N>(store: &S, names: &[N]) -> Result<Option<ParentRef>, SegmentGraphError>
where
    S: RelationStore + ?Sized,
    N: AsRef<str>,
{
    let mut current = ParentRef::Root;
    for name in names {
        let name = name.as_ref();
        match match_child(store, &current, name)? {
            Some(next) => current = ParentRef::Node(next),
            None => {
                trace!(parent = ?current, name, "no child matches");
                return Ok(None);
            }
        }
    }
    Ok(Some(current))
}

fn match_child<S>(
    store: &S,
    parent: &ParentRef,
    name: &str,
) -> Result<Option<NodeId>, SegmentGraphError>
where
    S: RelationStore + ?Sized,
{
    for child in children_of(store, parent)? {
        if let Some(segment) = store.segment(&child)? {
            if segment.name == name {
                return Ok(Some(child));
            }
        }
    }
    Ok(None)
}
