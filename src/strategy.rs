//! Two interchangeable ways of resolving a path, and the coordinator that
//! prefers the single-call one.
//!
//! [`ProcedureStrategy`] asks the backend to do the whole walk in one
//! procedure call. [`MultiQueryStrategy`] rebuilds the same answer from
//! primitive reads, one level at a time. [`FallbackResolver`] runs the first
//! and re-runs the second whenever the first fails with a recoverable code.
//! Both strategies must agree on every path; `tests/strategy_equivalence_tests.rs`
//! holds them to that.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    content::resolve_content,
    errors::{Failure, FailureCode},
    hierarchy::{children_of, resolve},
    store::{PROC_CONTENT_BY_PATH, PROC_SEGMENT_CHILDREN, RelationStore},
    types::{ChildListing, Content, ItemType, ListingItem, NodeId, ParentRef},
};

pub trait ResolveStrategy {
    fn name(&self) -> &'static str;

    fn list_children(&self, names: &[String]) -> Result<ChildListing, Failure>;

    /// The content record bound to the path, before materialization.
    fn find_content(&self, names: &[String]) -> Result<Content, Failure>;
}

impl<T> ResolveStrategy for &T
where
    T: ResolveStrategy + ?Sized,
{
    fn name(&self) -> &'static str {
        (*self).name()
    }

    fn list_children(&self, names: &[String]) -> Result<ChildListing, Failure> {
        (*self).list_children(names)
    }

    fn find_content(&self, names: &[String]) -> Result<Content, Failure> {
        (*self).find_content(names)
    }
}

#[derive(Deserialize)]
struct ChildRow {
    id: NodeId,
    name: String,
    item_type: ItemType,
    segment_id: Option<NodeId>,
}

pub struct ProcedureStrategy<S> {
    store: S,
}

impl<S> ProcedureStrategy<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: RelationStore> ProcedureStrategy<S> {
    fn call_rows<T>(&self, procedure: &str, names: &[String]) -> Result<Vec<T>, Failure>
    where
        T: for<'de> Deserialize<'de>,
    {
        let rows = self
            .store
            .call(procedure, &json!({ "path_segments": names }))
            .map_err(|err| Failure::new(FailureCode::BackendFailed, err.to_string()))?;
        match rows {
            Value::Null => Ok(Vec::new()),
            rows => serde_json::from_value(rows).map_err(|err| {
                Failure::new(
                    FailureCode::BackendFailed,
                    format!("{procedure} returned malformed rows: {err}"),
                )
            }),
        }
    }
}

impl<S: RelationStore> ResolveStrategy for ProcedureStrategy<S> {
    fn name(&self) -> &'static str {
        "procedure"
    }

    fn list_children(&self, names: &[String]) -> Result<ChildListing, Failure> {
        let rows: Vec<ChildRow> = self.call_rows(PROC_SEGMENT_CHILDREN, names)?;
        let Some(first) = rows.first() else {
            return Err(Failure::new(FailureCode::PathNotFound, "No data returned"));
        };
        let segment_id = first.segment_id.clone();
        let items = rows
            .into_iter()
            .map(|row| ListingItem {
                id: row.id,
                name: row.name,
                item_type: row.item_type,
            })
            .collect();
        Ok(ChildListing { items, segment_id })
    }

    fn find_content(&self, names: &[String]) -> Result<Content, Failure> {
        let rows: Vec<Content> = self.call_rows(PROC_CONTENT_BY_PATH, names)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Failure::new(FailureCode::ContentNotFound, "Content not found"))
    }
}

pub struct MultiQueryStrategy<S> {
    store: S,
}

impl<S> MultiQueryStrategy<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: RelationStore> ResolveStrategy for MultiQueryStrategy<S> {
    fn name(&self) -> &'static str {
        "multi-query"
    }

    fn list_children(&self, names: &[String]) -> Result<ChildListing, Failure> {
        let parent = resolve(&self.store, names)?.ok_or_else(Failure::path_not_found)?;
        let mut items = Vec::new();
        for child in children_of(&self.store, &parent)? {
            let Some(segment) = self.store.segment(&child)? else {
                continue;
            };
            let item_type = if self.store.is_content(&child)? {
                ItemType::Content
            } else {
                ItemType::Segment
            };
            items.push(ListingItem {
                id: segment.id,
                name: segment.name,
                item_type,
            });
        }
        Ok(ChildListing {
            items,
            segment_id: parent.node().cloned(),
        })
    }

    fn find_content(&self, names: &[String]) -> Result<Content, Failure> {
        let node = match resolve(&self.store, names)? {
            Some(ParentRef::Node(id)) => id,
            Some(ParentRef::Root) | None => return Err(Failure::path_not_found()),
        };
        let content_id =
            resolve_content(&self.store, &node)?.ok_or_else(Failure::content_not_found)?;
        self.store.content(&content_id)?.ok_or_else(|| {
            Failure::new(
                FailureCode::ContentRecordMissing,
                format!("Content {content_id} not found"),
            )
        })
    }
}

/// Runs `primary`, and `fallback` when `primary` fails recoverably.
pub struct FallbackResolver<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> FallbackResolver<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P, F> FallbackResolver<P, F>
where
    P: ResolveStrategy,
    F: ResolveStrategy,
{
    fn run<T>(
        &self,
        operation: &str,
        primary: impl FnOnce(&P) -> Result<T, Failure>,
        fallback: impl FnOnce(&F) -> Result<T, Failure>,
    ) -> Result<T, Failure> {
        debug!(strategy = self.primary.name(), operation, "resolving");
        match primary(&self.primary) {
            Ok(found) => Ok(found),
            Err(failure) if failure.code.is_recoverable() => {
                warn!(
                    strategy = self.primary.name(),
                    fallback = self.fallback.name(),
                    operation,
                    code = failure.code.as_i32(),
                    message = %failure.message,
                    "primary strategy failed, falling back"
                );
                fallback(&self.fallback)
            }
            Err(failure) => Err(failure),
        }
    }
}

impl<P, F> ResolveStrategy for FallbackResolver<P, F>
where
    P: ResolveStrategy,
    F: ResolveStrategy,
{
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn list_children(&self, names: &[String]) -> Result<ChildListing, Failure> {
        self.run(
            "list_children",
            |primary| primary.list_children(names),
            |fallback| fallback.list_children(names),
        )
    }

    fn find_content(&self, names: &[String]) -> Result<Content, Failure> {
        self.run(
            "find_content",
            |primary| primary.find_content(names),
            |fallback| fallback.find_content(names),
        )
    }
}
