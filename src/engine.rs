use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::EngineConfig,
    errors::{Failure, FailureCode},
    hierarchy,
    materialize::{ContentPayload, materialize},
    path::tokenize,
    response::{Operation, Resolution},
    store::RelationStore,
    strategy::{FallbackResolver, MultiQueryStrategy, ProcedureStrategy, ResolveStrategy},
    tree::{TreeNode, fetch_tree},
    types::{ChildListing, NodeId, ParentRef},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchType {
    #[default]
    Normal,
    Tree,
}

impl FetchType {
    /// Anything other than `tree` is a normal fetch.
    pub fn parse(value: &str) -> Self {
        if value == "tree" {
            FetchType::Tree
        } else {
            FetchType::Normal
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    pub path: String,
    pub fetch_type: FetchType,
    pub token: Option<String>,
}

impl ResolveRequest {
    pub fn new<T: Into<String>>(path: T) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_fetch_type(mut self, fetch_type: FetchType) -> Self {
        self.fetch_type = fetch_type;
        self
    }

    pub fn with_token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingData {
    pub backend_reachable: bool,
    pub procedures_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingReply {
    pub code: i32,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PingData>,
}

/// Resolves request paths against a [`RelationStore`].
///
/// The engine holds no per-request state; one instance can serve concurrent
/// requests when the store is `Sync`.
pub struct SegmentEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S> SegmentEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<S: RelationStore> SegmentEngine<S> {
    /// The procedure strategy backed by the multi-query one, or the
    /// multi-query strategy alone when procedures are disabled.
    pub fn resolver(&self) -> Box<dyn ResolveStrategy + '_> {
        let fallback = MultiQueryStrategy::new(&self.store);
        if self.config.procedures.is_enabled() {
            Box::new(FallbackResolver::new(
                ProcedureStrategy::new(&self.store),
                fallback,
            ))
        } else {
            Box::new(fallback)
        }
    }

    #[instrument(skip(self))]
    pub fn list(&self, names: &[String]) -> Result<ChildListing, Failure> {
        self.resolver().list_children(names)
    }

    #[instrument(skip(self))]
    pub fn content(&self, names: &[String]) -> Result<ContentPayload, Failure> {
        let content = self.resolver().find_content(names)?;
        materialize(&self.store, content)
    }

    /// Resolves `names` to a segment and materializes its subtree. The root
    /// itself cannot be fetched as a tree.
    #[instrument(skip(self))]
    pub fn tree(&self, names: &[String]) -> Result<(NodeId, TreeNode), Failure> {
        if names.is_empty() {
            return Err(Failure::new(
                FailureCode::RootTreeRejected,
                "Cannot fetch tree for root",
            ));
        }
        let segment_id = match hierarchy::resolve(&self.store, names)? {
            Some(ParentRef::Node(id)) => id,
            Some(ParentRef::Root) | None => {
                return Err(Failure::new(FailureCode::PathNotFound, "Segment not found"));
            }
        };
        debug!(segment = %segment_id, "resolved tree root");
        let tree = fetch_tree(&self.store, &segment_id)?;
        Ok((segment_id, tree))
    }

    /// Dispatches a raw path: a container path lists children (or fetches a
    /// tree when asked to), a leaf path returns content.
    pub fn resolve(&self, raw_path: &str, fetch_type: FetchType) -> Resolution {
        let parsed = tokenize(raw_path);
        let path = display_path(raw_path);
        info!(
            path = %path,
            names = ?parsed.names,
            container = parsed.is_container,
            fetch_type = ?fetch_type,
            "resolving"
        );
        match (parsed.is_container, fetch_type) {
            (true, FetchType::Tree) => match self.tree(&parsed.names) {
                Ok((segment_id, tree)) => Resolution::Tree {
                    path,
                    segment_id,
                    tree,
                },
                Err(failure) => Resolution::failure(Operation::Tree, failure),
            },
            (true, FetchType::Normal) => match self.list(&parsed.names) {
                Ok(listing) => Resolution::ChildListing { path, listing },
                Err(failure) => Resolution::failure(Operation::List, failure),
            },
            (false, _) => match self.content(&parsed.names) {
                Ok(payload) => Resolution::Content(payload),
                Err(failure) => Resolution::failure(Operation::Content, failure),
            },
        }
    }

    /// [`Self::resolve`] behind the read-token check.
    pub fn handle(&self, request: &ResolveRequest) -> Resolution {
        if !self.config.verify_token(request.token.as_deref()) {
            return Resolution::failure(
                Operation::Authorize,
                Failure::new(FailureCode::InvalidToken, "Invalid or missing token"),
            );
        }
        self.resolve(&request.path, request.fetch_type)
    }

    pub fn ping(&self, token: Option<&str>) -> PingReply {
        if !self.config.verify_token(token) {
            return PingReply {
                code: 1,
                message: "Server is reachable but token is invalid",
                data: None,
            };
        }
        let backend_reachable = match self.store.ping() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "backend ping failed");
                false
            }
        };
        PingReply {
            code: 0,
            message: "Connection successful",
            data: Some(PingData {
                backend_reachable,
                procedures_enabled: self.config.procedures.is_enabled(),
            }),
        }
    }
}

fn display_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{raw}")
    }
}
