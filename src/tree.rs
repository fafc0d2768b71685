use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    errors::{Failure, FailureCode},
    store::{PROC_SEGMENT_TREE, RelationStore},
    types::NodeId,
};

/// One node of a materialized subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item_type", rename_all = "lowercase")]
pub enum TreeNode {
    Segment {
        id: NodeId,
        name: String,
        #[serde(default)]
        children: Vec<TreeNode>,
    },
    Content {
        id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        type_code: i64,
        value: String,
    },
}

impl TreeNode {
    pub fn id(&self) -> &NodeId {
        match self {
            TreeNode::Segment { id, .. } | TreeNode::Content { id, .. } => id,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Segment { children, .. } => children,
            TreeNode::Content { .. } => &[],
        }
    }
}

/// Materializes the subtree under `root` with a single procedure call. There
/// is no multi-query fallback; a failed call is final.
pub fn fetch_tree<S>(store: &S, root: &NodeId) -> Result<TreeNode, Failure>
where
    S: RelationStore + ?Sized,
{
    let response = store
        .call(PROC_SEGMENT_TREE, &json!({ "root_segment_id": root }))
        .map_err(|err| {
            error!(segment = %root, error = %err, "tree procedure failed");
            Failure::new(FailureCode::BackendFailed, err.to_string())
        })?;
    if response == Value::Null {
        error!(segment = %root, "tree procedure returned no data");
        return Err(Failure::new(
            FailureCode::BackendFailed,
            "Failed to fetch tree",
        ));
    }
    serde_json::from_value(response).map_err(|err| {
        Failure::new(
            FailureCode::BackendFailed,
            format!("{PROC_SEGMENT_TREE} returned a malformed tree: {err}"),
        )
    })
}
