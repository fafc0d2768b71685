use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a segment, content or blob row.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new<T: Into<String>>(id: T) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

/// Position in the hierarchy: the implicit root, or a concrete node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParentRef {
    Root,
    Node(NodeId),
}

impl ParentRef {
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            ParentRef::Root => None,
            ParentRef::Node(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: NodeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: NodeId,
    pub type_code: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryBlob {
    pub id: NodeId,
    /// Hex text as surfaced by the backend, usually `\x`-prefixed.
    pub data: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Direct,
    Indirect,
    Bound,
}

impl RelationKind {
    pub fn code(self) -> i64 {
        match self {
            RelationKind::Direct => 0,
            RelationKind::Indirect => 1,
            RelationKind::Bound => 2,
        }
    }
}

/// Whether a listing entry is a plain segment or also a content record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Segment,
    Content,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingItem {
    pub id: NodeId,
    pub name: String,
    pub item_type: ItemType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChildListing {
    pub items: Vec<ListingItem>,
    /// Resolved parent; `None` when the listing is of the root.
    pub segment_id: Option<NodeId>,
}
