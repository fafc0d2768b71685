//! Tagged results of a resolution request and their rendering into a reply.
//!
//! Success bodies are `{code: 0, message, data}`; failures are
//! `{code, message}`. Content replies are raw bodies with the content's MIME
//! type, JSON content being parsed and re-serialized.

use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    errors::{Failure, FailureCode},
    materialize::{ContentBody, ContentPayload, MIME_JSON},
    tree::TreeNode,
    types::{ChildListing, ListingItem, NodeId},
};

const MIME_JSON_REPLY: &str = "application/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Authorize,
    List,
    Content,
    Tree,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    ChildListing {
        path: String,
        listing: ChildListing,
    },
    Content(ContentPayload),
    Tree {
        path: String,
        segment_id: NodeId,
        tree: TreeNode,
    },
    Failure {
        operation: Operation,
        failure: Failure,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    code: i32,
    message: &'a str,
    data: T,
}

#[derive(Serialize)]
struct ListingData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    path: &'a str,
    items: &'a [ListingItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    segment_id: Option<&'a NodeId>,
}

#[derive(Serialize)]
struct TreeData<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    path: &'a str,
    segment_id: &'a NodeId,
    tree: &'a TreeNode,
}

impl Resolution {
    pub fn failure(operation: Operation, failure: Failure) -> Self {
        Resolution::Failure { operation, failure }
    }

    pub fn code(&self) -> i32 {
        match self {
            Resolution::Failure { failure, .. } => failure.code.as_i32(),
            _ => 0,
        }
    }

    pub fn render(&self) -> Reply {
        match self {
            Resolution::ChildListing { path, listing } => json_reply(
                200,
                &Envelope {
                    code: 0,
                    message: "Children fetched successfully",
                    data: ListingData {
                        kind: "segment_list",
                        path,
                        items: &listing.items,
                        segment_id: listing.segment_id.as_ref(),
                    },
                },
            ),
            Resolution::Tree {
                path,
                segment_id,
                tree,
            } => json_reply(
                200,
                &Envelope {
                    code: 0,
                    message: "Tree fetched successfully",
                    data: TreeData {
                        kind: "segment_tree",
                        path,
                        segment_id,
                        tree,
                    },
                },
            ),
            Resolution::Content(payload) => content_reply(payload),
            Resolution::Failure { operation, failure } => {
                json_reply(failure_status(*operation, failure.code), failure)
            }
        }
    }
}

pub fn failure_status(operation: Operation, code: FailureCode) -> u16 {
    match (operation, code) {
        (_, FailureCode::InvalidToken) => 401,
        (Operation::Tree, FailureCode::RootTreeRejected) => 400,
        (Operation::Tree, FailureCode::PathNotFound) => 404,
        (Operation::Tree, _) => 500,
        (_, FailureCode::BinaryMissing | FailureCode::BinaryDecodeFailed) => 500,
        (_, FailureCode::BackendFailed) => 502,
        _ => 404,
    }
}

fn content_reply(payload: &ContentPayload) -> Reply {
    match &payload.body {
        ContentBody::Binary(bytes) => Reply {
            status: 200,
            content_type: payload.mime.to_string(),
            body: bytes.clone(),
        },
        ContentBody::Text(text) if payload.mime.starts_with(MIME_JSON) => {
            match serde_json::from_str::<Value>(text) {
                Ok(value) => json_reply(200, &value),
                Err(_) => text_reply(payload.mime, text),
            }
        }
        ContentBody::Text(text) => text_reply(payload.mime, text),
    }
}

fn text_reply(mime: &str, text: &str) -> Reply {
    Reply {
        status: 200,
        content_type: mime.to_string(),
        body: text.as_bytes().to_vec(),
    }
}

fn json_reply<T: Serialize + ?Sized>(status: u16, value: &T) -> Reply {
    match serde_json::to_vec(value) {
        Ok(body) => Reply {
            status,
            content_type: MIME_JSON_REPLY.to_string(),
            body,
        },
        Err(err) => Reply {
            status: 500,
            content_type: MIME_JSON_REPLY.to_string(),
            body: json!({
                "code": FailureCode::BackendFailed.as_i32(),
                "message": format!("reply serialization failed: {err}"),
            })
            .to_string()
            .into_bytes(),
        },
    }
}
