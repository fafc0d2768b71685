//! Turns a content record into a typed payload.
//!
//! Binary payloads live out of line: the content value is `binary:<blob id>`
//! and the blob column holds hex text whose bytes are base64 text of the real
//! payload. Decoding must run hex first, then base64.

use data_encoding::{BASE64, HEXLOWER_PERMISSIVE};
use tracing::debug;

use crate::{
    errors::{Failure, FailureCode, SegmentGraphError},
    store::RelationStore,
    types::Content,
};

pub const BINARY_MARKER: &str = "binary:";
pub const HEX_PREFIX: &str = "\\x";

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_HTML: &str = "text/html";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_JSON: &str = "application/json";
pub const MIME_PNG: &str = "image/png";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

const INLINE_TYPES: &[(i64, &str)] = &[
    (1, MIME_TEXT),
    (2, MIME_HTML),
    (3, MIME_MARKDOWN),
    (4, MIME_JSON),
    (10, MIME_PNG),
    (21, MIME_PDF),
];

const BINARY_TYPES: &[(i64, &str)] = &[(10, MIME_PNG), (21, MIME_PDF)];

pub fn inline_mime(type_code: i64) -> &'static str {
    lookup(INLINE_TYPES, type_code).unwrap_or(MIME_TEXT)
}

pub fn binary_mime(type_code: i64) -> &'static str {
    lookup(BINARY_TYPES, type_code).unwrap_or(MIME_OCTET_STREAM)
}

fn lookup(table: &[(i64, &'static str)], type_code: i64) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| *code == type_code)
        .map(|(_, mime)| *mime)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBody {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPayload {
    pub content: Content,
    pub mime: &'static str,
    pub body: ContentBody,
}

impl ContentPayload {
    pub fn is_binary(&self) -> bool {
        matches!(self.body, ContentBody::Binary(_))
    }
}

/// Blob id referenced by a binary-indirected value.
pub fn binary_reference(value: &str) -> Option<&str> {
    value.strip_prefix(BINARY_MARKER)
}

pub fn materialize<S>(store: &S, content: Content) -> Result<ContentPayload, Failure>
where
    S: RelationStore + ?Sized,
{
    let Some(blob_id) = binary_reference(&content.value) else {
        return Ok(ContentPayload {
            mime: inline_mime(content.type_code),
            body: ContentBody::Text(content.value.clone()),
            content,
        });
    };
    debug!(content = %content.id, blob = blob_id, "dereferencing binary content");
    let blob = store
        .binary(blob_id)?
        .ok_or_else(|| Failure::binary_missing(blob_id))?;
    let bytes = decode_binary(&blob.data).map_err(|err| {
        Failure::new(
            FailureCode::BinaryDecodeFailed,
            format!("Binary data {blob_id} could not be decoded: {err}"),
        )
    })?;
    Ok(ContentPayload {
        mime: binary_mime(content.type_code),
        body: ContentBody::Binary(bytes),
        content,
    })
}

/// Reverses the stored encoding: optional `\x`, hex, UTF-8 base64 text, bytes.
/// Bytes outside the base64 alphabet (line breaks in wrapped payloads) are
/// discarded before the base64 layer is decoded.
pub fn decode_binary(data: &str) -> Result<Vec<u8>, SegmentGraphError> {
    let hex = data.strip_prefix(HEX_PREFIX).unwrap_or(data);
    let base64_bytes = HEXLOWER_PERMISSIVE
        .decode(hex.as_bytes())
        .map_err(|e| SegmentGraphError::decode(format!("hex layer: {e}")))?;
    let base64_text = std::str::from_utf8(&base64_bytes)
        .map_err(|e| SegmentGraphError::decode(format!("base64 layer is not UTF-8: {e}")))?;
    let alphabet: Vec<u8> = base64_text
        .bytes()
        .filter(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        .collect();
    BASE64
        .decode(&alphabet)
        .map_err(|e| SegmentGraphError::decode(format!("base64 layer: {e}")))
}

/// The transform the backend applies on write; the inverse of [`decode_binary`]
/// minus the `\x` prefix, which the backend adds when reading byte columns.
pub fn encode_binary(bytes: &[u8]) -> Vec<u8> {
    BASE64.encode(bytes).into_bytes()
}
