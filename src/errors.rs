use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentGraphError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("procedure {0} is not available on this backend")]
    ProcedureUnavailable(String),
    #[error("procedure error: {0}")]
    ProcedureError(String),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("config error: {0}")]
    ConfigError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("output error: {0}")]
    OutputError(String),
}

impl SegmentGraphError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::QueryError(msg.into())
    }

    pub fn procedure_unavailable<T: Into<String>>(name: T) -> Self {
        SegmentGraphError::ProcedureUnavailable(name.into())
    }

    pub fn procedure<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::ProcedureError(msg.into())
    }

    pub fn decode<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::DecodeError(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::ConfigError(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::InvalidInput(msg.into())
    }

    pub fn output<T: Into<String>>(msg: T) -> Self {
        SegmentGraphError::OutputError(msg.into())
    }
}

/// Negative result codes surfaced at the response boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureCode {
    PathNotFound,
    ContentNotFound,
    ContentRecordMissing,
    BinaryMissing,
    BackendFailed,
    BinaryDecodeFailed,
    RootTreeRejected,
    InvalidToken,
}

impl FailureCode {
    pub fn as_i32(self) -> i32 {
        match self {
            FailureCode::PathNotFound => -1,
            FailureCode::ContentNotFound => -2,
            FailureCode::ContentRecordMissing => -3,
            FailureCode::BinaryMissing => -4,
            FailureCode::BackendFailed => -5,
            FailureCode::BinaryDecodeFailed => -6,
            FailureCode::RootTreeRejected => -7,
            FailureCode::InvalidToken => -8,
        }
    }

    /// Failures the fallback coordinator recovers from by re-running the
    /// multi-query strategy.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            FailureCode::PathNotFound | FailureCode::ContentNotFound | FailureCode::BackendFailed
        )
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

impl Serialize for FailureCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.as_i32())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[error("{message} (code {code})")]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
}

impl Failure {
    pub fn new<T: Into<String>>(code: FailureCode, message: T) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn path_not_found() -> Self {
        Self::new(FailureCode::PathNotFound, "Path does not exist")
    }

    pub fn content_not_found() -> Self {
        Self::new(
            FailureCode::ContentNotFound,
            "Content not found (no bound, direct, or indirect child content)",
        )
    }

    pub fn binary_missing(blob_id: &str) -> Self {
        Self::new(
            FailureCode::BinaryMissing,
            format!("Binary data not found for ID {blob_id}"),
        )
    }
}

impl From<SegmentGraphError> for Failure {
    fn from(err: SegmentGraphError) -> Self {
        match err {
            SegmentGraphError::DecodeError(msg) => {
                Failure::new(FailureCode::BinaryDecodeFailed, msg)
            }
            other => Failure::new(FailureCode::BackendFailed, other.to_string()),
        }
    }
}
