use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ModelError;

/// Failure reported by a request handler.
///
/// Travels over the wire as the `error` entry of a response message, so a
/// handler failure on one side becomes a failed [`crate::PendingResponse`] on
/// the other side instead of a local fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerFailure {
    pub code: String,
    pub message: String,
}

impl HandlerFailure {
    pub const NO_HANDLER: &'static str = "NO_HANDLER";
    pub const HANDLER_PANICKED: &'static str = "HANDLER_PANICKED";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Malformed or tag-mismatched data read from the other side of the bridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected a keyed map")]
    NotAMap,

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid field `{field}`: expected {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("message name must not be empty")]
    EmptyName,

    #[error("only response messages may carry an error")]
    UnexpectedError,

    #[error("type tag is missing")]
    MissingTypeTag,

    #[error("type tag mismatch: expected {expected}, found {found}")]
    TypeTagMismatch { expected: String, found: String },

    #[error("unknown type tag: {0}")]
    UnknownTypeTag(String),

    #[error("invalid json: {0}")]
    Json(String),

    #[error("model rejected decoded fields: {0}")]
    Model(#[from] ModelError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("remote side disconnected")]
    Disconnected,

    #[error("transport send failed: {0}")]
    SendFailed(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by the bridge to local callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Request timed out: {request_id} after {timeout_ms}ms")]
    Timeout { request_id: String, timeout_ms: u64 },

    #[error("Request handler failed: {0}")]
    Handler(HandlerFailure),

    #[error("Request cancelled: {0}")]
    Cancelled(String),

    #[error("Bridge not ready and its backlog is full")]
    NotReady,

    #[error("Bridge has shut down")]
    ShutDown,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
