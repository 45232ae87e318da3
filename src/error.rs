use thiserror::Error;

use crate::correlation::CorrelationId;

/// Reasons a wire string cannot be turned into a dispatchable frame.
///
/// Both variants are local, non-fatal outcomes: the engine reports them
/// through a `false` return from `ingest` and never propagates them upward.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer than three delimiters, so the four fields cannot be located.
    #[error("malformed frame: expected 3 delimiters, found {found}")]
    MissingDelimiter { found: usize },

    /// The frame has the right shape but its kind is not `request`, `return` or `error`.
    #[error("unrecognized frame kind: {0:?}")]
    UnknownKind(String),
}

/// Errors surfaced by the async request helpers and transports.
#[derive(Error, Debug)]
pub enum Error {
    /// Frame could not be decoded or dispatched.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// No reply arrived within the configured request timeout.
    #[error("request timed out")]
    Timeout,

    /// The transport failed to deliver or was closed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The reply callback was not registered, so no reply can be awaited.
    ///
    /// Happens when the pending table is full or the id is already pending.
    /// The request frame was still sent.
    #[error("callback not registered for request {0} (table full or id already pending)")]
    NotRegistered(CorrelationId),

    /// The reply channel closed before a reply was delivered.
    #[error("reply channel closed before a reply arrived")]
    ChannelClosed,

    /// The peer answered with an `error` frame.
    #[error("remote error: {0}")]
    Remote(String),

    /// JSON serialization or deserialization of a payload failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
