use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Field separator on the wire.
pub const DELIMITER: char = ',';

/// The three frame kinds the protocol knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// A call carrying a name and payload.
    Request,
    /// A successful answer to a request.
    Return,
    /// A failed answer to a request.
    Error,
}

impl FrameKind {
    /// The exact, case-sensitive wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Request => "request",
            FrameKind::Return => "return",
            FrameKind::Error => "error",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameKind {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(FrameKind::Request),
            "return" => Ok(FrameKind::Return),
            "error" => Ok(FrameKind::Error),
            other => Err(FrameError::UnknownKind(other.to_string())),
        }
    }
}

/// Encode the four fields into a wire string.
///
/// `correlation_id` and `name` must not contain [`DELIMITER`]; this is not
/// checked. `payload` is appended verbatim and may contain anything.
pub fn encode(kind: FrameKind, correlation_id: &str, name: &str, payload: &str) -> String {
    // ---
    let kind = kind.as_str();
    let mut wire =
        String::with_capacity(kind.len() + correlation_id.len() + name.len() + payload.len() + 3);

    wire.push_str(kind);
    wire.push(DELIMITER);
    wire.push_str(correlation_id);
    wire.push(DELIMITER);
    wire.push_str(name);
    wire.push(DELIMITER);
    wire.push_str(payload);
    wire
}

/// Split a wire string into its four segments.
///
/// The first three delimiters are field boundaries; any later ones belong
/// to the payload. The kind segment is not validated here, see
/// [`RawFrame::kind`].
pub fn decode(wire: &str) -> Result<RawFrame<'_>, FrameError> {
    // ---
    let mut parts = wire.splitn(4, DELIMITER);

    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(kind), Some(correlation_id), Some(name), Some(payload)) => Ok(RawFrame {
            kind,
            correlation_id,
            name,
            payload,
        }),
        _ => Err(FrameError::MissingDelimiter {
            found: wire.matches(DELIMITER).count(),
        }),
    }
}

/// A decoded frame borrowing from the wire string.
///
/// The kind is still raw text; an unknown kind is a dispatch concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub kind: &'a str,
    pub correlation_id: &'a str,
    pub name: &'a str,
    pub payload: &'a str,
}

impl RawFrame<'_> {
    /// Parse the kind segment.
    pub fn kind(&self) -> Result<FrameKind, FrameError> {
        self.kind.parse()
    }

    /// Validate the kind and copy the fields into an owned [`Frame`].
    pub fn into_owned(self) -> Result<Frame, FrameError> {
        Ok(Frame {
            kind: self.kind()?,
            correlation_id: self.correlation_id.to_string(),
            name: self.name.to_string(),
            payload: self.payload.to_string(),
        })
    }
}

/// An owned frame with a recognized kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: FrameKind,
    pub correlation_id: String,
    pub name: String,
    pub payload: String,
}

impl Frame {
    /// Build a frame from its parts.
    pub fn new(
        kind: FrameKind,
        correlation_id: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            correlation_id: correlation_id.into(),
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Decode a wire string, rejecting unknown kinds.
    pub fn decode(wire: &str) -> Result<Self, FrameError> {
        decode(wire)?.into_owned()
    }

    /// Encode this frame into a wire string.
    pub fn encode(&self) -> String {
        encode(self.kind, &self.correlation_id, &self.name, &self.payload)
    }
}
