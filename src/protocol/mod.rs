//! Wire format for request/return/error frames.
//!
//! A frame is one line of text, `<kind>,<correlation_id>,<name>,<payload>`.
//! Only the payload may contain the delimiter; it is everything after the
//! third comma.

mod frame;

pub use frame::{decode, encode, Frame, FrameKind, RawFrame, DELIMITER};
