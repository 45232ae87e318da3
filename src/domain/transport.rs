// src/domain/transport.rs

//! Transport domain abstractions.
//!
//! The correlation engine only produces and consumes wire strings; moving
//! them between peers is the job of a transport. This module defines the
//! minimal contract a transport must meet without referring to any concrete
//! protocol, socket type or client library.
//!
//! A transport delivers complete frames, one per unit. Splitting a byte
//! stream into frames (newline, length prefix, websocket message, ...) is the
//! transport's concern, never the engine's.
//!
//! Concrete implementations live under `src/transport/`.
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::Result;

/// One encoded frame as carried by a transport.
///
/// Cheap to clone so a frame can fan out to several subscribers.
pub type WireFrame = Arc<str>;

/// Handle returned from a successful subscription.
///
/// The subscription remains active until either:
/// - The handle is dropped (receiver channel closes)
/// - The transport is closed
pub struct SubscriptionHandle {
    // ---
    /// Frames delivered to this endpoint, in arrival order.
    pub inbox: mpsc::Receiver<WireFrame>,
}

/// Transport abstraction.
///
/// A `Transport` is one endpoint of a link to a peer. Frames published on
/// it are delivered to the peer's subscribers; frames the peer publishes
/// arrive in this endpoint's subscription inboxes.
///
/// Implementations must ensure that:
/// - Once `subscribe()` returns successfully, frames arriving *after* that
///   point are deliverable to the returned handle.
/// - Frames are delivered whole; a frame is never split or merged.
///
/// Delivery is best-effort. Ordering, retransmission and durability are not
/// promised at this layer.
///
/// # Notes
///
/// This trait uses `async_trait`; consumers should treat the methods as
/// normal `async fn`s.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    // ---
    /// Identifier of this endpoint, used for logging.
    fn transport_id(&self) -> &str;

    /// Send a frame to the peer.
    async fn publish(&self, frame: WireFrame) -> Result<()>;

    /// Register for frames arriving from the peer.
    async fn subscribe(&self) -> Result<SubscriptionHandle>;

    /// Close the endpoint, ending every subscription on it.
    async fn close(&self) -> Result<()>;
}

/// Shared transport pointer.
///
/// `.clone()` is cheap and every clone refers to the same endpoint.
pub type TransportPtr = Arc<dyn Transport>;
