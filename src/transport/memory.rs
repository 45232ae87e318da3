//! In-memory transport implementation.
//!
//! This module provides a pure in-process link between two endpoints. It is
//! intended primarily for testing, local execution, and as a reference for
//! transport semantics.
//!
//! ## Reference Semantics
//!
//! - Once `subscribe()` returns successfully, frames the peer publishes
//!   *after* that point are deliverable to the returned inbox.
//! - Every subscriber on an endpoint receives its own copy of each frame.
//! - Delivery is deterministic within a single process; nothing is dropped
//!   due to timing or background IO.
//! - Frames published while the peer has no subscriber are discarded.
//!
//! ## Non-Goals
//!
//! This transport does not emulate the failure modes, framing or delivery
//! guarantees of any real socket or broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use crate::{
    // ---
    Error,
    Result,
    SubscriptionHandle,
    Transport,
    TransportPtr,
    WireFrame,
};

/// Inbox depth for each subscription.
const INBOX_CAPACITY: usize = 64;

/// Subscribers of one side of the link.
#[derive(Default)]
struct Side {
    subscribers: RwLock<Vec<mpsc::Sender<WireFrame>>>,
}

impl Side {
    async fn deliver(&self, _from: &str, frame: WireFrame) {
        // ---
        let subs = self.subscribers.read().await;

        if subs.is_empty() {
            log_debug!("{_from}: no subscriber for frame, discarding");
        }

        for sender in subs.iter() {
            // A closed channel indicates a dropped SubscriptionHandle.
            if let Err(_err) = sender.send(frame.clone()).await {
                log_debug!("{_from}: subscriber gone: {_err:?}");
            }
        }
    }
}

/// One end of an in-memory link.
struct MemoryTransport {
    // ---
    transport_id: String,
    local: Arc<Side>,
    remote: Arc<Side>,
    closed: AtomicBool,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    // ---
    fn transport_id(&self) -> &str {
        &self.transport_id
    }

    /// Deliver a frame to every subscriber on the peer endpoint.
    async fn publish(&self, frame: WireFrame) -> Result<()> {
        // ---
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Transport(format!(
                "{}: publish on closed transport",
                self.transport_id
            )));
        }

        self.remote.deliver(&self.transport_id, frame).await;
        Ok(())
    }

    /// Register a subscriber for frames published by the peer.
    async fn subscribe(&self) -> Result<SubscriptionHandle> {
        // ---
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Transport(format!(
                "{}: subscribe on closed transport",
                self.transport_id
            )));
        }

        log_debug!("{}: subscribe", self.transport_id);

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        self.local.subscribers.write().await.push(tx);

        Ok(SubscriptionHandle { inbox: rx })
    }

    /// Close this endpoint.
    ///
    /// Drops every local subscription, which ends their inboxes, and rejects
    /// further publishes. The peer endpoint stays usable.
    async fn close(&self) -> Result<()> {
        // ---
        log_debug!("{}: closing transport...", self.transport_id);

        self.closed.store(true, Ordering::Release);
        self.local.subscribers.write().await.clear();
        Ok(())
    }
}

/// Create two linked in-memory endpoints.
///
/// A frame published on one endpoint is delivered to the subscribers of the
/// other.
///
/// ```
/// # use corr_rpc::create_memory_pair;
/// # async fn example() -> corr_rpc::Result<()> {
/// let (client, server) = create_memory_pair("client", "server");
///
/// let mut inbox = server.subscribe().await?.inbox;
/// client.publish("request,abc,ping,".into()).await?;
///
/// assert_eq!(inbox.recv().await.as_deref(), Some("request,abc,ping,"));
/// # Ok(())
/// # }
/// ```
pub fn create_memory_pair(
    a_id: impl Into<String>,
    b_id: impl Into<String>,
) -> (TransportPtr, TransportPtr) {
    // ---
    let a_side = Arc::new(Side::default());
    let b_side = Arc::new(Side::default());

    let a = MemoryTransport {
        transport_id: a_id.into(),
        local: a_side.clone(),
        remote: b_side.clone(),
        closed: AtomicBool::new(false),
    };

    let b = MemoryTransport {
        transport_id: b_id.into(),
        local: b_side,
        remote: a_side,
        closed: AtomicBool::new(false),
    };

    (Arc::new(a), Arc::new(b))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_publish_reaches_peer_only() {
        // ---
        let (a, b) = create_memory_pair("a", "b");

        let mut a_inbox = a.subscribe().await.unwrap().inbox;
        let mut b_inbox = b.subscribe().await.unwrap().inbox;

        a.publish(WireFrame::from("return,x,y,z")).await.unwrap();

        let received = timeout(Duration::from_millis(100), b_inbox.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("inbox closed unexpectedly");
        assert_eq!(&*received, "return,x,y,z");

        assert!(a_inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_to_every_subscriber() {
        // ---
        let (a, b) = create_memory_pair("a", "b");
        let mut first = b.subscribe().await.unwrap().inbox;
        let mut second = b.subscribe().await.unwrap().inbox;

        a.publish(WireFrame::from("error,x,y,z")).await.unwrap();

        assert_eq!(first.recv().await.as_deref(), Some("error,x,y,z"));
        assert_eq!(second.recv().await.as_deref(), Some("error,x,y,z"));
    }

    #[tokio::test]
    async fn test_close_ends_inbox_and_rejects_publish() {
        // ---
        let (a, b) = create_memory_pair("a", "b");
        let mut inbox = a.subscribe().await.unwrap().inbox;

        a.close().await.unwrap();

        assert!(inbox.recv().await.is_none());
        assert!(matches!(
            a.publish(WireFrame::from("request,x,y,z")).await,
            Err(Error::Transport(_))
        ));

        // The peer can still publish; the frame is simply discarded.
        b.publish(WireFrame::from("request,x,y,z")).await.unwrap();
    }
}
