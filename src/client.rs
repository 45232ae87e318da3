//! Async request helper.
//!
//! [`RpcClient`] pairs a [`CorrelationEngine`] with a transport so a caller
//! can `await` the reply to a request instead of supplying a callback.
//!
//! Each request registers a [`ReplySender`](crate::ReplySender) in the
//! engine's pending table and publishes the frame. The reply is delivered by
//! whichever task drives `ingest` for the transport, usually
//! [`runner::run`](crate::runner::run).
//!
//! If no reply arrives within `RpcConfig::request_timeout`, or the request
//! future is dropped first, the pending entry is forgotten, so a late reply
//! is routed to the orphan handler.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time;

use crate::{
    // ---
    runner,
    CorrelationEngine,
    CorrelationId,
    Error,
    OutgoingRequest,
    Reply,
    Result,
    RpcConfig,
    TransportPtr,
    WireFrame,
};

/// Running client instance.
///
/// Cheap to clone (internally `Arc`-backed).
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    engine: Arc<CorrelationEngine>,
    transport: TransportPtr,
    request_timeout: Duration,
}

impl RpcClient {
    /// Create a client over an existing engine and transport.
    ///
    /// The caller is responsible for driving `ingest` on the transport,
    /// e.g. with [`runner::run`].
    pub fn new(engine: Arc<CorrelationEngine>, transport: TransportPtr, config: &RpcConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                transport,
                request_timeout: config.request_timeout,
            }),
        }
    }

    /// Create a client and start the inbound runner for its transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the transport subscription fails.
    pub async fn start(
        engine: Arc<CorrelationEngine>,
        transport: TransportPtr,
        config: &RpcConfig,
    ) -> Result<(Self, JoinHandle<Result<()>>)> {
        // ---
        let rx_task = runner::run(transport.clone(), engine.clone()).await?;
        Ok((Self::new(engine, transport, config), rx_task))
    }

    /// The engine backing this client.
    pub fn engine(&self) -> &Arc<CorrelationEngine> {
        &self.inner.engine
    }

    /// Send a request and wait for its reply using the configured timeout.
    ///
    /// # Errors
    ///
    /// - `Error::NotRegistered` - the callback was not registered (table
    ///   full or id already pending); the frame was still published but its
    ///   reply cannot be awaited
    /// - `Error::Transport` - publishing failed
    /// - `Error::Timeout` - no reply within the configured timeout
    /// - `Error::ChannelClosed` - the pending entry was dropped before a reply
    pub async fn request(&self, name: &str, payload: &str) -> Result<Reply> {
        self.request_with_timeout(name, payload, self.inner.request_timeout)
            .await
    }

    /// Send a request and wait at most `timeout` for its reply.
    ///
    /// The timeout covers the whole exchange, publishing included. If the
    /// returned future is dropped before a reply arrives, the pending entry
    /// is forgotten.
    pub async fn request_with_timeout(
        &self,
        name: &str,
        payload: &str,
        timeout: Duration,
    ) -> Result<Reply> {
        // ---
        let engine = &self.inner.engine;
        let (request, rx) = engine.request_channel(name, payload);
        let OutgoingRequest {
            correlation_id,
            frame,
            registered,
        } = request;

        let mut guard = PendingGuard {
            engine: &**engine,
            correlation_id: correlation_id.clone(),
            armed: registered,
        };

        let transport = &self.inner.transport;
        let exchange = async move {
            transport.publish(WireFrame::from(frame)).await?;

            if !registered {
                return Err(Error::NotRegistered(correlation_id));
            }

            rx.await.map_err(|_| Error::ChannelClosed)
        };

        match time::timeout(timeout, exchange).await {
            Ok(Ok(reply)) => {
                guard.armed = false;
                Ok(reply)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                log_debug!(
                    "request {} ({name}) timed out after {timeout:?}",
                    guard.correlation_id
                );
                Err(Error::Timeout)
            }
        }
    }

    /// Send a JSON-encoded request and decode the JSON reply.
    ///
    /// An `error` reply becomes `Error::Remote` carrying its payload.
    pub async fn request_json<TReq, TResp>(&self, name: &str, req: &TReq) -> Result<TResp>
    where
        TReq: Serialize,
        TResp: DeserializeOwned,
    {
        // ---
        let payload = serde_json::to_string(req)?;

        match self.request(name, &payload).await? {
            Reply::Return(data) => Ok(serde_json::from_str(&data)?),
            Reply::Error(error) => Err(Error::Remote(error)),
        }
    }

    /// Fire a request without tracking its reply.
    ///
    /// Any reply is routed to the engine's orphan handler.
    pub async fn notify(&self, name: &str, payload: &str) -> Result<()> {
        // ---
        let frame = self.inner.engine.create_request(name, payload, None);
        self.inner.transport.publish(WireFrame::from(frame)).await
    }
}

/// Forgets a pending entry when an in-flight request is abandoned.
///
/// Dropped on every exit from `request_with_timeout`, including when the
/// caller drops the future mid-await.
struct PendingGuard<'a> {
    engine: &'a CorrelationEngine,
    correlation_id: CorrelationId,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        // ---
        if self.armed && self.engine.forget(self.correlation_id.as_str()) {
            log_debug!("forgot abandoned request {}", self.correlation_id);
        }
    }
}
