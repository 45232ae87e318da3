//! Correlation engine.
//!
//! The engine builds outgoing frames and routes incoming ones. Outgoing
//! requests get a fresh correlation id and, when a callback is supplied,
//! an entry in the bounded [`PendingRequests`] table. Incoming frames are
//! decoded and dispatched to exactly one of:
//!
//! - the request handler, for `request` frames
//! - the callback registered under the frame's correlation id, for
//!   `return` and `error` frames
//! - the orphan handler, for `return` and `error` frames with no pending entry
//!
//! Malformed frames and unknown kinds invoke nothing and report `false`.
//!
//! # Concurrency
//!
//! `CorrelationEngine` is `Send + Sync`. Requests may be created from many
//! tasks while one or more readers call `ingest`. The pending table is the
//! only shared mutable state and each of its operations is atomic. Handlers
//! run inline on the caller of `ingest`.
//!
//! # Dropped registrations
//!
//! When the table is full the request frame is still produced, but no
//! callback will observe its reply; the reply goes to the orphan handler.
//! [`CorrelationEngine::prepare_request`] reports whether registration
//! happened for callers that need to know.

mod handler;
mod pending;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

pub use handler::{Reply, ReplySender, RequestHandler, ResultCallback, ResultFn};
pub use pending::PendingRequests;

use crate::correlation::{CorrelationId, CorrelationIdGenerator};
use crate::error::FrameError;
use crate::protocol::{self, FrameKind};
use crate::RpcConfig;

/// Which handler, if any, consumed an ingested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A `request` frame went to the request handler.
    Request,
    /// A reply was delivered to its registered callback.
    Matched,
    /// A reply with no pending entry went to the orphan handler.
    Orphan,
    /// A well-formed frame found no handler to invoke.
    Dropped,
}

/// An encoded request along with its tracking status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// Correlation id embedded in the frame.
    pub correlation_id: CorrelationId,
    /// Wire string ready for the transport.
    pub frame: String,
    /// Whether a callback was stored for the reply.
    pub registered: bool,
}

/// Request/reply correlation over text frames.
pub struct CorrelationEngine {
    // ---
    ids: CorrelationIdGenerator,
    pending: PendingRequests,
    request_handler: Option<Arc<dyn RequestHandler>>,
    orphan_handler: Option<Arc<dyn ResultCallback>>,
}

impl CorrelationEngine {
    /// Create an engine with no handlers installed.
    pub fn new(config: &RpcConfig) -> Self {
        Self::with_id_generator(
            config,
            CorrelationIdGenerator::new(config.correlation_id_length),
        )
    }

    /// Create an engine using an explicit id generator.
    ///
    /// `config.correlation_id_length` is ignored in favour of the generator's own length.
    pub fn with_id_generator(config: &RpcConfig, ids: CorrelationIdGenerator) -> Self {
        Self {
            ids,
            pending: PendingRequests::new(config.max_pending_requests),
            request_handler: None,
            orphan_handler: None,
        }
    }

    /// Install the handler for incoming `request` frames.
    pub fn with_request_handler<H>(mut self, handler: H) -> Self
    where
        H: RequestHandler + 'static,
    {
        self.request_handler = Some(Arc::new(handler));
        self
    }

    /// Install the handler for replies whose correlation id is not pending.
    pub fn with_orphan_handler<H>(mut self, handler: H) -> Self
    where
        H: ResultCallback + 'static,
    {
        self.orphan_handler = Some(Arc::new(handler));
        self
    }

    /// Build a `request` frame, registering `callback` for its reply.
    ///
    /// The frame is returned even if registration is skipped.
    pub fn create_request(
        &self,
        name: &str,
        payload: &str,
        callback: Option<Box<dyn ResultCallback>>,
    ) -> String {
        self.prepare_request(name, payload, callback).frame
    }

    /// Like [`create_request`](Self::create_request) but also reports the id
    /// and whether the callback was registered.
    pub fn prepare_request(
        &self,
        name: &str,
        payload: &str,
        callback: Option<Box<dyn ResultCallback>>,
    ) -> OutgoingRequest {
        // ---
        let correlation_id = self.ids.generate();

        let registered = match callback {
            Some(callback) => {
                let inserted = self.pending.try_register(correlation_id.as_str(), callback);
                if !inserted {
                    log_warn!(
                        "reply tracking dropped for {correlation_id} ({name}): {} of {} pending",
                        self.pending.len(),
                        self.pending.capacity()
                    );
                }
                inserted
            }
            None => false,
        };

        let frame = protocol::encode(FrameKind::Request, correlation_id.as_str(), name, payload);

        OutgoingRequest {
            correlation_id,
            frame,
            registered,
        }
    }

    /// Build a `request` frame whose reply is delivered to a oneshot receiver.
    ///
    /// If `registered` is `false` on the returned request the receiver
    /// resolves with an error as soon as it is polled.
    pub fn request_channel(
        &self,
        name: &str,
        payload: &str,
    ) -> (OutgoingRequest, oneshot::Receiver<Reply>) {
        // ---
        let (sender, rx) = ReplySender::channel();
        let outgoing = self.prepare_request(name, payload, Some(Box::new(sender)));
        (outgoing, rx)
    }

    /// Build a `return` frame answering the request `correlation_id`.
    pub fn create_return(&self, correlation_id: &str, name: &str, payload: &str) -> String {
        protocol::encode(FrameKind::Return, correlation_id, name, payload)
    }

    /// Build an `error` frame answering the request `correlation_id`.
    pub fn create_error(&self, correlation_id: &str, name: &str, error: &str) -> String {
        protocol::encode(FrameKind::Error, correlation_id, name, error)
    }

    /// Decode and dispatch an incoming frame.
    ///
    /// Returns `false` for malformed frames or unknown kinds, which invoke
    /// no handler. Never panics on bad input.
    pub fn ingest(&self, wire: &str) -> bool {
        match self.try_ingest(wire) {
            Ok(_) => true,
            Err(_err) => {
                log_debug!("rejected frame: {_err}");
                false
            }
        }
    }

    /// Decode and dispatch an incoming frame, reporting which branch ran.
    pub fn try_ingest(&self, wire: &str) -> Result<Dispatch, FrameError> {
        // ---
        let frame = protocol::decode(wire)?;

        let dispatch = match frame.kind()? {
            FrameKind::Request => match &self.request_handler {
                Some(handler) => {
                    handler.on_request(frame.correlation_id, frame.name, frame.payload);
                    Dispatch::Request
                }
                None => Dispatch::Dropped,
            },
            FrameKind::Return => self.deliver(frame.correlation_id, |cb| {
                cb.on_return(frame.payload);
            }),
            FrameKind::Error => self.deliver(frame.correlation_id, |cb| {
                cb.on_error(frame.payload);
            }),
        };

        Ok(dispatch)
    }

    fn deliver<F>(&self, correlation_id: &str, invoke: F) -> Dispatch
    where
        F: FnOnce(&dyn ResultCallback),
    {
        // ---
        if let Some(callback) = self.pending.take(correlation_id) {
            invoke(&*callback);
            return Dispatch::Matched;
        }

        log_debug!("reply for unknown correlation id {correlation_id:?}");

        match &self.orphan_handler {
            Some(orphan) => {
                invoke(&**orphan);
                Dispatch::Orphan
            }
            None => Dispatch::Dropped,
        }
    }

    /// Number of requests awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether a reply for `correlation_id` is still awaited.
    pub fn is_pending(&self, correlation_id: &str) -> bool {
        self.pending.contains(correlation_id)
    }

    /// Stop tracking `correlation_id` without invoking its callback.
    ///
    /// A later reply with this id goes to the orphan handler. This is local
    /// bookkeeping only; nothing is sent to the peer.
    pub fn forget(&self, correlation_id: &str) -> bool {
        self.pending.remove(correlation_id)
    }

    /// Forget every request registered more than `max_age` ago.
    pub fn sweep(&self, max_age: Duration) -> usize {
        // ---
        let removed = self.pending.remove_older_than(max_age);
        if removed > 0 {
            log_info!("swept {removed} unanswered request(s) older than {max_age:?}");
        }
        removed
    }
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new(&RpcConfig::default())
    }
}
