//! Handler traits invoked by the engine while ingesting frames.
//!
//! All handlers run synchronously inside `ingest`, on whichever thread or
//! task called it. They must be `Send + Sync` because `ingest` may run
//! concurrently from several readers.

use std::fmt;
use std::sync::Mutex;

use tokio::sync::oneshot;

/// Receives every incoming `request` frame.
pub trait RequestHandler: Send + Sync {
    /// Called with the fields of the request. Answer it by sending
    /// `create_return` or `create_error` with the same id and name.
    fn on_request(&self, correlation_id: &str, name: &str, payload: &str);
}

impl<F> RequestHandler for F
where
    F: Fn(&str, &str, &str) + Send + Sync,
{
    fn on_request(&self, correlation_id: &str, name: &str, payload: &str) {
        self(correlation_id, name, payload)
    }
}

/// Receives the outcome of a request.
///
/// Used both for per-request callbacks held in the pending table and for
/// the engine-wide orphan handler.
pub trait ResultCallback: Send + Sync {
    /// The peer answered with a `return` frame.
    fn on_return(&self, data: &str);

    /// The peer answered with an `error` frame.
    fn on_error(&self, error: &str);
}

/// A [`ResultCallback`] built from two closures.
pub struct ResultFn<R, E> {
    on_return: R,
    on_error: E,
}

impl<R, E> ResultFn<R, E>
where
    R: Fn(&str) + Send + Sync,
    E: Fn(&str) + Send + Sync,
{
    pub fn new(on_return: R, on_error: E) -> Self {
        Self {
            on_return,
            on_error,
        }
    }
}

impl<R, E> ResultCallback for ResultFn<R, E>
where
    R: Fn(&str) + Send + Sync,
    E: Fn(&str) + Send + Sync,
{
    fn on_return(&self, data: &str) {
        (self.on_return)(data)
    }

    fn on_error(&self, error: &str) {
        (self.on_error)(error)
    }
}

/// The answer to a request, as delivered over a [`ReplySender`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Return(String),
    Error(String),
}

impl Reply {
    /// Payload of the reply regardless of its kind.
    pub fn payload(&self) -> &str {
        match self {
            Reply::Return(data) | Reply::Error(data) => data,
        }
    }

    /// Convert into a `Result`, treating an `error` reply as `Err`.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Reply::Return(data) => Ok(data),
            Reply::Error(error) => Err(error),
        }
    }
}

/// Forwards a reply into a oneshot channel so it can be awaited.
///
/// The sender is consumed on first use; a second invocation is a no-op.
pub struct ReplySender {
    tx: Mutex<Option<oneshot::Sender<Reply>>>,
}

impl ReplySender {
    /// Create a sender and the receiver that will observe its reply.
    pub fn channel() -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    fn deliver(&self, reply: Reply) {
        // ---
        let tx = match self.tx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(tx) = tx {
            if tx.send(reply).is_err() {
                log_debug!("reply arrived after the waiter was dropped");
            }
        }
    }
}

impl ResultCallback for ReplySender {
    fn on_return(&self, data: &str) {
        self.deliver(Reply::Return(data.to_string()));
    }

    fn on_error(&self, error: &str) {
        self.deliver(Reply::Error(error.to_string()));
    }
}

impl fmt::Debug for ReplySender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplySender").finish_non_exhaustive()
    }
}
