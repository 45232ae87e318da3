//! Request/response correlation over comma-delimited text frames.
//!
//! Two peers exchange frames of the form
//!
//! ```text
//! <kind>,<correlation_id>,<name>,<payload>
//! ```
//!
//! where `kind` is `request`, `return` or `error`. A request carries a
//! random correlation id; the peer answers with a `return` or `error` frame
//! echoing that id, and the [`CorrelationEngine`] routes the answer to the
//! callback registered when the request was created.
//!
//! The engine never touches sockets. A transport hands it complete frames
//! through [`CorrelationEngine::ingest`] and sends the strings it produces.
//! The in-memory [`create_memory_pair`] transport and the [`runner`] are
//! provided for tests and local wiring.
//!
//! ```
//! use corr_rpc::{CorrelationEngine, ResultFn, RpcConfig};
//!
//! let client = CorrelationEngine::new(&RpcConfig::client());
//! let server = CorrelationEngine::new(&RpcConfig::server())
//!     .with_request_handler(|id: &str, name: &str, payload: &str| {
//!         println!("{name}({payload}) as {id}");
//!     });
//!
//! let frame = client.create_request(
//!     "add",
//!     "2,3",
//!     Some(Box::new(ResultFn::new(
//!         |sum: &str| assert_eq!(sum, "5"),
//!         |err: &str| panic!("add failed: {err}"),
//!     ))),
//! );
//!
//! assert!(server.ingest(&frame));
//! ```

#[macro_use]
mod macros;

mod client;
mod domain;
mod engine;
mod transport;

mod rpc_config;

mod correlation;
mod error;

pub mod protocol;

// Re-export main types
pub use client::RpcClient;
pub use engine::{
    //
    CorrelationEngine,
    Dispatch,
    OutgoingRequest,
    PendingRequests,
    Reply,
    ReplySender,
    RequestHandler,
    ResultCallback,
    ResultFn,
};

pub use rpc_config::{RpcConfig, DEFAULT_MAX_PENDING_REQUESTS, SERVER_MAX_PENDING_REQUESTS};

pub use correlation::{CorrelationId, CorrelationIdGenerator, DEFAULT_ID_LENGTH};
pub use error::{Error, FrameError, Result};

pub use protocol::{Frame, FrameKind};

pub use transport::{create_memory_pair, runner};

// --- public re-exports
pub use domain::{
    //
    SubscriptionHandle,
    Transport,
    TransportPtr,
    WireFrame,
};
