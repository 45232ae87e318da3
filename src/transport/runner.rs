//! Inbound frame runner.
//!
//! Glue between a [`Transport`](crate::Transport) and a
//! [`CorrelationEngine`]. The runner subscribes to the transport, then feeds
//! every frame it receives to [`CorrelationEngine::ingest`] on a spawned
//! task.
//!
//! ## Design notes
//!
//! ### Explicit execution
//!
//! Nothing is processed until [`run`] is called. Forgetting to call it simply
//! means replies are never matched and requests never handled.
//!
//! ### Error handling
//!
//! A frame the engine rejects (malformed, unknown kind) is logged at `warn`
//! level and the loop continues with the next frame. One bad frame never
//! brings down the reader.
//!
//! ### Lifetime
//!
//! The loop ends when the transport closes or the subscription is dropped.
//! Handlers run on the runner task, so a slow handler delays every frame
//! behind it on the same transport.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{CorrelationEngine, Result, TransportPtr};

/// Start feeding frames from `transport` into `engine`.
///
/// Subscribes before returning, so frames the peer publishes afterwards are
/// not missed. The returned handle resolves with `Ok(())` once the
/// transport closes.
///
/// # Errors
///
/// Returns `Error::Transport` if the subscription cannot be established.
pub async fn run(
    transport: TransportPtr,
    engine: Arc<CorrelationEngine>,
) -> Result<JoinHandle<Result<()>>> {
    // ---
    let mut handle = transport.subscribe().await?;
    let transport_id = transport.transport_id().to_string();

    let join = tokio::spawn(async move {
        // ---
        let mut _accepted: u64 = 0;
        let mut _rejected: u64 = 0;

        while let Some(frame) = handle.inbox.recv().await {
            match engine.try_ingest(&frame) {
                Ok(_) => _accepted += 1,
                Err(_err) => {
                    _rejected += 1;
                    log_warn!("{transport_id}: rejected inbound frame: {_err}");
                }
            }
        }

        log_debug!(
            "{transport_id}: transport closed ({_accepted} accepted, {_rejected} rejected)"
        );
        Ok(())
    });

    Ok(join)
}
