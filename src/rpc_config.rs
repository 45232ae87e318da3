//! Engine configuration.
//!
//! Two knobs shape the correlation engine: how long correlation ids are and
//! how many unanswered requests are tracked. A third, `request_timeout`, is
//! only read by the async [`RpcClient`](crate::RpcClient) helper.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::correlation::DEFAULT_ID_LENGTH;

/// Default cap on outstanding tracked requests.
pub const DEFAULT_MAX_PENDING_REQUESTS: usize = 100;

/// Suggested cap for a server talking to many clients.
pub const SERVER_MAX_PENDING_REQUESTS: usize = 32;

/// Correlation engine configuration.
///
/// # Example
///
/// ```
/// use corr_rpc::RpcConfig;
/// use std::time::Duration;
///
/// let config = RpcConfig::server()
///     .with_correlation_id_length(16)
///     .with_request_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.max_pending_requests, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    // ---
    /// Symbols per generated correlation id.
    ///
    /// Shorter ids shrink frames but raise the collision rate.
    ///
    /// Default: 10
    pub correlation_id_length: usize,

    /// Maximum number of requests awaiting a reply.
    ///
    /// Once reached, new requests are still sent but their replies are
    /// routed to the orphan handler instead of a callback.
    ///
    /// Default: 100. Around 10-50 suits a server with many clients.
    pub max_pending_requests: usize,

    /// How long [`RpcClient::request`](crate::RpcClient::request) waits for
    /// a reply before giving up.
    ///
    /// Default: 30 seconds
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            correlation_id_length: DEFAULT_ID_LENGTH,
            max_pending_requests: DEFAULT_MAX_PENDING_REQUESTS,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl RpcConfig {
    /// Configuration for a single client. Same as `default()`.
    pub fn client() -> Self {
        Self::default()
    }

    /// Configuration for a server holding state for many peers.
    pub fn server() -> Self {
        Self {
            max_pending_requests: SERVER_MAX_PENDING_REQUESTS,
            ..Self::default()
        }
    }

    /// Set the correlation id length.
    pub fn with_correlation_id_length(mut self, length: usize) -> Self {
        self.correlation_id_length = length;
        self
    }

    /// Set the pending-request cap.
    pub fn with_max_pending_requests(mut self, max: usize) -> Self {
        self.max_pending_requests = max;
        self
    }

    /// Set the async request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
