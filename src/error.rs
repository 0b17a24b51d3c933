use thiserror::Error;

/// Failure reported by a [`Gateway`](crate::gateway::Gateway) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a read through the shade directory.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The cache was stale and refreshing it failed.
    #[error("shade data could not be refreshed: {0}")]
    GatewayUnavailable(#[from] GatewayError),
    #[error("shade {0} not found")]
    NotFound(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Every worker has stopped, so nothing would ever serve the request.
    #[error("update dispatcher is not running")]
    Closed,
}
