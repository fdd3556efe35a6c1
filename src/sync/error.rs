//! Error taxonomy for the synchronization layer

use thiserror::Error;

/// Errors surfaced by the connector and the command gateway.
///
/// Stale fetch results are deliberately not an error: the store reports them
/// as a non-applied [`SeedOutcome`](super::store::SeedOutcome) and they are
/// dropped silently.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No access token available for the transport connect. Fatal to that
    /// connect attempt, not to the app.
    #[error("no access token available; log in first")]
    AuthMissing,

    /// Transport-level failure. Handled by the connector's reconnect loop;
    /// only escapes once reconnect attempts are exhausted.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// REST call failed. The gateway rolls back any optimistic mutation and
    /// surfaces this to the user.
    #[error("request failed: {0}")]
    RequestFailure(String),

    /// Referenced chat or message does not exist. Surfaced, never retried.
    #[error("{0} not found")]
    NotFound(String),
}
