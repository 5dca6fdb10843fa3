//! Error types for the dispatcher.

use crate::types::ActionType;

/// Errors reported by external collaborators (capability, message, presence,
/// interaction and configuration surfaces).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("interaction already acknowledged")]
    AlreadyAcknowledged,
    #[error("{0}")]
    Other(String),
}

/// Errors from action handler execution.
///
/// These never leave the executor; they are turned into failure outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error("Action type not registered: {0}")]
    UnregisteredHandler(ActionType),
    #[error("Payload validation failed: {0}")]
    InvalidPayload(String),
    #[error("Action execution timed out after {0} ms")]
    Timeout(u64),
    #[error("Action handler panicked: {0}")]
    Panicked(String),
}

/// Faults inside the dispatch coordinator itself.
///
/// Caught at the dispatch boundary and answered with the system error response.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Configuration store failed: {0}")]
    Store(SurfaceError),
    #[error("Dispatch panicked: {0}")]
    Panicked(String),
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
