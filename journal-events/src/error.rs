//! Error types for the journal router

use crate::path::Path;
use std::fmt;

/// Listener handler error
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Handler failed: {0}")]
    HandlerFailed(String),
}

/// Content processor error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProcessorError {
    #[error("No attribute named '{0}' for placeholder")]
    MissingAttribute(String),

    #[error("Unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),

    #[error("Content processing failed: {0}")]
    Failed(String),
}

/// Registry and lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Listener {listener} is not registered on '{path}'")]
    NotFound { listener: String, path: Path },

    #[error("Router dispatch loop already started")]
    AlreadyStarted,

    #[error("No async runtime to start the dispatch loop on: {0}")]
    NoRuntime(String),
}

/// How a single handler invocation failed
#[derive(Debug, thiserror::Error)]
pub enum FailureKind {
    #[error(transparent)]
    Failed(#[from] ListenerError),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// One failed handler within an event's fan-out
#[derive(Debug)]
pub struct HandlerFailure {
    /// Name of the failing listener
    pub listener: String,

    /// Path the listener was registered on
    pub path: Path,

    pub error: FailureKind,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on '{}': {}", self.listener, self.path, self.error)
    }
}

/// Outcome of dispatching one event
///
/// Every handler failure in a fan-out is collected; none are masked by an
/// earlier failure.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Content processing failed: {0}")]
    Processing(#[from] ProcessorError),

    #[error("{} handler(s) failed", .0.len())]
    HandlersFailed(Vec<HandlerFailure>),
}

impl DispatchError {
    /// Handler failures carried by this error, if any
    pub fn failures(&self) -> &[HandlerFailure] {
        match self {
            DispatchError::HandlersFailed(failures) => failures,
            DispatchError::Processing(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = RouterError::NotFound {
            listener: "AuditSink".to_string(),
            path: Path::parse("/settings"),
        };
        assert_eq!(
            err.to_string(),
            "Listener AuditSink is not registered on '/settings'"
        );
    }

    #[test]
    fn test_dispatch_error_counts_failures() {
        let err = DispatchError::HandlersFailed(vec![
            HandlerFailure {
                listener: "a".to_string(),
                path: Path::root(),
                error: FailureKind::Panicked("boom".to_string()),
            },
            HandlerFailure {
                listener: "b".to_string(),
                path: Path::parse("/x"),
                error: ListenerError::HandlerFailed("nope".to_string()).into(),
            },
        ]);

        assert_eq!(err.to_string(), "2 handler(s) failed");
        assert_eq!(err.failures().len(), 2);
        assert_eq!(
            err.failures()[1].to_string(),
            "b on '/x': Handler failed: nope"
        );
    }
}
