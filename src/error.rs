use journal_config::ConfigError;
use journal_events::RouterError;
use journal_hooks::HookError;

/// Errors raised while assembling or running a [`Journal`](crate::Journal)
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Router error: {0}")]
    Router(#[from] RouterError),

    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    #[cfg(feature = "log")]
    #[error("Logging error: {0}")]
    Log(#[from] journal_log::LogError),

    #[error("Dispatch task failed: {0}")]
    Task(String),
}
