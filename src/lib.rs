// Journal - hierarchical in-process event routing
//
// Domain code sends events to slash-separated paths; listeners registered
// on a path or any of its ancestors receive them in order, with their
// handlers run concurrently and their failures isolated.

// Re-export core functionality
pub use journal_events::*;

// Re-export supporting crates
pub use journal_config;
pub use journal_hooks;

#[cfg(feature = "log")]
pub use journal_log;

#[cfg(feature = "testing")]
pub use journal_testing;

mod error;
mod journal;

pub use error::JournalError;
pub use journal::Journal;
pub use journal_config::{JournalSettings, LogSettings};
pub use journal_hooks::{HookError, HookRegistry, HookReport, ON_GUILD_JOIN, ON_GUILD_LEAVE};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Attributes,
        Broadcaster,
        ContentProcessor,
        Event,
        FnListener,
        HookRegistry,
        Journal,
        JournalError,
        JournalSettings,
        Listener,
        ListenerError,
        Path,
        Router,
        Subject,
        TracingListener,
        async_trait,
    };
}
