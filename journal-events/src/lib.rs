//! Hierarchical event journal for in-process notifications
//!
//! This crate routes domain events (settings changes, moderation actions,
//! ...) from the code that produces them to the listeners that log, audit,
//! or react to them.
//!
//! ## Features
//!
//! - **Path topics** - Listeners on `/settings` see `/settings/roles/mute`
//! - **Attribute filters** - Typed key/value predicates per listener
//! - **Ordered delivery** - One event's fan-out completes before the next starts
//! - **Concurrent fan-out** - Listeners of the same event run together
//! - **Failure isolation** - Handler errors and panics are logged, never fatal
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use journal_events::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new();
//!
//!     // Trace everything
//!     router.register(Arc::new(TracingListener::new("/")));
//!
//!     // React to high-severity moderation events only
//!     router.register(Arc::new(
//!         FnListener::new("/moderation", |event| async move {
//!             println!("ALERT: {}", event.content);
//!             Ok(())
//!         })
//!         .with_predicate(Attributes::new().with("severity", "high")),
//!     ));
//!
//!     router.start_current()?;
//!
//!     router.send(
//!         "/moderation/ban",
//!         "guild-1",
//!         "User banned",
//!         Attributes::new().with("severity", "high"),
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Content Processing
//!
//! ```rust,ignore
//! let router = Router::builder()
//!     .processor(PlaceholderProcessor::new())  // "{role}" -> attribute value
//!     .async_handling(true)                    // Run listeners concurrently
//!     .strict_unregister(true)                 // Unknown listener is an error
//!     .build();
//! ```

pub mod broadcaster;
pub mod error;
pub mod event;
pub mod listener;
pub mod path;
pub mod processor;
pub mod router;

pub use broadcaster::Broadcaster;
pub use error::{
    DispatchError, FailureKind, HandlerFailure, ListenerError, ProcessorError, RouterError,
};
pub use event::{Attributes, Event, Subject};
pub use listener::{FnListener, HandlerFuture, Listener, ListenerHandler, TracingListener};
pub use path::{Parents, Path};
pub use processor::{ContentProcessor, Passthrough, PlaceholderProcessor};
pub use router::{Router, RouterBuilder, RouterConfig};

// Re-exported for implementing `Listener`
pub use async_trait::async_trait;
