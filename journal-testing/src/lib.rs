//! Testing utilities for journal routers.
//!
//! ## Features
//!
//! - **RecordingListener** - Captures every event it handles
//! - **FailingListener** / **PanickingListener** - Exercise failure isolation
//! - **DelayedListener** - Holds the fan-out open to observe ordering
//! - **Timeline** - Shared start/finish log across listeners
//! - **wait_for** - Poll async conditions with a timeout
//!
//! ## Quick Start
//!
//! ```
//! use journal_events::Router;
//! use journal_testing::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new();
//! let recorder = RecordingListener::new("/settings");
//! router.register(Arc::new(recorder.clone()));
//!
//! router.start_current().unwrap();
//! router.send("/settings/prefix", "guild", "Set prefix", Default::default());
//!
//! assert!(wait_for_count(&recorder, 1, Duration::from_secs(1)).await);
//! assert_received(&recorder, &["Set prefix"]);
//! # });
//! ```

mod assertions;
mod listeners;
mod wait;

pub use assertions::{assert_not_received, assert_received};
pub use listeners::{
    DelayedListener, FailingListener, Mark, PanickingListener, RecordingListener, Timeline,
};
pub use wait::{DEFAULT_TIMEOUT, wait_for, wait_for_count};
