//! Named lifecycle hooks
//!
//! A [`HookRegistry`] holds callbacks for a fixed set of hook names (for
//! example `on_guild_join`) and runs them in registration order. It is an
//! ordinary value: create it once at start-up and pass it to whatever
//! needs to register or run hooks.
//!
//! ```
//! use journal_hooks::{HookRegistry, ON_GUILD_JOIN};
//!
//! let hooks = HookRegistry::<u64>::guild_hooks();
//! hooks
//!     .register(ON_GUILD_JOIN, "create-settings-row", |guild_id| {
//!         println!("joined {}", guild_id);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let report = hooks.run(ON_GUILD_JOIN, &42).unwrap();
//! assert_eq!(report.ran, 1);
//! assert!(report.failures.is_empty());
//! ```

use dashmap::DashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Runs when the application joins a guild
pub const ON_GUILD_JOIN: &str = "on_guild_join";

/// Runs when the application leaves a guild
pub const ON_GUILD_LEAVE: &str = "on_guild_leave";

/// Hook callback
pub type Hook<A> = Arc<dyn Fn(&A) -> Result<(), HookError> + Send + Sync>;

/// Hook errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HookError {
    #[error("No such hook type: {0}")]
    UnknownHook(String),

    #[error("Hook failed: {0}")]
    Failed(String),
}

/// Result of running one hook name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookReport {
    /// Hooks invoked
    pub ran: usize,

    /// Labels of hooks that returned an error or panicked
    pub failures: Vec<String>,
}

struct Registered<A> {
    label: String,
    hook: Hook<A>,
}

impl<A> Clone for Registered<A> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            hook: Arc::clone(&self.hook),
        }
    }
}

/// Registry of named hooks taking `&A`
pub struct HookRegistry<A> {
    hooks: DashMap<String, Vec<Registered<A>>>,
}

impl<A> HookRegistry<A> {
    /// Create a registry accepting exactly `names`
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hooks = DashMap::new();
        for name in names {
            hooks.insert(name.into(), Vec::new());
        }
        Self { hooks }
    }

    /// Registry with [`ON_GUILD_JOIN`] and [`ON_GUILD_LEAVE`]
    pub fn guild_hooks() -> Self {
        Self::new([ON_GUILD_JOIN, ON_GUILD_LEAVE])
    }

    /// Hook names this registry accepts, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Add a hook under `name`. Fails for names the registry does not know.
    pub fn register<F>(&self, name: &str, label: impl Into<String>, hook: F) -> Result<(), HookError>
    where
        F: Fn(&A) -> Result<(), HookError> + Send + Sync + 'static,
    {
        let label = label.into();
        let mut bucket = self
            .hooks
            .get_mut(name)
            .ok_or_else(|| HookError::UnknownHook(name.to_string()))?;

        info!("Register hook {} for '{}'", label, name);
        bucket.push(Registered {
            label,
            hook: Arc::new(hook),
        });
        Ok(())
    }

    /// Number of hooks registered under `name`
    pub fn hook_count(&self, name: &str) -> usize {
        self.hooks.get(name).map(|b| b.len()).unwrap_or(0)
    }

    /// Run every hook registered under `name`, in registration order.
    ///
    /// A failing or panicking hook is logged and the remaining hooks still
    /// run; failures are listed in the report.
    pub fn run(&self, name: &str, args: &A) -> Result<HookReport, HookError> {
        let hooks = self
            .hooks
            .get(name)
            .map(|bucket| bucket.value().clone())
            .ok_or_else(|| HookError::UnknownHook(name.to_string()))?;

        info!("Running hooks for '{}'...", name);
        let mut report = HookReport::default();

        for registered in hooks {
            report.ran += 1;
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| (registered.hook)(args)))
                .unwrap_or_else(|_| Err(HookError::Failed("hook panicked".to_string())));

            if let Err(e) = outcome {
                error!("Error running hook {} for '{}': {}", registered.label, name, e);
                report.failures.push(registered.label);
            }
        }

        debug!("Finished '{}' hooks.", name);
        Ok(report)
    }
}

impl<A> Default for HookRegistry<A> {
    fn default() -> Self {
        Self::guild_hooks()
    }
}

impl<A> std::fmt::Debug for HookRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("names", &self.names())
            .finish()
    }
}
