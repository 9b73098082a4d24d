//! Composition root tying a router to its hooks and settings

use crate::error::JournalError;
use journal_config::{JournalSettings, RouterSettings, Validate};
use journal_events::{
    Broadcaster, Passthrough, PlaceholderProcessor, Router, RouterConfig, Subject, TracingListener,
};
use journal_hooks::{HookRegistry, HookReport};
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A configured router plus the lifecycle hooks of the application.
///
/// Create one at start-up and hand out [`router`](Journal::router),
/// [`broadcaster`](Journal::broadcaster) and [`hooks`](Journal::hooks) to
/// the subsystems that need them.
///
/// # Examples
///
/// ```
/// use journal::{Attributes, Journal, JournalSettings, ON_GUILD_JOIN};
///
/// # tokio_test::block_on(async {
/// let journal = Journal::new(JournalSettings::default()).unwrap();
/// journal
///     .hooks()
///     .register(ON_GUILD_JOIN, "welcome", |guild| {
///         println!("joined {}", guild);
///         Ok(())
///     })
///     .unwrap();
///
/// journal.start().unwrap();
/// journal
///     .broadcaster("/settings")
///     .send("prefix", "guild-1", "Set prefix to !", Attributes::new());
///
/// journal.run_hook(ON_GUILD_JOIN, &"guild-1".into()).unwrap();
/// journal.shutdown().await.unwrap();
/// # });
/// ```
pub struct Journal {
    router: Router,
    hooks: Arc<HookRegistry<Subject>>,
    settings: JournalSettings,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Journal {
    /// Build a journal from validated settings
    pub fn new(settings: JournalSettings) -> Result<Self, JournalError> {
        settings.validate()?;

        let router = build_router(&settings.router);
        if settings.router.root_tracing {
            router.register(Arc::new(TracingListener::new("/")));
        }

        let hooks = Arc::new(HookRegistry::new(settings.hooks.names.iter().cloned()));
        debug!(hooks = ?hooks.names(), "Journal assembled");

        Ok(Self {
            router,
            hooks,
            settings,
            task: Mutex::new(None),
        })
    }

    /// Build a journal from an optional settings file, `.env` and
    /// `JOURNAL_*` environment variables
    pub fn from_env(file: Option<&FsPath>) -> Result<Self, JournalError> {
        Self::new(JournalSettings::load(file)?)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Shared hook registry
    pub fn hooks(&self) -> &Arc<HookRegistry<Subject>> {
        &self.hooks
    }

    pub fn settings(&self) -> &JournalSettings {
        &self.settings
    }

    /// Producer handle sending under `base`
    pub fn broadcaster(&self, base: &str) -> Broadcaster {
        self.router.broadcaster(base)
    }

    /// Install the global log subscriber described by the `log` settings
    #[cfg(feature = "log")]
    pub fn init_logging(&self) -> Result<(), JournalError> {
        let log = &self.settings.log;
        let config = journal_log::LogConfig::default()
            .with_level(log.level.parse()?)
            .with_format(log.format.parse()?)
            .with_color(log.color);

        journal_log::init(&config)?;
        Ok(())
    }

    /// Start the dispatch loop on the current runtime
    pub fn start(&self) -> Result<(), JournalError> {
        let handle = self.router.start_current()?;
        *self.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    /// Run the hooks registered under `name` for `subject`
    pub fn run_hook(&self, name: &str, subject: &Subject) -> Result<HookReport, JournalError> {
        Ok(self.hooks.run(name, subject)?)
    }

    /// Stop the dispatch loop and wait for it to exit.
    ///
    /// The in-flight event completes; queued events are dropped.
    pub async fn shutdown(&self) -> Result<(), JournalError> {
        self.router.shutdown();

        let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = task {
            task.await.map_err(|e| JournalError::Task(e.to_string()))?;
            info!("Journal stopped");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("settings", &self.settings)
            .field("listeners", &self.router.total_listeners())
            .field("running", &self.router.is_running())
            .finish()
    }
}

fn build_router(settings: &RouterSettings) -> Router {
    let config = RouterConfig {
        async_handling: settings.async_handling,
        strict_unregister: settings.strict_unregister,
        enable_logging: settings.enable_logging,
    };

    let builder = Router::builder().config(config);
    if settings.placeholders {
        builder.processor(PlaceholderProcessor::new()).build()
    } else {
        builder.processor(Passthrough).build()
    }
}
