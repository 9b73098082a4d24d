//! Journal router: listener registry, event queue, and dispatch loop

use crate::broadcaster::Broadcaster;
use crate::error::{DispatchError, FailureKind, HandlerFailure, ProcessorError, RouterError};
use crate::event::{Attributes, Event, Subject};
use crate::listener::Listener;
use crate::path::Path;
use crate::processor::{ContentProcessor, Passthrough};
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Hierarchical publish/subscribe router.
///
/// Producers call [`send`](Router::send), which never blocks. A single
/// dispatch loop, started with [`start`](Router::start), takes events off
/// the queue in FIFO order. For each event it processes the content once,
/// collects every listener registered on the event path or one of its
/// ancestors whose [`check`](Listener::check) passes, runs all of their
/// handlers concurrently, and waits for the whole fan-out before taking
/// the next event.
///
/// Handler failures (errors or panics) are logged and never stop the loop.
/// There is no per-handler timeout: a handler that never completes stalls
/// every later event.
#[derive(Clone)]
pub struct Router {
    /// Listeners registered on each path, in registration order
    listeners: Arc<DashMap<Path, Vec<Arc<dyn Listener>>>>,

    /// Producer side of the event queue
    sender: mpsc::UnboundedSender<Event>,

    /// Consumer side, taken by the dispatch loop on start
    receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<Event>>>>,

    processor: Arc<dyn ContentProcessor>,

    shutdown: Arc<watch::Sender<bool>>,

    running: Arc<AtomicBool>,

    /// Events enqueued but not yet taken by the loop
    pending: Arc<AtomicUsize>,

    /// Configuration
    config: Arc<RouterConfig>,
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Run an event's matched handlers concurrently rather than one by one
    pub async_handling: bool,

    /// Fail `unregister` for listeners that are not registered
    pub strict_unregister: bool,

    /// Enable event logging
    pub enable_logging: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            async_handling: true,
            strict_unregister: true,
            enable_logging: true,
        }
    }
}

impl Router {
    /// Create new router
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create router with custom config
    pub fn with_config(config: RouterConfig) -> Self {
        Self::build(config, Arc::new(Passthrough))
    }

    /// Create router that transforms content with `processor`
    pub fn with_processor(processor: Arc<dyn ContentProcessor>) -> Self {
        Self::build(RouterConfig::default(), processor)
    }

    /// Create a router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    fn build(config: RouterConfig, processor: Arc<dyn ContentProcessor>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        Self {
            listeners: Arc::new(DashMap::new()),
            sender,
            receiver: Arc::new(Mutex::new(Some(receiver))),
            processor,
            shutdown: Arc::new(shutdown),
            running: Arc::new(AtomicBool::new(false)),
            pending: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }

    /// Configuration this router was built with
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Spawn the dispatch loop on `handle`.
    ///
    /// May be called once per router; events sent before the call are
    /// queued and processed once the loop starts.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let router = Router::new();
    /// router.register(Arc::new(TracingListener::new("/")));
    /// router.start(&tokio::runtime::Handle::current())?;
    ///
    /// router.send("/settings/prefix", guild_id, "Set prefix", Attributes::new());
    /// ```
    pub fn start(&self, handle: &Handle) -> Result<JoinHandle<()>, RouterError> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(RouterError::AlreadyStarted)?;

        if self.config.enable_logging {
            info!("Start journal event processing task");
        }

        self.running.store(true, Ordering::SeqCst);
        let shutdown = self.shutdown.subscribe();
        let router = self.clone();

        let running = RunningGuard(self.running.clone());

        Ok(handle.spawn(async move {
            let _running = running;
            router.run(receiver, shutdown).await
        }))
    }

    /// Spawn the dispatch loop on the runtime of the calling task
    pub fn start_current(&self) -> Result<JoinHandle<()>, RouterError> {
        let handle =
            Handle::try_current().map_err(|e| RouterError::NoRuntime(e.to_string()))?;
        self.start(&handle)
    }

    /// Ask the dispatch loop to stop.
    ///
    /// The event being dispatched finishes its fan-out; events still queued
    /// are discarded.
    pub fn shutdown(&self) {
        if self.config.enable_logging {
            info!("Stopping journal event processing task");
        }
        self.shutdown.send_replace(true);
    }

    /// Whether the dispatch loop is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of queued events the loop has not taken yet
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Enqueue an event. Never blocks; delivery is best-effort.
    pub fn send(
        &self,
        path: impl Into<Path>,
        subject: impl Into<Subject>,
        content: impl Into<String>,
        attributes: Attributes,
    ) {
        self.enqueue(Event::new(path, subject, content, attributes));
    }

    /// Enqueue an already-built event
    pub fn enqueue(&self, event: Event) {
        self.pending.fetch_add(1, Ordering::SeqCst);

        if let Err(mpsc::error::SendError(event)) = self.sender.send(event) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            warn!(
                path = %event.path,
                "Journal dispatch loop has stopped, dropping event"
            );
        }
    }

    /// Producer handle that sends below `base`
    pub fn broadcaster(&self, base: impl Into<Path>) -> Broadcaster {
        Broadcaster::new(self.clone(), base.into())
    }

    /// Register a listener on its path
    ///
    /// # Examples
    ///
    /// ```
    /// use journal_events::{Router, TracingListener};
    /// use std::sync::Arc;
    ///
    /// let router = Router::new();
    /// router.register(Arc::new(TracingListener::new("/settings")));
    /// assert_eq!(router.listener_count("/settings"), 1);
    /// ```
    pub fn register(&self, listener: Arc<dyn Listener>) {
        if self.config.enable_logging {
            info!("Registering {} on '{}'", listener.name(), listener.path());
        }

        self.listeners
            .entry(listener.path().clone())
            .or_default()
            .push(listener);
    }

    /// Remove the first registration of `listener` from its path.
    ///
    /// Listeners are compared by identity. With `strict_unregister` an
    /// absent listener is an error, otherwise it is ignored.
    pub fn unregister(&self, listener: &dyn Listener) -> Result<(), RouterError> {
        let path = listener.path();

        if self.config.enable_logging {
            info!("Unregistering {} from '{}'", listener.name(), path);
        }

        let removed = match self.listeners.get_mut(path) {
            Some(mut bucket) => {
                let position = bucket
                    .iter()
                    .position(|l| same_listener(l.as_ref(), listener));
                match position {
                    Some(index) => {
                        bucket.remove(index);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };

        if removed {
            self.listeners.remove_if(path, |_, bucket| bucket.is_empty());
            return Ok(());
        }

        if self.config.strict_unregister {
            Err(RouterError::NotFound {
                listener: listener.name().to_string(),
                path: path.clone(),
            })
        } else {
            warn!(
                "Listener {} was not registered on '{}'",
                listener.name(),
                path
            );
            Ok(())
        }
    }

    /// First listener registered at exactly `path` whose metadata contains `attrs`
    pub fn get(&self, path: impl Into<Path>, attrs: &Attributes) -> Option<Arc<dyn Listener>> {
        let path = path.into();

        if self.config.enable_logging {
            debug!(
                "Getting first listener on path '{}' that matches attributes: {:?}",
                path, attrs
            );
        }

        self.listeners
            .get(&path)?
            .iter()
            .find(|listener| listener.metadata().matches(attrs))
            .cloned()
    }

    /// Alias for [`get`](Router::get)
    pub fn find(&self, path: impl Into<Path>, attrs: &Attributes) -> Option<Arc<dyn Listener>> {
        self.get(path, attrs)
    }

    /// Number of listeners registered at exactly `path`
    pub fn listener_count(&self, path: impl Into<Path>) -> usize {
        let path = path.into();
        self.listeners.get(&path).map(|l| l.len()).unwrap_or(0)
    }

    /// Number of listeners across all paths
    pub fn total_listeners(&self) -> usize {
        self.listeners.iter().map(|entry| entry.value().len()).sum()
    }

    /// Paths that currently have listeners
    pub fn paths(&self) -> Vec<Path> {
        let mut paths: Vec<Path> = self.listeners.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.listeners.clear();
        if self.config.enable_logging {
            info!("Cleared all journal listeners");
        }
    }

    /// Process one event: transform its content, then run every matching
    /// handler and wait for all of them.
    ///
    /// The dispatch loop calls this for each dequeued event and logs the
    /// error; it is public so an event can be driven through synchronously.
    pub async fn dispatch(&self, mut event: Event) -> Result<(), DispatchError> {
        if self.config.enable_logging {
            debug!("Got journal event on {}: '{}'", event.path, event.content);
        }

        event.content = self.process_content(&event)?;

        if self.config.enable_logging {
            debug!("Journal content after processing: '{}'", event.content);
        }

        let matched = self.matching(&event);
        if matched.is_empty() {
            if self.config.enable_logging {
                debug!("No listeners matched journal event on {}", event.path);
            }
            return Ok(());
        }

        let outcomes = if self.config.async_handling {
            join_all(matched.iter().map(|listener| invoke(listener.as_ref(), &event))).await
        } else {
            let mut outcomes = Vec::with_capacity(matched.len());
            for listener in &matched {
                outcomes.push(invoke(listener.as_ref(), &event).await);
            }
            outcomes
        };

        let failures: Vec<HandlerFailure> = matched
            .iter()
            .zip(outcomes)
            .filter_map(|(listener, outcome)| {
                outcome.err().map(|error| HandlerFailure {
                    listener: listener.name().to_string(),
                    path: listener.path().clone(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            return Ok(());
        }

        for failure in &failures {
            error!(
                event_id = %event.id,
                event_path = %event.path,
                listener = %failure.listener,
                listener_path = %failure.path,
                "Journal handler failed: {}",
                failure.error
            );
        }

        Err(DispatchError::HandlersFailed(failures))
    }

    fn process_content(&self, event: &Event) -> Result<String, ProcessorError> {
        let processor = &self.processor;
        std::panic::catch_unwind(AssertUnwindSafe(|| {
            processor.process(&event.content, &event.attributes)
        }))
        .unwrap_or_else(|panic| Err(ProcessorError::Failed(panic_message(panic))))
    }

    /// Listeners on the event path and its ancestors, most specific first,
    /// whose check passes. Each bucket is snapshotted before checking.
    fn matching(&self, event: &Event) -> Vec<Arc<dyn Listener>> {
        let mut matched = Vec::new();

        for path in std::iter::once(event.path.clone()).chain(event.path.parents()) {
            let bucket = match self.listeners.get(&path) {
                Some(entry) => entry.value().clone(),
                None => continue,
            };

            matched.extend(
                bucket
                    .into_iter()
                    .filter(|listener| passes_check(listener.as_ref(), event)),
            );
        }

        matched
    }

    async fn run(
        self,
        mut receiver: mpsc::UnboundedReceiver<Event>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            if self.config.enable_logging {
                debug!("Waiting for new journal event");
            }

            let event = tokio::select! {
                biased;
                changed = shutdown.changed() => match changed {
                    Ok(()) => continue,
                    Err(_) => break,
                },
                event = receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            self.pending.fetch_sub(1, Ordering::SeqCst);

            if let Err(e) = self.dispatch(event).await {
                error!("Error while running journal handlers: {}", e);
            }
        }

        receiver.close();
        let mut discarded = 0usize;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        self.pending.fetch_sub(discarded, Ordering::SeqCst);

        if discarded > 0 {
            warn!("Journal dispatch loop stopped with {} undelivered event(s)", discarded);
        } else if self.config.enable_logging {
            info!("Journal dispatch loop stopped");
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the running flag when the dispatch loop exits, by return or unwind
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run a listener's check; a panicking check counts as a non-match
fn passes_check(listener: &dyn Listener, event: &Event) -> bool {
    match std::panic::catch_unwind(AssertUnwindSafe(|| listener.check(event))) {
        Ok(passed) => passed,
        Err(panic) => {
            error!(
                event_id = %event.id,
                event_path = %event.path,
                listener = %listener.name(),
                "Journal listener check panicked: {}",
                panic_message(panic)
            );
            false
        }
    }
}

/// Run one handler, turning errors and panics into a [`FailureKind`]
async fn invoke(listener: &dyn Listener, event: &Event) -> Result<(), FailureKind> {
    match AssertUnwindSafe(listener.handle(event)).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(FailureKind::Failed(e)),
        Err(panic) => Err(FailureKind::Panicked(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Identity comparison on the data pointer, ignoring vtables
fn same_listener(a: &dyn Listener, b: &dyn Listener) -> bool {
    std::ptr::eq(
        a as *const dyn Listener as *const (),
        b as *const dyn Listener as *const (),
    )
}

/// Router builder
pub struct RouterBuilder {
    config: RouterConfig,
    processor: Arc<dyn ContentProcessor>,
}

impl RouterBuilder {
    /// Create new router builder
    pub fn new() -> Self {
        Self {
            config: RouterConfig::default(),
            processor: Arc::new(Passthrough),
        }
    }

    /// Enable/disable concurrent handler fan-out
    pub fn async_handling(mut self, enabled: bool) -> Self {
        self.config.async_handling = enabled;
        self
    }

    /// Enable/disable errors for unregistering absent listeners
    pub fn strict_unregister(mut self, enabled: bool) -> Self {
        self.config.strict_unregister = enabled;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Set the content processor
    pub fn processor(mut self, processor: impl ContentProcessor + 'static) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the router
    pub fn build(self) -> Router {
        Router::build(self.config, self.processor)
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use crate::listener::FnListener;
    use crate::processor::PlaceholderProcessor;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    type Log = Arc<StdMutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(StdMutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Listener that appends `label:content` to the log
    fn recorder(path: &str, label: &'static str, log: &Log) -> Arc<FnListener> {
        let log = log.clone();
        Arc::new(
            FnListener::new(path, move |event: Event| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{}:{}", label, event.content));
                    Ok(())
                }
            })
            .named(label),
        )
    }

    fn failing(path: &str) -> Arc<FnListener> {
        Arc::new(
            FnListener::new(path, |_event: Event| async {
                Err(ListenerError::HandlerFailed("audit channel missing".to_string()))
            })
            .named("failing"),
        )
    }

    #[derive(Debug)]
    struct Exploding {
        path: Path,
    }

    #[async_trait::async_trait]
    impl Listener for Exploding {
        fn path(&self) -> &Path {
            &self.path
        }

        async fn handle(&self, _event: &Event) -> Result<(), ListenerError> {
            panic!("handler exploded")
        }
    }

    async fn wait_for_len(log: &Log, len: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while log.lock().unwrap().len() < len {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for handlers");
    }

    fn event(path: &str, content: &str) -> Event {
        Event::new(path, "guild", content, Attributes::new())
    }

    #[tokio::test]
    async fn test_ancestor_matching() {
        let router = Router::new();
        let log = new_log();
        router.register(recorder("/a", "ancestor", &log));
        router.register(recorder("/a/b/c/d", "deeper", &log));

        router.dispatch(event("/a/b/c", "x")).await.unwrap();

        assert_eq!(entries(&log), vec!["ancestor:x"]);
    }

    #[tokio::test]
    async fn test_exact_path_matching() {
        let router = Router::new();
        let log = new_log();
        router.register(recorder("/a/b/c", "exact", &log));

        router.dispatch(event("/a/b/c", "1")).await.unwrap();
        router.dispatch(event("/a/b/c/x", "2")).await.unwrap();
        router.dispatch(event("/a/b", "3")).await.unwrap();

        assert_eq!(entries(&log), vec!["exact:1", "exact:2"]);
    }

    #[tokio::test]
    async fn test_root_listener_sees_everything() {
        let router = Router::new();
        let log = new_log();
        router.register(recorder("/", "root", &log));

        router.dispatch(event("/settings/roles/mute", "m")).await.unwrap();
        router.dispatch(event("/", "r")).await.unwrap();

        assert_eq!(entries(&log), vec!["root:m", "root:r"]);
    }

    #[tokio::test]
    async fn test_attribute_filter() {
        let router = Router::new();
        let log = new_log();
        let listener = FnListener::new("/mod", {
            let log = log.clone();
            move |event: Event| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(event.content);
                    Ok(())
                }
            }
        })
        .with_predicate(Attributes::new().with("severity", "high"));
        router.register(Arc::new(listener));

        let send = |content: &str, attrs: Attributes| {
            Event::new("/mod/ban", "guild", content, attrs)
        };
        router
            .dispatch(send("high", Attributes::new().with("severity", "high").with("by", "alice")))
            .await
            .unwrap();
        router
            .dispatch(send("low", Attributes::new().with("severity", "low")))
            .await
            .unwrap();
        router.dispatch(send("none", Attributes::new())).await.unwrap();

        assert_eq!(entries(&log), vec!["high"]);
    }

    #[tokio::test]
    async fn test_matching_order_most_specific_first() {
        let router = Router::builder().async_handling(false).build();
        let log = new_log();
        router.register(recorder("/", "root", &log));
        router.register(recorder("/a", "a", &log));
        router.register(recorder("/a/b", "ab-1", &log));
        router.register(recorder("/a/b", "ab-2", &log));

        router.dispatch(event("/a/b", "e")).await.unwrap();

        assert_eq!(entries(&log), vec!["ab-1:e", "ab-2:e", "a:e", "root:e"]);
    }

    #[tokio::test]
    async fn test_failure_isolation_within_event() {
        let router = Router::new();
        let log = new_log();
        router.register(failing("/a"));
        router.register(recorder("/a", "ok", &log));

        let err = router.dispatch(event("/a/b", "x")).await.unwrap_err();

        assert_eq!(entries(&log), vec!["ok:x"]);
        assert_eq!(err.failures().len(), 1);
        assert_eq!(err.failures()[0].listener, "failing");
        assert_eq!(err.failures()[0].path, Path::parse("/a"));
    }

    #[tokio::test]
    async fn test_all_failures_collected() {
        let router = Router::new();
        router.register(failing("/a"));
        router.register(failing("/"));
        router.register(Arc::new(Exploding {
            path: Path::parse("/a"),
        }));

        let err = router.dispatch(event("/a", "x")).await.unwrap_err();
        let failures = err.failures();

        assert_eq!(failures.len(), 3);
        assert!(failures.iter().any(|f| matches!(
            &f.error,
            FailureKind::Panicked(msg) if msg == "handler exploded"
        )));
    }

    #[tokio::test]
    async fn test_content_transformed_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let router = Router::builder()
            .processor(move |content: &str, attrs: &Attributes| {
                counted.fetch_add(1, Ordering::SeqCst);
                PlaceholderProcessor::new().process(content, attrs)
            })
            .build();
        let log = new_log();
        router.register(recorder("/settings", "one", &log));
        router.register(recorder("/settings/roles", "two", &log));

        router
            .dispatch(Event::new(
                "/settings/roles/mute",
                "guild",
                "Set mute role to {role}",
                Attributes::new().with("role", "Muted"),
            ))
            .await
            .unwrap();

        let mut seen = entries(&log);
        seen.sort();
        assert_eq!(
            seen,
            vec!["one:Set mute role to Muted", "two:Set mute role to Muted"]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_processor_failure_skips_fan_out() {
        let router = Router::with_processor(Arc::new(PlaceholderProcessor::new()));
        let log = new_log();
        router.register(recorder("/", "root", &log));

        let err = router.dispatch(event("/a", "{missing}")).await.unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Processing(ProcessorError::MissingAttribute(_))
        ));
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn test_unregister_empties_bucket() {
        let router = Router::new();
        let log = new_log();
        let listener = recorder("/a", "gone", &log);
        router.register(listener.clone());
        assert_eq!(router.listener_count("/a"), 1);

        router.unregister(listener.as_ref()).unwrap();

        assert_eq!(router.listener_count("/a"), 0);
        assert!(router.paths().is_empty());
        router.dispatch(event("/a", "x")).await.unwrap();
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_unregister_absent_listener() {
        let log = new_log();
        let listener = recorder("/a", "never", &log);

        let strict = Router::new();
        assert!(matches!(
            strict.unregister(listener.as_ref()),
            Err(RouterError::NotFound { .. })
        ));

        let lenient = Router::builder().strict_unregister(false).build();
        assert!(lenient.unregister(listener.as_ref()).is_ok());
    }

    #[test]
    fn test_unregister_removes_first_registration_only() {
        let router = Router::new();
        let log = new_log();
        let listener = recorder("/a", "twice", &log);
        router.register(listener.clone());
        router.register(listener.clone());

        router.unregister(listener.as_ref()).unwrap();
        assert_eq!(router.listener_count("/a"), 1);
        router.unregister(listener.as_ref()).unwrap();
        assert_eq!(router.listener_count("/a"), 0);
    }

    #[test]
    fn test_get_by_metadata() {
        let router = Router::new();
        let noop = |_event: Event| async { Ok::<(), ListenerError>(()) };
        router.register(Arc::new(
            FnListener::new("/settings", noop)
                .named("first")
                .with_metadata(Attributes::new().with("channel", 1)),
        ));
        router.register(Arc::new(
            FnListener::new("/settings", noop)
                .named("second")
                .with_metadata(Attributes::new().with("channel", 2)),
        ));

        let found = router
            .get("/settings", &Attributes::new().with("channel", 2))
            .unwrap();
        assert_eq!(found.name(), "second");

        let first = router.find("/settings", &Attributes::new()).unwrap();
        assert_eq!(first.name(), "first");

        assert!(router.get("/settings", &Attributes::new().with("channel", 3)).is_none());
        assert!(router.get("/settings/roles", &Attributes::new()).is_none());
    }

    #[test]
    fn test_registry_introspection() {
        let router = Router::new();
        let log = new_log();
        router.register(recorder("/b", "b", &log));
        router.register(recorder("/a", "a", &log));
        router.register(recorder("/a", "a2", &log));

        assert_eq!(router.total_listeners(), 3);
        assert_eq!(router.paths(), vec![Path::parse("/a"), Path::parse("/b")]);

        router.clear();
        assert_eq!(router.total_listeners(), 0);
    }

    #[tokio::test]
    async fn test_loop_fifo_and_sequential_fan_out() {
        let router = Router::new();
        let log = new_log();

        for (label, delay) in [("slow", 60u64), ("fast", 10u64)] {
            let log = log.clone();
            router.register(Arc::new(FnListener::new("/e1", move |_event: Event| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("{}:start", label));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    log.lock().unwrap().push(format!("{}:end", label));
                    Ok(())
                }
            })));
        }
        router.register(recorder("/e2", "e2", &log));

        router.send("/e1", "guild", "first", Attributes::new());
        router.send("/e2", "guild", "second", Attributes::new());
        router.start_current().unwrap();

        wait_for_len(&log, 5).await;
        let seen = entries(&log);

        let e2 = seen.iter().position(|e| e == "e2:second").unwrap();
        let slow_end = seen.iter().position(|e| e == "slow:end").unwrap();
        let fast_end = seen.iter().position(|e| e == "fast:end").unwrap();
        assert!(e2 > slow_end && e2 > fast_end, "order: {:?}", seen);

        // both e1 handlers were running at the same time
        let fast_start = seen.iter().position(|e| e == "fast:start").unwrap();
        assert!(fast_start < slow_end, "order: {:?}", seen);
    }

    #[tokio::test]
    async fn test_loop_survives_handler_failure() {
        let router = Router::new();
        let log = new_log();
        router.register(failing("/a"));
        router.register(recorder("/", "root", &log));
        router.start_current().unwrap();

        router.send("/a", "guild", "one", Attributes::new());
        router.send("/b", "guild", "two", Attributes::new());

        wait_for_len(&log, 2).await;
        let mut seen = entries(&log);
        seen.sort();
        assert_eq!(seen, vec!["root:one", "root:two"]);
        assert!(router.is_running());
    }

    #[derive(Debug)]
    struct PanickingCheck {
        path: Path,
    }

    #[async_trait::async_trait]
    impl Listener for PanickingCheck {
        fn path(&self) -> &Path {
            &self.path
        }

        fn check(&self, _event: &Event) -> bool {
            panic!("check exploded")
        }

        async fn handle(&self, _event: &Event) -> Result<(), ListenerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_loop_survives_panicking_check() {
        let router = Router::new();
        let log = new_log();
        router.register(Arc::new(PanickingCheck {
            path: Path::parse("/bad"),
        }));
        router.register(recorder("/", "root", &log));
        router.start_current().unwrap();

        router.send("/bad", "guild", "one", Attributes::new());
        router.send("/ok", "guild", "two", Attributes::new());

        wait_for_len(&log, 2).await;
        assert_eq!(entries(&log), vec!["root:one", "root:two"]);
        assert!(router.is_running());
        assert_eq!(router.pending(), 0);
    }

    #[tokio::test]
    async fn test_running_cleared_when_loop_task_dropped() {
        let router = Router::new();
        let task = router.start_current().unwrap();
        assert!(router.is_running());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!router.is_running());
    }

    #[tokio::test]
    async fn test_start_twice() {
        let router = Router::new();
        router.start_current().unwrap();
        assert!(matches!(
            router.start_current(),
            Err(RouterError::AlreadyStarted)
        ));
    }

    #[test]
    fn test_start_without_runtime() {
        let router = Router::new();
        assert!(matches!(
            router.start_current(),
            Err(RouterError::NoRuntime(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let router = Router::new();
        let handle = router.start_current().unwrap();

        router.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(!router.is_running());
        router.send("/a", "guild", "late", Attributes::new());
        assert_eq!(router.pending(), 0);
    }

    #[test]
    fn test_send_before_start_is_queued() {
        let router = Router::new();
        router.send("/a", "guild", "queued", Attributes::new());
        router.send("/b", 7u64, "queued", Attributes::new());
        assert_eq!(router.pending(), 2);
    }
}
