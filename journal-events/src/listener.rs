//! Listener trait and built-in listeners

use crate::error::ListenerError;
use crate::event::{Attributes, Event};
use crate::path::Path;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

/// Subscriber bound to one path.
///
/// A listener registered at a path sees events sent to that path and to
/// every path beneath it. Its [`check`](Listener::check) decides whether a
/// matched event is handled; the default compares the listener's
/// [`predicate`](Listener::predicate) against the event attributes.
///
/// # Examples
///
/// ```rust,ignore
/// #[derive(Debug)]
/// struct AuditSink {
///     path: Path,
/// }
///
/// #[async_trait]
/// impl Listener for AuditSink {
///     fn path(&self) -> &Path {
///         &self.path
///     }
///
///     async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
///         println!("[{}] {}", event.path, event.content);
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Listener: Send + Sync + fmt::Debug {
    /// Path this listener is registered on. Must not change while registered.
    fn path(&self) -> &Path;

    /// Attributes an event must carry for the default [`check`](Listener::check) to pass
    fn predicate(&self) -> &Attributes {
        Attributes::empty()
    }

    /// Static metadata used by [`Router::get`](crate::Router::get)
    fn metadata(&self) -> &Attributes {
        Attributes::empty()
    }

    /// Name used in logs and error reports
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Decide whether to handle a matched event. Must be side-effect free.
    fn check(&self, event: &Event) -> bool {
        event.attributes.matches(self.predicate())
    }

    /// Handle the event
    async fn handle(&self, event: &Event) -> Result<(), ListenerError>;
}

/// Boxed handler future used by [`FnListener`]
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), ListenerError>> + Send>>;

/// Handler function type for [`FnListener`]
pub type ListenerHandler = Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>;

/// Listener backed by a closure
pub struct FnListener {
    path: Path,
    predicate: Attributes,
    metadata: Attributes,
    name: String,
    handler: ListenerHandler,
}

impl FnListener {
    /// Create a listener from an async closure
    ///
    /// # Examples
    ///
    /// ```
    /// use journal_events::{Attributes, FnListener, Listener};
    ///
    /// let listener = FnListener::new("/settings", |event| async move {
    ///     println!("{}", event.content);
    ///     Ok(())
    /// })
    /// .with_predicate(Attributes::new().with("icon", "settings"));
    ///
    /// assert_eq!(listener.path().to_string(), "/settings");
    /// ```
    pub fn new<F, Fut>(path: impl Into<Path>, handler: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let handler: ListenerHandler = Arc::new(move |event: Event| -> HandlerFuture {
            Box::pin(handler(event))
        });
        let path = path.into();

        Self {
            name: format!("FnListener({})", path),
            path,
            predicate: Attributes::new(),
            metadata: Attributes::new(),
            handler,
        }
    }

    /// Only handle events whose attributes contain `predicate`
    pub fn with_predicate(mut self, predicate: Attributes) -> Self {
        self.predicate = predicate;
        self
    }

    /// Attach static metadata for lookups
    pub fn with_metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Debug for FnListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("predicate", &self.predicate)
            .finish()
    }
}

#[async_trait]
impl Listener for FnListener {
    fn path(&self) -> &Path {
        &self.path
    }

    fn predicate(&self) -> &Attributes {
        &self.predicate
    }

    fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        (self.handler)(event.clone()).await
    }
}

/// Listener that writes every matched event to the log.
///
/// This is the console journal: register one on `/` to trace all traffic.
#[derive(Debug, Clone)]
pub struct TracingListener {
    path: Path,
    predicate: Attributes,
}

impl TracingListener {
    pub fn new(path: impl Into<Path>) -> Self {
        Self {
            path: path.into(),
            predicate: Attributes::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Attributes) -> Self {
        self.predicate = predicate;
        self
    }
}

#[async_trait]
impl Listener for TracingListener {
    fn path(&self) -> &Path {
        &self.path
    }

    fn predicate(&self) -> &Attributes {
        &self.predicate
    }

    fn name(&self) -> &str {
        "TracingListener"
    }

    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        info!(
            target: "journal",
            event_id = %event.id,
            path = %event.path,
            subject = %event.subject,
            "{}",
            event.content
        );
        Ok(())
    }
}
