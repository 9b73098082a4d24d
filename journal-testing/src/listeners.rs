// Listener doubles for router tests

use async_trait::async_trait;
use journal_events::{Attributes, Event, Listener, ListenerError, Path};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Listener that records every event it handles.
///
/// Clones share the same log, so keep a clone to inspect after handing one
/// to the router.
#[derive(Debug, Clone)]
pub struct RecordingListener {
    path: Path,
    predicate: Attributes,
    metadata: Attributes,
    name: String,
    events: Arc<Mutex<Vec<Event>>>,
    timeline: Option<Timeline>,
}

impl RecordingListener {
    pub fn new(path: impl Into<Path>) -> Self {
        let path = path.into();
        Self {
            name: format!("RecordingListener({})", path),
            path,
            predicate: Attributes::new(),
            metadata: Attributes::new(),
            events: Arc::new(Mutex::new(Vec::new())),
            timeline: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Attributes) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn with_metadata(mut self, metadata: Attributes) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Also mark each handled event on `timeline`
    pub fn with_timeline(mut self, timeline: &Timeline) -> Self {
        self.timeline = Some(timeline.clone());
        self
    }

    /// Events handled so far, in order
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    /// Content of each handled event, in order
    pub fn contents(&self) -> Vec<String> {
        lock(&self.events).iter().map(|e| e.content.clone()).collect()
    }

    pub fn count(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

#[async_trait]
impl Listener for RecordingListener {
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
        if let Some(timeline) = &self.timeline {
            timeline.started(&self.name, event);
            timeline.finished(&self.name, event);
        }
        lock(&self.events).push(event.clone());
        Ok(())
    }
}

/// Listener whose handler always returns an error
#[derive(Debug, Clone)]
pub struct FailingListener {
    path: Path,
    message: String,
    calls: Arc<Mutex<usize>>,
}

impl FailingListener {
    pub fn new(path: impl Into<Path>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of times the handler ran
    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl Listener for FailingListener {
    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        "FailingListener"
    }

    async fn handle(&self, _event: &Event) -> Result<(), ListenerError> {
        *lock(&self.calls) += 1;
        Err(ListenerError::HandlerFailed(self.message.clone()))
    }
}

/// Listener whose handler panics
#[derive(Debug, Clone)]
pub struct PanickingListener {
    path: Path,
    message: String,
}

impl PanickingListener {
    pub fn new(path: impl Into<Path>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Listener for PanickingListener {
    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        "PanickingListener"
    }

    async fn handle(&self, _event: &Event) -> Result<(), ListenerError> {
        panic!("{}", self.message);
    }
}

/// One step recorded on a [`Timeline`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Started { listener: String, content: String },
    Finished { listener: String, content: String },
}

/// Ordered start/finish log shared between listeners
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    marks: Arc<Mutex<Vec<Mark>>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self, listener: &str, event: &Event) {
        lock(&self.marks).push(Mark::Started {
            listener: listener.to_string(),
            content: event.content.clone(),
        });
    }

    pub fn finished(&self, listener: &str, event: &Event) {
        lock(&self.marks).push(Mark::Finished {
            listener: listener.to_string(),
            content: event.content.clone(),
        });
    }

    pub fn marks(&self) -> Vec<Mark> {
        lock(&self.marks).clone()
    }

    /// Index of the first mark matching `predicate`
    pub fn position(&self, predicate: impl Fn(&Mark) -> bool) -> Option<usize> {
        lock(&self.marks).iter().position(predicate)
    }

    pub fn len(&self) -> usize {
        lock(&self.marks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.marks).is_empty()
    }
}

/// Listener that sleeps before completing, marking start and finish
#[derive(Debug, Clone)]
pub struct DelayedListener {
    path: Path,
    name: String,
    delay: Duration,
    timeline: Timeline,
}

impl DelayedListener {
    pub fn new(path: impl Into<Path>, delay: Duration, timeline: &Timeline) -> Self {
        let path = path.into();
        Self {
            name: format!("DelayedListener({})", path),
            path,
            delay,
            timeline: timeline.clone(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Listener for DelayedListener {
    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<(), ListenerError> {
        self.timeline.started(&self.name, event);
        tokio::time::sleep(self.delay).await;
        self.timeline.finished(&self.name, event);
        Ok(())
    }
}
