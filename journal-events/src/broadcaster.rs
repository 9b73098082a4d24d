//! Producer handles bound to a base path

use crate::event::{Attributes, Subject};
use crate::path::Path;
use crate::router::Router;

/// Sends events below a fixed base path.
///
/// Subsystems are handed a broadcaster for their own topic (for example
/// `/settings`) and send on paths relative to it.
///
/// # Examples
///
/// ```
/// use journal_events::{Attributes, Router};
///
/// let router = Router::new();
/// let journal = router.broadcaster("/settings");
///
/// journal.send("roles/mute", "guild", "Set mute role", Attributes::new().with("icon", "settings"));
/// assert_eq!(router.pending(), 1);
/// ```
#[derive(Clone)]
pub struct Broadcaster {
    router: Router,
    base: Path,
}

impl Broadcaster {
    pub(crate) fn new(router: Router, base: Path) -> Self {
        Self { router, base }
    }

    /// Base path events are sent under
    pub fn path(&self) -> &Path {
        &self.base
    }

    /// Broadcaster for a sub-topic of this one
    pub fn child(&self, relative: impl AsRef<str>) -> Broadcaster {
        Self::new(self.router.clone(), self.base.join(relative))
    }

    /// Enqueue an event on `base/relative`. An empty `relative` sends on the
    /// base path itself.
    pub fn send(
        &self,
        relative: impl AsRef<str>,
        subject: impl Into<Subject>,
        content: impl Into<String>,
        attributes: Attributes,
    ) {
        self.router
            .send(self.base.join(relative), subject, content, attributes);
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").field("base", &self.base).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::listener::FnListener;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_broadcaster_joins_relative_path() {
        let router = Router::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        router.register(Arc::new(FnListener::new("/settings", move |event: Event| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(event.path.to_string());
                Ok(())
            }
        })));
        router.start_current().unwrap();

        let journal = router.broadcaster("/settings");
        journal.send("prefix", "guild", "Unset bot command prefix", Attributes::new());
        journal
            .child("roles")
            .send("member", "guild", "Set member role", Attributes::new());
        journal.send("", "guild", "Settings touched", Attributes::new());

        tokio::time::timeout(Duration::from_secs(5), async {
            while seen.lock().unwrap().len() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["/settings/prefix", "/settings/roles/member", "/settings"]
        );
    }

    #[test]
    fn test_child_path() {
        let router = Router::new();
        let roles = router.broadcaster("/settings").child("roles");
        assert_eq!(roles.path(), &Path::parse("/settings/roles"));
    }
}
