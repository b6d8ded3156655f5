//! Notification sources: where new notifications come from.
//!
//! The store's mutation API does not depend on the transport. A source
//! yields batches of drafts; [`spawn_feed`] pumps them into a shared store
//! until cancelled.

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SharedNotificationStore;
use crate::models::NotificationDraft;

/// Errors a notification source can report.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid notification payload: {0}")]
    Decode(String),

    /// The session behind the source ended; the feed stops.
    #[error("Session ended")]
    SessionEnded,

    #[error("Source closed")]
    Closed,
}

impl SourceError {
    /// Whether the feed loop should stop after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::SessionEnded | SourceError::Closed)
    }
}

/// A supplier of notification drafts.
///
/// `next_batch` paces itself (timer tick, poll interval, stream read), so
/// the feed loop can call it back to back. An empty batch is normal.
#[async_trait]
pub trait NotificationSource: Send {
    async fn next_batch(&mut self) -> Result<Vec<NotificationDraft>, SourceError>;

    /// Source identifier for logging.
    fn name(&self) -> &str;
}

/// Which source the client should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationSourceKind {
    #[default]
    Simulated,
    Polling,
    Push,
}

impl NotificationSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationSourceKind::Simulated => "simulated",
            NotificationSourceKind::Polling => "polling",
            NotificationSourceKind::Push => "push",
        }
    }
}

impl std::fmt::Display for NotificationSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(NotificationSourceKind::Simulated),
            "polling" | "poll" => Ok(NotificationSourceKind::Polling),
            "push" | "sse" => Ok(NotificationSourceKind::Push),
            other => Err(format!(
                "unknown notification source '{other}' (expected simulated, polling or push)"
            )),
        }
    }
}

/// Run `source` in a background task, adding every draft to `store`.
///
/// Stops when `cancel` fires or the source reports a fatal error.
pub fn spawn_feed(
    mut source: Box<dyn NotificationSource>,
    store: SharedNotificationStore,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(source = source.name(), "notification feed started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                batch = source.next_batch() => match batch {
                    Ok(drafts) if drafts.is_empty() => {}
                    Ok(drafts) => {
                        debug!(source = source.name(), count = drafts.len(), "notification batch");
                        let mut guard = store.write().await;
                        for draft in drafts {
                            guard.add(draft);
                        }
                    }
                    Err(e) if e.is_fatal() => {
                        warn!(source = source.name(), "notification feed stopping: {e}");
                        break;
                    }
                    Err(e) => {
                        warn!(source = source.name(), "notification source error: {e}");
                    }
                },
            }
        }
        info!(source = source.name(), "notification feed stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotificationStore;
    use crate::models::NotificationType;

    /// Replays scripted results, then cancels the feed.
    struct ScriptedSource {
        script: Vec<Result<Vec<NotificationDraft>, SourceError>>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl NotificationSource for ScriptedSource {
        async fn next_batch(&mut self) -> Result<Vec<NotificationDraft>, SourceError> {
            if self.script.is_empty() {
                self.cancel.cancel();
                std::future::pending::<()>().await;
            }
            self.script.remove(0)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn exam(id: &str) -> NotificationDraft {
        NotificationDraft::new(NotificationType::Exam, "Exam", "soon").with_id(id)
    }

    #[tokio::test]
    async fn feed_adds_batches_and_survives_transient_errors() {
        let store = NotificationStore::shared();
        let cancel = CancellationToken::new();
        let source = ScriptedSource {
            script: vec![
                Ok(vec![exam("a"), exam("b")]),
                Err(SourceError::Transport("connection reset".into())),
                Ok(vec![]),
                Ok(vec![exam("c")]),
            ],
            cancel: cancel.clone(),
        };

        spawn_feed(Box::new(source), store.clone(), cancel)
            .await
            .unwrap();

        let guard = store.read().await;
        let ids: Vec<_> = guard.notifications().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(guard.unread_count(), 3);
    }

    #[tokio::test]
    async fn feed_stops_on_fatal_error() {
        let store = NotificationStore::shared();
        let cancel = CancellationToken::new();
        let source = ScriptedSource {
            script: vec![
                Ok(vec![exam("a")]),
                Err(SourceError::SessionEnded),
                Ok(vec![exam("never")]),
            ],
            cancel: cancel.clone(),
        };

        spawn_feed(Box::new(source), store.clone(), cancel.clone())
            .await
            .unwrap();

        let guard = store.read().await;
        assert_eq!(guard.len(), 1);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn source_kind_parses() {
        assert_eq!(
            "Polling".parse::<NotificationSourceKind>().unwrap(),
            NotificationSourceKind::Polling
        );
        assert_eq!(
            "sse".parse::<NotificationSourceKind>().unwrap(),
            NotificationSourceKind::Push
        );
        assert!("websocket".parse::<NotificationSourceKind>().is_err());
        assert_eq!(NotificationSourceKind::default().to_string(), "simulated");
    }
}
