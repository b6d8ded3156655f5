//! In-memory notification store.
//!
//! Holds the most recent notifications (newest first) together with the
//! derived unread count. The store lives for the authenticated session and
//! keeps nothing across restarts. UI code subscribes to [`NotificationEvent`]s;
//! a [`NotificationEvent::Toast`] is the transient alert for a new record.

pub mod simulated;
pub mod source;

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use crate::models::{Notification, NotificationDraft, NotificationType};

/// Retained history size. Oldest entries are evicted first.
pub const MAX_NOTIFICATIONS: usize = 50;

/// Capacity of the event channel. Slow subscribers lag rather than block.
const EVENT_CAPACITY: usize = 64;

/// Store shared between the feed task and callers.
pub type SharedNotificationStore = Arc<RwLock<NotificationStore>>;

/// Change published to subscribers after each mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// A notification was added and should be shown as a toast.
    Toast(Notification),
    Read(String),
    AllRead,
    Removed(String),
    Cleared,
}

/// Bounded, ordered notification list with an unread counter.
///
/// Invariant: `unread_count` equals the number of stored records with
/// `read == false` after every call.
#[derive(Debug)]
pub struct NotificationStore {
    notifications: Vec<Notification>,
    unread_count: usize,
    events: broadcast::Sender<NotificationEvent>,
}

impl NotificationStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            notifications: Vec::new(),
            unread_count: 0,
            events,
        }
    }

    /// Wrap a fresh store for sharing.
    pub fn shared() -> SharedNotificationStore {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Subscribe to store events.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.events.subscribe()
    }

    /// Add a notification at the front of the list.
    ///
    /// A record with the same id replaces the stored one. Unread entries
    /// pushed out by the size cap are taken off the unread count.
    pub fn add(&mut self, draft: NotificationDraft) -> Notification {
        let notification = draft.into_notification();

        if let Some(pos) = self.position(&notification.id) {
            let replaced = self.notifications.remove(pos);
            if !replaced.read {
                self.unread_count = self.unread_count.saturating_sub(1);
            }
        }

        if !notification.read {
            self.unread_count += 1;
        }
        self.notifications.insert(0, notification.clone());

        if self.notifications.len() > MAX_NOTIFICATIONS {
            for evicted in self.notifications.drain(MAX_NOTIFICATIONS..) {
                debug!(id = %evicted.id, "evicting oldest notification");
                if !evicted.read {
                    self.unread_count = self.unread_count.saturating_sub(1);
                }
            }
        }

        info!(
            id = %notification.id,
            kind = %notification.kind,
            title = %notification.title,
            "notification"
        );
        self.publish(NotificationEvent::Toast(notification.clone()));
        notification
    }

    /// Mark one notification read. Returns `true` if it was unread.
    pub fn mark_as_read(&mut self, id: &str) -> bool {
        let Some(notification) = self.notifications.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if notification.read {
            return false;
        }
        notification.read = true;
        self.unread_count = self.unread_count.saturating_sub(1);
        self.publish(NotificationEvent::Read(id.to_string()));
        true
    }

    pub fn mark_all_as_read(&mut self) {
        for notification in &mut self.notifications {
            notification.read = true;
        }
        self.unread_count = 0;
        self.publish(NotificationEvent::AllRead);
    }

    /// Remove a notification, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Notification> {
        let pos = self.position(id)?;
        let removed = self.notifications.remove(pos);
        if !removed.read {
            self.unread_count = self.unread_count.saturating_sub(1);
        }
        self.publish(NotificationEvent::Removed(removed.id.clone()));
        Some(removed)
    }

    pub fn clear_all(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;
        self.publish(NotificationEvent::Cleared);
    }

    /// All notifications, newest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn get(&self, id: &str) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.id == id)
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    /// Notifications of one type, in store order.
    pub fn by_type(&self, kind: NotificationType) -> Vec<Notification> {
        self.notifications
            .iter()
            .filter(|n| n.kind == kind)
            .cloned()
            .collect()
    }

    /// Unread notifications, in store order.
    pub fn unread(&self) -> Vec<Notification> {
        self.notifications
            .iter()
            .filter(|n| !n.read)
            .cloned()
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notifications.iter().position(|n| n.id == id)
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}
