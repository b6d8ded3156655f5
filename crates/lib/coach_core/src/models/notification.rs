//! Notification records held by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Assignment,
    Exam,
    Goal,
    System,
}

impl NotificationType {
    pub const ALL: [NotificationType; 4] = [
        NotificationType::Assignment,
        NotificationType::Exam,
        NotificationType::Goal,
        NotificationType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Assignment => "assignment",
            NotificationType::Exam => "exam",
            NotificationType::Goal => "goal",
            NotificationType::System => "system",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique within the store.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Input record for [`crate::NotificationStore::add`].
///
/// Missing `id`, `timestamp` and `read` get defaults when the draft is
/// stored. Server payloads may use `_id` and `createdAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    #[serde(default, alias = "createdAt", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl NotificationDraft {
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: None,
            read: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_read(mut self, read: bool) -> Self {
        self.read = Some(read);
        self
    }

    /// Fill in defaults. Generated ids are UUIDv7, so they sort by creation time.
    pub fn into_notification(self) -> Notification {
        Notification {
            id: self.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
            kind: self.kind,
            title: self.title,
            message: self.message,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            read: self.read.unwrap_or(false),
        }
    }
}
