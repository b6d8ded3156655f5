//! Domain models shared by the client and the notification store.
//!
//! Wire names follow the backend's camelCase JSON convention.

pub mod auth;
pub mod notification;

pub use auth::{RegisterRequest, Role, User};
pub use notification::{Notification, NotificationDraft, NotificationType};
