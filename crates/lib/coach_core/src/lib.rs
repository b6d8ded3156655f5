//! # coach_core
//!
//! Core domain logic for the coaching platform client: principal and
//! notification models, the bounded notification store, and the
//! notification source abstraction.

pub mod models;
pub mod notifications;

pub use notifications::{
    MAX_NOTIFICATIONS, NotificationEvent, NotificationStore, SharedNotificationStore,
};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
