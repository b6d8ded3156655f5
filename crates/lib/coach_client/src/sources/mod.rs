//! Notification sources backed by the platform API.

mod polling;
mod push;

pub use polling::PollingSource;
pub use push::{DEFAULT_RECONNECT_DELAY, PushSource};

use std::time::Duration;

use coach_core::notifications::simulated::{DEFAULT_PROBABILITY, SimulatedSource};
use coach_core::notifications::source::{NotificationSource, NotificationSourceKind, SourceError};

use crate::client::ApiClient;
use crate::error::ClientError;

/// Build the configured source. `period` paces the simulated and polling
/// sources and is the push source's reconnect delay.
pub fn build_source(
    kind: NotificationSourceKind,
    client: &ApiClient,
    period: Duration,
) -> Box<dyn NotificationSource> {
    match kind {
        NotificationSourceKind::Simulated => {
            Box::new(SimulatedSource::new(period, DEFAULT_PROBABILITY))
        }
        NotificationSourceKind::Polling => Box::new(PollingSource::new(client.clone(), period)),
        NotificationSourceKind::Push => {
            Box::new(PushSource::new(client.clone()).with_reconnect_delay(period))
        }
    }
}

/// A rejected session ends the feed; everything else is retried.
fn source_error(error: ClientError) -> SourceError {
    match error {
        ClientError::Unauthorized { .. } => SourceError::SessionEnded,
        ClientError::Decode(msg) => SourceError::Decode(msg),
        other => SourceError::Transport(other.to_string()),
    }
}
