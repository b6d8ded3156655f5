//! Polls `GET /notifications` on a fixed interval.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use coach_core::MAX_NOTIFICATIONS;
use coach_core::models::NotificationDraft;
use coach_core::notifications::source::{NotificationSource, SourceError};
use serde::Deserialize;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::debug;

use super::source_error;
use crate::client::ApiClient;

/// Remembered ids; older ones are forgotten first.
const SEEN_CAPACITY: usize = MAX_NOTIFICATIONS * 4;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NotificationsResponse {
    Wrapped { notifications: Vec<NotificationDraft> },
    Bare(Vec<NotificationDraft>),
}

impl NotificationsResponse {
    fn into_drafts(self) -> Vec<NotificationDraft> {
        match self {
            NotificationsResponse::Wrapped { notifications } => notifications,
            NotificationsResponse::Bare(notifications) => notifications,
        }
    }
}

pub struct PollingSource {
    client: ApiClient,
    period: Duration,
    ticker: Option<Interval>,
    seen: HashSet<String>,
    seen_order: VecDeque<String>,
}

impl PollingSource {
    pub fn new(client: ApiClient, period: Duration) -> Self {
        Self {
            client,
            // tokio intervals reject a zero period.
            period: period.max(Duration::from_millis(1)),
            ticker: None,
            seen: HashSet::new(),
            seen_order: VecDeque::new(),
        }
    }

    /// Keep drafts not returned by an earlier poll, oldest first so the
    /// newest lands on top of the store. Drafts without an id cannot be
    /// matched and always pass.
    fn fresh(&mut self, drafts: Vec<NotificationDraft>) -> Vec<NotificationDraft> {
        let mut fresh: Vec<NotificationDraft> = drafts
            .into_iter()
            .filter(|draft| match &draft.id {
                Some(id) => self.remember(id),
                None => true,
            })
            .collect();
        fresh.reverse();
        fresh
    }

    fn remember(&mut self, id: &str) -> bool {
        if !self.seen.insert(id.to_string()) {
            return false;
        }
        self.seen_order.push_back(id.to_string());
        while self.seen_order.len() > SEEN_CAPACITY {
            if let Some(old) = self.seen_order.pop_front() {
                self.seen.remove(&old);
            }
        }
        true
    }
}

#[async_trait]
impl NotificationSource for PollingSource {
    async fn next_batch(&mut self) -> Result<Vec<NotificationDraft>, SourceError> {
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval_at(Instant::now(), period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        if !self.client.is_authenticated() {
            return Err(SourceError::SessionEnded);
        }

        let response: NotificationsResponse = self
            .client
            .get("/notifications")
            .await
            .map_err(source_error)?;
        let fresh = self.fresh(response.into_drafts());
        debug!(count = fresh.len(), "polled notifications");
        Ok(fresh)
    }

    fn name(&self) -> &str {
        "polling"
    }
}
