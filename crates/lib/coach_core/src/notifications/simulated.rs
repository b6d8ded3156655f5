//! Simulated notification feed.
//!
//! Stand-in for a server push channel: on every tick it synthesizes one
//! notification from a fixed template set with a configured probability.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use super::source::{NotificationSource, SourceError};
use crate::models::{NotificationDraft, NotificationType};

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

/// Default chance that a tick produces a notification.
pub const DEFAULT_PROBABILITY: f64 = 0.3;

/// `(type, title, message)` templates.
const TEMPLATES: [(NotificationType, &str, &str); 4] = [
    (
        NotificationType::Assignment,
        "New assignment",
        "A new assignment has been posted for your class.",
    ),
    (
        NotificationType::Exam,
        "Exam reminder",
        "You have an exam scheduled for tomorrow.",
    ),
    (
        NotificationType::Goal,
        "Goal progress",
        "You are close to reaching this week's study goal.",
    ),
    (
        NotificationType::System,
        "System update",
        "The platform will be updated tonight.",
    ),
];

pub struct SimulatedSource {
    period: Duration,
    probability: f64,
    rng: StdRng,
    // Created on first use so construction does not need a runtime.
    ticker: Option<Interval>,
}

impl SimulatedSource {
    pub fn new(period: Duration, probability: f64) -> Self {
        Self::with_rng(period, probability, StdRng::from_os_rng())
    }

    /// Deterministic feed for tests and demos.
    pub fn seeded(period: Duration, probability: f64, seed: u64) -> Self {
        Self::with_rng(period, probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(period: Duration, probability: f64, rng: StdRng) -> Self {
        Self {
            // tokio intervals reject a zero period.
            period: period.max(Duration::from_millis(1)),
            probability: probability.clamp(0.0, 1.0),
            rng,
            ticker: None,
        }
    }

    /// Pick a template, or nothing when the roll misses.
    fn roll(&mut self) -> Option<NotificationDraft> {
        if !self.rng.random_bool(self.probability) {
            return None;
        }
        let (kind, title, message) = TEMPLATES[self.rng.random_range(0..TEMPLATES.len())];
        Some(NotificationDraft::new(kind, title, message))
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_PROBABILITY)
    }
}

#[async_trait]
impl NotificationSource for SimulatedSource {
    async fn next_batch(&mut self) -> Result<Vec<NotificationDraft>, SourceError> {
        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;
        Ok(self.roll().into_iter().collect())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn certain_feed_emits_one_template_per_tick() {
        let mut source = SimulatedSource::seeded(Duration::from_secs(30), 1.0, 42);
        let started = Instant::now();

        for _ in 0..5 {
            let batch = source.next_batch().await.unwrap();
            assert_eq!(batch.len(), 1);
            let draft = &batch[0];
            assert!(TEMPLATES.iter().any(|(kind, title, message)| {
                *kind == draft.kind && *title == draft.title && *message == draft.message
            }));
            assert!(draft.id.is_none());
        }

        assert!(started.elapsed() >= Duration::from_secs(150));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_feed_emits_nothing() {
        let mut source = SimulatedSource::seeded(Duration::from_secs(1), 0.0, 1);
        for _ in 0..10 {
            assert!(source.next_batch().await.unwrap().is_empty());
        }
    }

    #[test]
    fn probability_is_clamped() {
        let source = SimulatedSource::seeded(DEFAULT_PERIOD, 3.5, 0);
        assert_eq!(source.probability, 1.0);
        let source = SimulatedSource::seeded(DEFAULT_PERIOD, -1.0, 0);
        assert_eq!(source.probability, 0.0);
    }
}
