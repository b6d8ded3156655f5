//! Server push over `GET /notifications/stream` (`text/event-stream`).
//!
//! Each `message` event carries one notification as JSON. When the stream
//! ends or fails the source waits out the reconnect delay, reports a
//! transport error and reconnects on the next call.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use coach_core::models::NotificationDraft;
use coach_core::notifications::source::{NotificationSource, SourceError};
use futures_util::{Stream, StreamExt};
use reqwest::Method;
use sse_stream::{Sse, SseStream};
use tracing::{debug, info};

use super::source_error;
use crate::client::{ApiClient, RequestSpec};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

const STREAM_PATH: &str = "/notifications/stream";

/// The request timeout covers the whole body, so streams are recycled.
const STREAM_LIFETIME: Duration = Duration::from_secs(60 * 60);

type EventStream = Pin<Box<dyn Stream<Item = Result<Sse, sse_stream::Error>> + Send>>;

pub struct PushSource {
    client: ApiClient,
    reconnect_delay: Duration,
    stream: Option<EventStream>,
}

impl PushSource {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            stream: None,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Drop the stream and pace the reconnect.
    async fn disconnected(&mut self, reason: String) -> SourceError {
        self.stream = None;
        tokio::time::sleep(self.reconnect_delay).await;
        SourceError::Transport(reason)
    }
}

async fn connect(client: &ApiClient) -> Result<EventStream, SourceError> {
    let url = client.config().endpoint(STREAM_PATH).map_err(source_error)?;
    let spec = RequestSpec::new(Method::GET, url, STREAM_PATH)
        .accept("text/event-stream")
        .timeout(STREAM_LIFETIME);
    let response = client.execute(spec).await.map_err(source_error)?;
    info!("notification stream connected");
    Ok(Box::pin(SseStream::from_byte_stream(response.bytes_stream())))
}

/// Parse a `message` event; other event types yield `None`.
fn parse_event(sse: &Sse) -> Option<Result<NotificationDraft, SourceError>> {
    match sse.event.as_deref() {
        None | Some("message") => {}
        _ => return None,
    }
    let data = sse.data.as_deref()?;
    Some(serde_json::from_str(data).map_err(|e| SourceError::Decode(e.to_string())))
}

#[async_trait]
impl NotificationSource for PushSource {
    async fn next_batch(&mut self) -> Result<Vec<NotificationDraft>, SourceError> {
        if !self.client.is_authenticated() {
            return Err(SourceError::SessionEnded);
        }

        if self.stream.is_none() {
            match connect(&self.client).await {
                Ok(stream) => self.stream = Some(stream),
                Err(SourceError::SessionEnded) => return Err(SourceError::SessionEnded),
                Err(e) => return Err(self.disconnected(e.to_string()).await),
            }
        }

        loop {
            let event = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => return Err(SourceError::Closed),
            };
            match event {
                Some(Ok(sse)) => match parse_event(&sse) {
                    Some(Ok(draft)) => return Ok(vec![draft]),
                    Some(Err(e)) => return Err(e),
                    None => debug!(event = ?sse.event, "skipping stream event"),
                },
                Some(Err(e)) => {
                    return Err(self.disconnected(format!("notification stream error: {e}")).await);
                }
                None => {
                    return Err(self.disconnected("notification stream ended".into()).await);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "push"
    }
}

#[cfg(test)]
mod tests {
    use coach_core::models::NotificationType;

    use super::*;

    fn sse(event: Option<&str>, data: &str) -> Sse {
        Sse {
            event: event.map(str::to_string),
            data: Some(data.to_string()),
            id: None,
            retry: None,
        }
    }

    #[test]
    fn message_events_become_drafts() {
        let data = r#"{"id":"n1","type":"goal","title":"Goal","message":"Almost there"}"#;
        for event in [None, Some("message")] {
            let draft = parse_event(&sse(event, data)).unwrap().unwrap();
            assert_eq!(draft.id.as_deref(), Some("n1"));
            assert_eq!(draft.kind, NotificationType::Goal);
        }
    }

    #[test]
    fn other_events_are_skipped() {
        assert!(parse_event(&sse(Some("ping"), "{}")).is_none());
    }

    #[test]
    fn bad_payload_is_decode_error() {
        assert!(matches!(
            parse_event(&sse(None, "not json")),
            Some(Err(SourceError::Decode(_)))
        ));
    }
}
