//! Event feed adapters.
//!
//! A feed yields messages published on channels matching its subscription
//! patterns, in delivery order. Patterns use `*` as a wildcard for any run of
//! characters, like Redis `PSUBSCRIBE`.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, Lines},
    sync::mpsc,
};
use tracing::{debug, error, warn};

/// One message taken off the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    /// Channel the message was published on
    pub channel: String,
    /// Raw JSON payload
    pub payload: String,
}

/// Source of feed messages.
#[async_trait]
pub trait EventFeed: Send {
    /// Next message, or `None` once the feed is closed.
    async fn recv(&mut self) -> Option<FeedMessage>;
}

/// Whether `channel` matches a subscription `pattern`.
#[must_use]
pub fn topic_matches(pattern: &str, channel: &str) -> bool {
    let mut parts = pattern.split('*');
    let head = parts.next().unwrap_or_default();
    let Some(mut rest) = channel.strip_prefix(head) else {
        return false;
    };

    let parts: Vec<&str> = parts.collect();
    let Some((tail, middle)) = parts.split_last() else {
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(at) => rest = &rest[at + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(tail)
}

fn subscribed(patterns: &[String], channel: &str) -> bool {
    patterns.iter().any(|pattern| topic_matches(pattern, channel))
}

/// In-process feed backed by a tokio channel.
pub struct ChannelFeed {
    rx: mpsc::Receiver<FeedMessage>,
    patterns: Vec<String>,
}

/// Publishing side of a [`ChannelFeed`].
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    tx: mpsc::Sender<FeedMessage>,
}

impl ChannelFeed {
    /// Creates a feed subscribed to `patterns` and its publisher.
    pub fn new(capacity: usize, patterns: Vec<String>) -> (FeedPublisher, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (FeedPublisher { tx }, Self { rx, patterns })
    }
}

impl FeedPublisher {
    /// Publishes `payload` on `channel`.
    pub async fn publish(&self, channel: impl Into<String>, payload: impl Into<String>) -> Result<()> {
        self.tx
            .send(FeedMessage {
                channel: channel.into(),
                payload: payload.into(),
            })
            .await
            .map_err(|_| Error::internal("event feed closed"))
    }
}

#[async_trait]
impl EventFeed for ChannelFeed {
    async fn recv(&mut self) -> Option<FeedMessage> {
        loop {
            let message = self.rx.recv().await?;
            if subscribed(&self.patterns, &message.channel) {
                return Some(message);
            }
            debug!(channel = %message.channel, "Skipping message on unsubscribed channel");
        }
    }
}

/// One line of a JSON-lines feed: `{"channel": "...", "payload": {...}}`.
///
/// `payload` may be the envelope object itself or a string holding it.
#[derive(Debug, Deserialize)]
struct FeedLine {
    channel: String,
    payload: serde_json::Value,
}

/// Feed reading JSON lines from any async reader, such as stdin.
pub struct JsonLinesFeed<R> {
    lines: Lines<R>,
    patterns: Vec<String>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesFeed<R> {
    /// Reads messages from `reader`, keeping those matching `patterns`.
    pub fn new(reader: R, patterns: Vec<String>) -> Self {
        Self {
            lines: reader.lines(),
            patterns,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventFeed for JsonLinesFeed<R> {
    async fn recv(&mut self) -> Option<FeedMessage> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    error!(error = %e, "Failed to read event feed");
                    return None;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let parsed: FeedLine = match serde_json::from_str(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed feed line");
                    continue;
                }
            };
            if !subscribed(&self.patterns, &parsed.channel) {
                debug!(channel = %parsed.channel, "Skipping message on unsubscribed channel");
                continue;
            }

            let payload = match parsed.payload {
                serde_json::Value::String(raw) => raw,
                other => other.to_string(),
            };
            return Some(FeedMessage {
                channel: parsed.channel,
                payload,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_topic_matches() {
        assert!(topic_matches("paperless.signing.request.completed", "paperless.signing.request.completed"));
        assert!(!topic_matches("paperless.signing.request.completed", "paperless.signing.request.declined"));
        assert!(topic_matches("paperless.*", "paperless.signing.request.completed"));
        assert!(topic_matches("paperless.*.completed", "paperless.signing.request.completed"));
        assert!(!topic_matches("paperless.*.completed", "paperless.signing.request.declined"));
        assert!(topic_matches("*", "anything"));
        assert!(!topic_matches("other.*", "paperless.signing.request.completed"));
        assert!(!topic_matches("paperless", "paperless.signing"));
    }

    #[tokio::test]
    async fn test_channel_feed_filters_and_preserves_order() {
        let (publisher, mut feed) = ChannelFeed::new(8, vec!["paperless.*".to_string()]);
        publisher.publish("paperless.a", "1").await.unwrap();
        publisher.publish("other.a", "2").await.unwrap();
        publisher.publish("paperless.b", "3").await.unwrap();
        drop(publisher);

        assert_eq!(feed.recv().await.unwrap().payload, "1");
        assert_eq!(feed.recv().await.unwrap().payload, "3");
        assert!(feed.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_publish_after_feed_dropped_fails() {
        let (publisher, feed) = ChannelFeed::new(1, vec!["*".to_string()]);
        drop(feed);
        assert!(matches!(
            publisher.publish("x", "{}").await,
            Err(Error::Internal { message: _ })
        ));
    }

    #[tokio::test]
    async fn test_json_lines_feed() {
        let input = concat!(
            r#"{"channel": "paperless.signing.request.completed", "payload": {"id": "1"}}"#,
            "\n",
            "garbage\n",
            "\n",
            r#"{"channel": "other.topic", "payload": {}}"#,
            "\n",
            r#"{"channel": "paperless.signing.request.completed", "payload": "{\"id\":\"2\"}"}"#,
            "\n",
        );
        let mut feed = JsonLinesFeed::new(
            input.as_bytes(),
            vec!["paperless.signing.request.completed".to_string()],
        );

        let first = feed.recv().await.unwrap();
        assert_eq!(first.channel, "paperless.signing.request.completed");
        assert_eq!(first.payload, r#"{"id":"1"}"#);
        assert_eq!(feed.recv().await.unwrap().payload, r#"{"id":"2"}"#);
        assert!(feed.recv().await.is_none());
    }
}
