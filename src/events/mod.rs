//! Event reconciliation - consumes signing notifications from the event feed.
//!
//! Channels are named `<prefix>.<event-type>`. Only
//! `signing.request.completed` is acted upon; delivery is at-least-once and
//! handling is idempotent through the leave request status guard.

pub mod feed;
pub mod reconciler;
pub mod subscriber;
pub mod types;

pub use feed::{ChannelFeed, EventFeed, FeedMessage, FeedPublisher, JsonLinesFeed, topic_matches};
pub use reconciler::SigningReconciler;
pub use subscriber::{EventSubscriber, SubscriberHandle};
pub use types::{SigningEvent, SigningRequestCompletedData};
