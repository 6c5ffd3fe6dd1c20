//! Event subscriber - the long-lived listener loop.
//!
//! One spawned task pulls messages off the feed and dispatches them one at a
//! time in delivery order. Stopping cancels the loop between messages; a
//! message already being handled runs to completion.

use crate::{
    config::EventsConfig,
    core::leave_request::SigningOutcome,
    events::{
        feed::{EventFeed, FeedMessage},
        reconciler::SigningReconciler,
        types::SigningEvent,
    },
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Dispatches feed messages to the reconciler.
#[derive(Debug, Clone)]
pub struct EventSubscriber {
    reconciler: SigningReconciler,
    prefix: String,
}

impl EventSubscriber {
    /// Subscriber for channels under the configured prefix.
    pub fn new(reconciler: SigningReconciler, config: &EventsConfig) -> Self {
        Self {
            reconciler,
            prefix: config.prefix().to_string(),
        }
    }

    /// Event type carried by `channel`: the part after `<prefix>.`.
    #[must_use]
    pub fn event_type<'a>(&self, channel: &'a str) -> Option<&'a str> {
        channel
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|event_type| !event_type.is_empty())
    }

    /// Handles one message. Failures are logged, never returned.
    pub async fn dispatch(&self, message: &FeedMessage) -> Option<SigningOutcome> {
        info!(channel = %message.channel, "Received event");

        let event = match SigningEvent::parse(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                error!(channel = %message.channel, error = %e, "Failed to unmarshal signing event");
                return None;
            }
        };

        let Some(event_type) = self.event_type(&message.channel) else {
            info!(channel = %message.channel, "Ignoring event without a type");
            return None;
        };

        match self.reconciler.handle(event_type, &event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(event_id = %event.id, error = %e, "Failed to handle {event_type} event");
                None
            }
        }
    }

    /// Spawns the listener loop over `feed`.
    pub fn start<F>(self, feed: F) -> SubscriberHandle
    where
        F: EventFeed + 'static,
    {
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let token = cancel.clone();
        let done = finished.clone();
        let handle = tokio::spawn(async move {
            let _done = done.drop_guard();
            self.run(feed, token).await;
        });
        SubscriberHandle {
            cancel,
            finished,
            handle,
        }
    }

    async fn run<F: EventFeed>(self, mut feed: F, cancel: CancellationToken) {
        info!(prefix = %self.prefix, "Event subscriber started");
        loop {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                message = feed.recv() => message,
            };
            let Some(message) = message else {
                warn!("Event feed closed");
                break;
            };
            self.dispatch(&message).await;
        }
        info!("Event subscriber stopped");
    }
}

/// Control handle of a running subscriber.
#[derive(Debug)]
pub struct SubscriberHandle {
    cancel: CancellationToken,
    finished: CancellationToken,
    handle: JoinHandle<()>,
}

impl SubscriberHandle {
    /// Stops accepting messages and waits up to `timeout` for the loop to end.
    ///
    /// Returns `false` if the loop had to be aborted.
    pub async fn stop(self, timeout: Duration) -> bool {
        info!("Stopping event subscriber");
        self.cancel.cancel();
        let mut handle = self.handle;
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!(error = %e, "Event subscriber task failed");
                false
            }
            Err(_) => {
                warn!(?timeout, "Event subscriber did not stop in time, aborting");
                handle.abort();
                false
            }
        }
    }

    /// Waits for the loop to end on its own, e.g. when the feed closes.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            error!(error = %e, "Event subscriber task failed");
        }
    }

    /// Resolves once the loop has returned, without consuming the handle.
    pub async fn closed(&self) {
        self.finished.cancelled().await;
    }

    /// Whether the loop has already returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
