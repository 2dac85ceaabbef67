//! Event bus abstraction for notification fan-out.
//!
//! The engine publishes [`SerializedEvent`]s to named topics after a state
//! change has been committed. Delivery is the bus's concern: a failed publish
//! is logged by the caller and never rolls back the committed change.
//!
//! ```text
//! ┌──────────────┐   commit    ┌──────────────┐  publish  ┌──────────────┐
//! │  Workflow    │ ──────────► │  In-memory   │ ────────► │  Event bus   │ ──► notifier
//! │  operation   │             │  state       │           │  (topic)     │
//! └──────────────┘             └──────────────┘           └──────────────┘
//! ```
//!
//! Topics follow the pattern `certifytrack-{area}`:
//! - `certifytrack-bookings`
//! - `certifytrack-events`
//! - `certifytrack-credits`
//! - `certifytrack-certificates`
//!
//! The in-memory implementation lives in `certifytrack-testing`.

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to topics
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe
        topics: Vec<String>,
        /// The reason for failure
        reason: String,
    },

    /// Subscriber fell behind and events were dropped
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),

    /// Topic not found or invalid
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),
}

/// Stream of events from subscriptions.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Publish/subscribe transport for domain events.
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the bus can be shared as
/// `Arc<dyn EventBus>` between workflow components.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the transport rejects the event.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be established.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
