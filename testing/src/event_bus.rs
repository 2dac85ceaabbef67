//! In-memory event bus for tests.
//!
//! Records every published event so tests can assert on notifications, and
//! fans events out to live subscribers through per-topic broadcast channels.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for lock poisoning
#![allow(clippy::missing_panics_doc)] // Only lock poisoning can panic

use certifytrack_core::event::SerializedEvent;
use certifytrack_core::event_bus::{EventBus, EventBusError, EventStream};
use futures::StreamExt;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct BusState {
    published: Vec<(String, SerializedEvent)>,
    channels: HashMap<String, broadcast::Sender<SerializedEvent>>,
    fail_publish: Option<String>,
}

/// In-memory [`EventBus`] that keeps a log of everything published.
///
/// # Example
///
/// ```
/// use certifytrack_core::event::SerializedEvent;
/// use certifytrack_core::event_bus::EventBus;
/// use certifytrack_testing::InMemoryEventBus;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryEventBus::new();
/// let event = SerializedEvent::new("BookingApproved.v1".to_string(), vec![], None);
/// bus.publish("certifytrack-bookings", &event).await?;
///
/// assert_eq!(bus.published_types(), vec!["BookingApproved.v1".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventBus {
    state: Arc<RwLock<BusState>>,
}

impl InMemoryEventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every published event, in publish order
    #[must_use]
    pub fn published(&self) -> Vec<SerializedEvent> {
        self.state
            .read()
            .unwrap()
            .published
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Event types of everything published, in publish order
    #[must_use]
    pub fn published_types(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .published
            .iter()
            .map(|(_, event)| event.event_type.clone())
            .collect()
    }

    /// Events published on one topic
    #[must_use]
    pub fn published_on(&self, topic: &str) -> Vec<SerializedEvent> {
        self.state
            .read()
            .unwrap()
            .published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Count of published events with the given type
    #[must_use]
    pub fn count_of(&self, event_type: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .published
            .iter()
            .filter(|(_, event)| event.event_type == event_type)
            .count()
    }

    /// Make every subsequent publish fail with `reason`
    pub fn fail_publishes(&self, reason: impl Into<String>) {
        self.state.write().unwrap().fail_publish = Some(reason.into());
    }

    /// Forget recorded events (for test isolation)
    pub fn clear(&self) {
        self.state.write().unwrap().published.clear();
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            let mut state = self.state.write().unwrap();
            if let Some(reason) = &state.fail_publish {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: reason.clone(),
                });
            }
            if let Some(sender) = state.channels.get(&topic) {
                // No live receivers is not an error for a bus.
                let _ = sender.send(event.clone());
            }
            state.published.push((topic, event));
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|t| (*t).to_string()).collect();
        Box::pin(async move {
            if topics.is_empty() {
                return Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "no topics given".to_string(),
                });
            }

            let receivers: Vec<broadcast::Receiver<SerializedEvent>> = {
                let mut state = self.state.write().unwrap();
                topics
                    .iter()
                    .map(|topic| {
                        state
                            .channels
                            .entry(topic.clone())
                            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                            .subscribe()
                    })
                    .collect()
            };

            let streams = receivers.into_iter().map(|rx| {
                futures::stream::unfold(rx, |mut rx| async move {
                    match rx.recv().await {
                        Ok(event) => Some((Ok(event), rx)),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            Some((Err(EventBusError::Lagged(skipped)), rx))
                        },
                        Err(broadcast::error::RecvError::Closed) => None,
                    }
                })
                .boxed()
            });

            let stream: EventStream = Box::pin(futures::stream::select_all(streams));
            Ok(stream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str) -> SerializedEvent {
        SerializedEvent::new(event_type.to_string(), vec![1, 2], None)
    }

    #[tokio::test]
    async fn records_publishes_per_topic() {
        let bus = InMemoryEventBus::new();
        bus.publish("certifytrack-bookings", &event("BookingApproved.v1"))
            .await
            .unwrap();
        bus.publish("certifytrack-events", &event("EventCompleted.v1"))
            .await
            .unwrap();

        assert_eq!(bus.published().len(), 2);
        assert_eq!(bus.published_on("certifytrack-events").len(), 1);
        assert_eq!(bus.count_of("BookingApproved.v1"), 1);
    }

    #[tokio::test]
    async fn failing_bus_rejects_publish() {
        let bus = InMemoryEventBus::new();
        bus.fail_publishes("broker down");

        let result = bus.publish("certifytrack-bookings", &event("X.v1")).await;
        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn subscribers_receive_events_from_all_their_topics() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus
            .subscribe(&["certifytrack-credits", "certifytrack-certificates"])
            .await
            .unwrap();

        bus.publish("certifytrack-credits", &event("CreditApproved.v1"))
            .await
            .unwrap();
        bus.publish("certifytrack-bookings", &event("BookingRejected.v1"))
            .await
            .unwrap();
        bus.publish("certifytrack-certificates", &event("CertificateIssued.v1"))
            .await
            .unwrap();

        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        let mut types = vec![first.event_type, second.event_type];
        types.sort();
        assert_eq!(types, vec!["CertificateIssued.v1", "CreditApproved.v1"]);
    }

    #[tokio::test]
    async fn subscribing_to_nothing_fails() {
        let bus = InMemoryEventBus::new();
        assert!(bus.subscribe(&[]).await.is_err());
    }
}
