//! Domain notifications published for external subscribers.
//!
//! Notifications are emitted after the state change they describe has been
//! committed. Delivery failures are logged and swallowed: a notifier being
//! down never undoes a booking, a decision or an issued certificate.

use crate::config::TopicConfig;
use crate::types::TimeWindow;
use certifytrack_core::event::{DomainEvent, SerializedEvent};
use certifytrack_core::event_bus::EventBus;
use certifytrack_core::ids::{
    ActorId, BookingId, CertificateId, CreditTransactionId, EventId, ResourceId, SubjectId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Facts the engine announces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CampusNotification {
    /// A PENDING booking was created
    BookingRequested {
        /// Booking
        booking_id: BookingId,
        /// Owning event
        event_id: EventId,
        /// Requested hall
        resource_id: ResourceId,
        /// Requested window
        window: TimeWindow,
    },
    /// A booking was approved and now blocks its window
    BookingApproved {
        /// Booking
        booking_id: BookingId,
        /// Owning event
        event_id: EventId,
        /// Hall
        resource_id: ResourceId,
        /// Approver
        approved_by: ActorId,
    },
    /// A booking was rejected
    BookingRejected {
        /// Booking
        booking_id: BookingId,
        /// Owning event
        event_id: EventId,
        /// Hall
        resource_id: ResourceId,
        /// Why
        reason: String,
    },
    /// An event moved to SCHEDULED
    EventScheduled {
        /// Event
        event_id: EventId,
        /// Title
        title: String,
    },
    /// No preferred hall could be reserved automatically
    ManualBookingRequired {
        /// Event
        event_id: EventId,
        /// What went wrong with each preference
        reason: String,
    },
    /// An event moved to ONGOING
    EventStarted {
        /// Event
        event_id: EventId,
        /// Whether an operator forced the start
        forced: bool,
    },
    /// An event moved to COMPLETED
    EventCompleted {
        /// Event
        event_id: EventId,
        /// Number of present participants
        present: usize,
    },
    /// An event was cancelled
    EventCancelled {
        /// Event
        event_id: EventId,
        /// Why, if given
        reason: Option<String>,
    },
    /// A credit transaction awaits its mentor
    CreditRequested {
        /// Transaction
        transaction_id: CreditTransactionId,
        /// Event attended
        event_id: EventId,
        /// Participant
        subject_id: SubjectId,
        /// Points at stake
        points: u32,
    },
    /// A credit transaction was approved
    CreditApproved {
        /// Transaction
        transaction_id: CreditTransactionId,
        /// Participant
        subject_id: SubjectId,
        /// Points granted
        points: u32,
        /// Mentor
        approved_by: ActorId,
    },
    /// A credit transaction was rejected
    CreditRejected {
        /// Transaction
        transaction_id: CreditTransactionId,
        /// Participant
        subject_id: SubjectId,
        /// Why
        reason: String,
    },
    /// A certificate was issued for the first time
    CertificateIssued {
        /// Certificate
        certificate_id: CertificateId,
        /// Event attended
        event_id: EventId,
        /// Participant
        subject_id: SubjectId,
        /// Human-readable number
        number: String,
        /// Verification digest
        content_hash: String,
    },
    /// A certificate was revoked
    CertificateRevoked {
        /// Human-readable number
        number: String,
        /// Verification digest
        content_hash: String,
        /// Why
        reason: String,
    },
}

/// Which topic a notification goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationArea {
    /// Hall bookings
    Bookings,
    /// Event lifecycle
    Events,
    /// Credit transactions
    Credits,
    /// Certificates
    Certificates,
}

impl CampusNotification {
    /// Topic area of this notification.
    #[must_use]
    pub const fn area(&self) -> NotificationArea {
        match self {
            Self::BookingRequested { .. }
            | Self::BookingApproved { .. }
            | Self::BookingRejected { .. } => NotificationArea::Bookings,
            Self::EventScheduled { .. }
            | Self::ManualBookingRequired { .. }
            | Self::EventStarted { .. }
            | Self::EventCompleted { .. }
            | Self::EventCancelled { .. } => NotificationArea::Events,
            Self::CreditRequested { .. }
            | Self::CreditApproved { .. }
            | Self::CreditRejected { .. } => NotificationArea::Credits,
            Self::CertificateIssued { .. } | Self::CertificateRevoked { .. } => {
                NotificationArea::Certificates
            },
        }
    }

    /// Configured topic name for this notification.
    #[must_use]
    pub fn topic<'a>(&self, topics: &'a TopicConfig) -> &'a str {
        match self.area() {
            NotificationArea::Bookings => &topics.bookings,
            NotificationArea::Events => &topics.events,
            NotificationArea::Credits => &topics.credits,
            NotificationArea::Certificates => &topics.certificates,
        }
    }
}

impl DomainEvent for CampusNotification {
    fn event_type(&self) -> &'static str {
        match self {
            Self::BookingRequested { .. } => "BookingRequested.v1",
            Self::BookingApproved { .. } => "BookingApproved.v1",
            Self::BookingRejected { .. } => "BookingRejected.v1",
            Self::EventScheduled { .. } => "EventScheduled.v1",
            Self::ManualBookingRequired { .. } => "ManualBookingRequired.v1",
            Self::EventStarted { .. } => "EventStarted.v1",
            Self::EventCompleted { .. } => "EventCompleted.v1",
            Self::EventCancelled { .. } => "EventCancelled.v1",
            Self::CreditRequested { .. } => "CreditRequested.v1",
            Self::CreditApproved { .. } => "CreditApproved.v1",
            Self::CreditRejected { .. } => "CreditRejected.v1",
            Self::CertificateIssued { .. } => "CertificateIssued.v1",
            Self::CertificateRevoked { .. } => "CertificateRevoked.v1",
        }
    }
}

/// Publishes notifications to the configured topics.
pub struct Notifier {
    bus: Arc<dyn EventBus>,
    topics: TopicConfig,
}

impl Notifier {
    /// Creates a new `Notifier`
    #[must_use]
    pub fn new(bus: Arc<dyn EventBus>, topics: TopicConfig) -> Self {
        Self { bus, topics }
    }

    /// Publish a notification. Never fails; problems are logged.
    pub async fn emit(&self, notification: CampusNotification) {
        let topic = notification.topic(&self.topics);
        let envelope = match SerializedEvent::from_event(&notification, None) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(
                    event_type = notification.event_type(),
                    %error,
                    "Failed to serialize notification"
                );
                return;
            },
        };

        match self.bus.publish(topic, &envelope).await {
            Ok(()) => tracing::debug!(topic, event_type = %envelope.event_type, "Notification published"),
            Err(error) => tracing::warn!(
                topic,
                event_type = %envelope.event_type,
                %error,
                "Notification delivery failed"
            ),
        }
    }

    /// Publish several notifications in order.
    pub async fn emit_all(&self, notifications: impl IntoIterator<Item = CampusNotification>) {
        for notification in notifications {
            self.emit(notification).await;
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::config::EngineConfig;
    use certifytrack_testing::InMemoryEventBus;

    fn rejected() -> CampusNotification {
        CampusNotification::CreditRejected {
            transaction_id: CreditTransactionId::new(),
            subject_id: SubjectId::from("s1"),
            reason: "insufficient evidence".to_string(),
        }
    }

    #[test]
    fn routes_by_area() {
        let topics = EngineConfig::default().topics;
        assert_eq!(rejected().topic(&topics), "certifytrack-credits");
        let cancelled = CampusNotification::EventCancelled {
            event_id: EventId::new(),
            reason: None,
        };
        assert_eq!(cancelled.topic(&topics), "certifytrack-events");
    }

    #[tokio::test]
    async fn emitted_notifications_decode() {
        let bus = Arc::new(InMemoryEventBus::new());
        let notifier = Notifier::new(bus.clone(), EngineConfig::default().topics);

        notifier.emit(rejected()).await;

        let published = bus.published_on("certifytrack-credits");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "CreditRejected.v1");
        let decoded: CampusNotification = published[0].decode().unwrap();
        assert!(matches!(decoded, CampusNotification::CreditRejected { .. }));
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.fail_publishes("broker down");
        let notifier = Notifier::new(bus.clone(), EngineConfig::default().topics);

        notifier.emit(rejected()).await;
        assert!(bus.published().is_empty());
    }
}
