//! Append-only audit trail.
//!
//! Every booking and credit transaction transition, and every certificate
//! revocation, appends one [`AuditEntry`]. Entries are never mutated or
//! removed; readers get clones.
//!
//! # Example
//!
//! ```
//! use certifytrack_core::ids::{ActorId, BookingId};
//! use certifytrack_engine::audit::{AuditFilter, AuditLog};
//! use certifytrack_engine::error::TargetType;
//! use certifytrack_engine::types::{AuditAction, AuditEntry};
//! use chrono::Utc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let log = AuditLog::new();
//! let booking = BookingId::new();
//! log.record(
//!     AuditEntry::new(ActorId::from("admin"), AuditAction::Approve, TargetType::Booking, booking, Utc::now())
//!         .with_statuses(Some("PENDING"), "APPROVED"),
//! )
//! .await;
//!
//! let approvals = log.query(&AuditFilter::new().action(AuditAction::Approve)).await;
//! assert_eq!(approvals.len(), 1);
//! # }
//! ```

use crate::error::TargetType;
use crate::types::{AuditAction, AuditEntry};
use certifytrack_core::ids::ActorId;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Audit entry filter for queries
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by target type
    pub target_type: Option<TargetType>,
    /// Filter by target identifier
    pub target_id: Option<String>,
    /// Filter by actor
    pub actor: Option<ActorId>,
    /// Filter by action
    pub action: Option<AuditAction>,
    /// Filter by time range (inclusive start)
    pub start_time: Option<DateTime<Utc>>,
    /// Filter by time range (exclusive end)
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum results
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Create a new empty filter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target_type: None,
            target_id: None,
            actor: None,
            action: None,
            start_time: None,
            end_time: None,
            limit: None,
        }
    }

    /// Filter by target type
    #[must_use]
    pub const fn target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    /// Filter by one record
    #[must_use]
    pub fn target(mut self, target_type: TargetType, target_id: impl ToString) -> Self {
        self.target_type = Some(target_type);
        self.target_id = Some(target_id.to_string());
        self
    }

    /// Filter by actor
    #[must_use]
    pub fn actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Filter by action
    #[must_use]
    pub const fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Keep entries with `start <= timestamp < end`
    #[must_use]
    pub const fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    /// Set result limit
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if an entry matches the filter
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if self
            .target_type
            .is_some_and(|target_type| entry.target_type != target_type)
        {
            return false;
        }
        if self
            .target_id
            .as_ref()
            .is_some_and(|target_id| &entry.target_id != target_id)
        {
            return false;
        }
        if self.actor.as_ref().is_some_and(|actor| &entry.actor_id != actor) {
            return false;
        }
        if self.action.is_some_and(|action| entry.action != action) {
            return false;
        }
        if self.start_time.is_some_and(|start| entry.timestamp < start) {
            return false;
        }
        if self.end_time.is_some_and(|end| entry.timestamp >= end) {
            return false;
        }
        true
    }
}

/// In-memory, append-only audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Create an empty log
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub async fn record(&self, entry: AuditEntry) {
        tracing::debug!(
            actor = %entry.actor_id,
            action = %entry.action,
            target_type = %entry.target_type,
            target_id = %entry.target_id,
            after = %entry.after_status,
            "Audit entry appended"
        );
        self.entries.write().await.push(entry);
    }

    /// Entries for one record, oldest first.
    pub async fn for_target(&self, target_type: TargetType, target_id: &str) -> Vec<AuditEntry> {
        self.query(&AuditFilter::new().target(target_type, target_id))
            .await
    }

    /// Entries written by one actor, oldest first.
    pub async fn by_actor(&self, actor: &ActorId) -> Vec<AuditEntry> {
        self.query(&AuditFilter::new().actor(actor.clone())).await
    }

    /// Entries matching `filter`, oldest first.
    pub async fn query(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        let matching = entries.iter().filter(|entry| filter.matches(entry)).cloned();
        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certifytrack_core::ids::{BookingId, CreditTransactionId};
    use chrono::Duration;

    fn entry(
        actor: &str,
        action: AuditAction,
        target_type: TargetType,
        target: impl std::fmt::Display,
        at: DateTime<Utc>,
    ) -> AuditEntry {
        AuditEntry::new(ActorId::from(actor), action, target_type, target, at)
            .with_statuses(Some("PENDING"), "APPROVED")
    }

    #[tokio::test]
    async fn filters_by_target_actor_action_and_time() {
        let log = AuditLog::new();
        let now = Utc::now();
        let booking = BookingId::new();
        let credit = CreditTransactionId::new();

        log.record(entry("admin", AuditAction::Approve, TargetType::Booking, booking, now))
            .await;
        log.record(entry(
            "mentor",
            AuditAction::Reject,
            TargetType::CreditTransaction,
            credit,
            now + Duration::minutes(5),
        ))
        .await;
        log.record(entry(
            "admin",
            AuditAction::Cancel,
            TargetType::Booking,
            booking,
            now + Duration::minutes(10),
        ))
        .await;

        assert_eq!(log.len().await, 3);
        assert_eq!(
            log.for_target(TargetType::Booking, &booking.to_string())
                .await
                .len(),
            2
        );
        assert_eq!(log.by_actor(&ActorId::from("mentor")).await.len(), 1);
        assert_eq!(
            log.query(&AuditFilter::new().action(AuditAction::Cancel))
                .await
                .len(),
            1
        );

        let window = AuditFilter::new().between(now, now + Duration::minutes(10));
        assert_eq!(log.query(&window).await.len(), 2);
        assert_eq!(log.query(&AuditFilter::new().limit(1)).await.len(), 1);
    }

    #[tokio::test]
    async fn entries_come_back_in_append_order() {
        let log = AuditLog::new();
        let booking = BookingId::new();
        let now = Utc::now();
        log.record(entry("a", AuditAction::Create, TargetType::Booking, booking, now))
            .await;
        log.record(entry("b", AuditAction::Approve, TargetType::Booking, booking, now))
            .await;

        let trail = log.for_target(TargetType::Booking, &booking.to_string()).await;
        let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::Create, AuditAction::Approve]);
    }
}
