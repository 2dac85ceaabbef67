//! Domain types for campus event coordination.
//!
//! Resources (halls), events, bookings, credit categories and transactions,
//! certificates and audit entries, plus the [`TimeWindow`] value object every
//! scheduling decision is made on.

use crate::error::{DomainError, Result, TargetType};
use certifytrack_core::environment::AttendanceMark;
use certifytrack_core::ids::{
    ActorId, BookingId, CategoryId, CertificateId, CreditTransactionId, EventId, ResourceId,
    SubjectId,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Time windows
// ============================================================================

/// Half-open interval `[date start, end_date end)` a resource is wanted for.
///
/// Without `end_date` the window is a single day and `end` must be after
/// `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First day
    pub date: NaiveDate,
    /// Start time on `date`
    pub start: NaiveTime,
    /// End time on `end_date` (or `date`)
    pub end: NaiveTime,
    /// Last day for multi-day windows
    pub end_date: Option<NaiveDate>,
}

impl TimeWindow {
    /// Single-day window.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `end <= start`.
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        Self::spanning(date, start, None, end)
    }

    /// Window that may run over several days.
    ///
    /// An `end_date` equal to `date` is folded into a single-day window.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the window ends at or before it
    /// starts.
    pub fn spanning(
        date: NaiveDate,
        start: NaiveTime,
        end_date: Option<NaiveDate>,
        end: NaiveTime,
    ) -> Result<Self> {
        let window = Self {
            date,
            start,
            end,
            end_date: end_date.filter(|d| *d != date),
        };
        if window.ends_at() <= window.starts_at() {
            return Err(DomainError::Validation(format!(
                "time window must end after it starts ({window})"
            )));
        }
        Ok(window)
    }

    /// Combined start instant (campus wall clock).
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.start)
    }

    /// Combined end instant (campus wall clock).
    #[must_use]
    pub fn ends_at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.end_date.unwrap_or(self.date), self.end)
    }

    /// Half-open overlap test: `startA < endB && startB < endA`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.starts_at() < other.ends_at() && other.starts_at() < self.ends_at()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end_date {
            Some(end_date) => write!(
                f,
                "{} {}..{} {}",
                self.date,
                self.start.format("%H:%M"),
                end_date,
                self.end.format("%H:%M")
            ),
            None => write!(
                f,
                "{} {}..{}",
                self.date,
                self.start.format("%H:%M"),
                self.end.format("%H:%M")
            ),
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

/// A bookable hall.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier
    pub id: ResourceId,
    /// Short unique code (e.g. "SH-1")
    pub code: String,
    /// Display name
    pub name: String,
    /// Seating capacity
    pub capacity: u32,
    /// Building / floor
    pub location: String,
    /// Withdrawn resources are never offered or reserved
    pub is_available: bool,
}

/// Input for registering a resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewResource {
    /// Short unique code
    pub code: String,
    /// Display name
    pub name: String,
    /// Seating capacity
    pub capacity: u32,
    /// Building / floor
    pub location: String,
}

impl NewResource {
    /// Creates a new `NewResource`
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        capacity: u32,
        location: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            capacity,
            location: location.into(),
        }
    }
}

// ============================================================================
// Approval-managed records
// ============================================================================

/// Status shared by every approval-managed record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Awaiting a decision
    Pending,
    /// Approved (terminal)
    Approved,
    /// Rejected with a reason (terminal)
    Rejected,
    /// Withdrawn by the owning workflow (terminal)
    Cancelled,
}

impl ApprovalStatus {
    /// Whether no further decision can be taken.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Upper-case label used in audit entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reservation of a resource for an event over a window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier
    pub id: BookingId,
    /// Owning event
    pub event_id: EventId,
    /// Reserved resource
    pub resource_id: ResourceId,
    /// Reserved interval
    pub window: TimeWindow,
    /// Current status
    pub status: ApprovalStatus,
    /// Who asked for it (organizer, or the scheduler on their behalf)
    pub requested_by: ActorId,
    /// When it was created
    pub requested_at: DateTime<Utc>,
    /// Who approved, rejected or cancelled it
    pub decided_by: Option<ActorId>,
    /// When that happened
    pub decided_at: Option<DateTime<Utc>>,
    /// Mandatory when rejected, optional when cancelled
    pub rejection_reason: Option<String>,
}

/// A point-award record tied to event participation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction identifier
    pub id: CreditTransactionId,
    /// The participant
    pub subject_id: SubjectId,
    /// The event participated in
    pub event_id: EventId,
    /// Credit category
    pub category_id: CategoryId,
    /// Points awarded on approval
    pub points: u32,
    /// Current status
    pub status: ApprovalStatus,
    /// Code supplied by the approving mentor
    pub verification_code: Option<String>,
    /// Mandatory when rejected
    pub rejection_reason: Option<String>,
    /// Who decided
    pub decided_by: Option<ActorId>,
    /// When
    pub decided_at: Option<DateTime<Utc>>,
    /// When the transaction was opened
    pub created_at: DateTime<Utc>,
    /// Bumped on every write, used for optimistic concurrency
    pub version: u64,
}

/// A category of point credit with optional bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCategory {
    /// Unique category identifier
    pub id: CategoryId,
    /// Display name
    pub name: String,
    /// Smallest award allowed
    pub min_points: Option<u32>,
    /// Largest award allowed
    pub max_points: Option<u32>,
}

impl CreditCategory {
    /// Check an award amount against the bounds.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `points` is zero or outside the
    /// category bounds.
    pub fn check_points(&self, points: u32) -> Result<()> {
        if points == 0 {
            return Err(DomainError::Validation(
                "credit amount must be positive".to_string(),
            ));
        }
        if let Some(min) = self.min_points.filter(|min| points < *min) {
            return Err(DomainError::Validation(format!(
                "{points} points is below the minimum of {min} for '{}'",
                self.name
            )));
        }
        if let Some(max) = self.max_points.filter(|max| points > *max) {
            return Err(DomainError::Validation(format!(
                "{points} points exceeds the maximum of {max} for '{}'",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

/// Event lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    /// Being prepared by the organizer
    Draft,
    /// Date fixed, hall assignment under way
    Scheduled,
    /// Running
    Ongoing,
    /// Finished, attendance recorded (terminal)
    Completed,
    /// Called off (terminal)
    Cancelled,
}

impl EventStatus {
    /// Whether the status can never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the roster may still change.
    #[must_use]
    pub const fn roster_open(self) -> bool {
        matches!(self, Self::Draft | Self::Scheduled)
    }

    /// Upper-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::Ongoing => "ONGOING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credit granted to present participants once the event completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAward {
    /// Category
    pub category_id: CategoryId,
    /// Points per participant
    pub points: u32,
}

/// Organizer-editable event details.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    /// Title
    pub title: String,
    /// Scheduled date
    pub date: Option<NaiveDate>,
    /// Start time
    pub start: Option<NaiveTime>,
    /// End time
    pub end: Option<NaiveTime>,
    /// Last day of a multi-day event
    pub end_date: Option<NaiveDate>,
    /// First-choice hall
    pub primary_resource: Option<ResourceId>,
    /// Fallback hall
    pub secondary_resource: Option<ResourceId>,
}

impl EventDetails {
    /// Details with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the date.
    #[must_use]
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Set start and end times.
    #[must_use]
    pub fn between(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Make the event run until `end_date`.
    #[must_use]
    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Set hall preferences.
    #[must_use]
    pub fn prefer(mut self, primary: ResourceId, secondary: Option<ResourceId>) -> Self {
        self.primary_resource = Some(primary);
        self.secondary_resource = secondary;
        self
    }

    /// Validate what is present.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for an empty title or a window that
    /// ends before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::Validation(
                "event title cannot be empty".to_string(),
            ));
        }
        if self.end_date.is_some() && self.date.is_none() {
            return Err(DomainError::Validation(
                "an end date needs a start date".to_string(),
            ));
        }
        self.window().map(|_| ())
    }

    /// Whether `other` asks for the same date and times.
    #[must_use]
    pub fn same_timing(&self, other: &Self) -> bool {
        self.date == other.date
            && self.start == other.start
            && self.end == other.end
            && self.end_date == other.end_date
    }

    /// The requested window, once date, start and end are all known.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the window is inverted.
    pub fn window(&self) -> Result<Option<TimeWindow>> {
        match (self.date, self.start, self.end) {
            (Some(date), Some(start), Some(end)) => {
                TimeWindow::spanning(date, start, self.end_date, end).map(Some)
            },
            _ => Ok(None),
        }
    }
}

/// Input for creating an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEvent {
    /// Editable details
    pub details: EventDetails,
    /// Optional credit for present participants
    pub credit: Option<CreditAward>,
    /// Optional roster cap
    pub max_participants: Option<u32>,
}

impl NewEvent {
    /// Creates a new `NewEvent` without credit or roster cap.
    #[must_use]
    pub const fn new(details: EventDetails) -> Self {
        Self {
            details,
            credit: None,
            max_participants: None,
        }
    }

    /// Award `points` in `category_id` to every present participant.
    #[must_use]
    pub fn with_credit(mut self, category_id: CategoryId, points: u32) -> Self {
        self.credit = Some(CreditAward {
            category_id,
            points,
        });
        self
    }

    /// Cap the roster.
    #[must_use]
    pub fn with_max_participants(mut self, max: u32) -> Self {
        self.max_participants = Some(max);
        self
    }
}

/// A campus event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier
    pub id: EventId,
    /// Who created it
    pub organizer: ActorId,
    /// Editable details
    pub details: EventDetails,
    /// Current status
    pub status: EventStatus,
    /// Set only while an approved booking backs it
    pub assigned_resource: Option<ResourceId>,
    /// Fixed at creation
    pub credit: Option<CreditAward>,
    /// Roster cap
    pub max_participants: Option<u32>,
    /// Registered participants
    pub roster: BTreeSet<SubjectId>,
    /// Supplied by the attendance source before completion
    pub attendance: Option<Vec<AttendanceMark>>,
    /// Why it was cancelled, if it was
    pub cancellation_reason: Option<String>,
    /// When it was created
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// A fresh DRAFT event.
    #[must_use]
    pub fn draft(organizer: ActorId, new_event: NewEvent, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            organizer,
            details: new_event.details,
            status: EventStatus::Draft,
            assigned_resource: None,
            credit: new_event.credit,
            max_participants: new_event.max_participants,
            roster: BTreeSet::new(),
            attendance: None,
            cancellation_reason: None,
            created_at,
        }
    }

    /// The window the event occupies.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if date, start or end is missing,
    /// or the window is inverted.
    pub fn window(&self) -> Result<TimeWindow> {
        self.details.window()?.ok_or_else(|| {
            DomainError::Validation(format!(
                "event {} needs a date, start and end time to book a hall",
                self.id
            ))
        })
    }

    /// Final mark per subject. A later mark for the same subject replaces an
    /// earlier one, so the attendance source can correct itself.
    fn final_marks(&self) -> BTreeMap<&SubjectId, bool> {
        self.attendance
            .iter()
            .flatten()
            .map(|mark| (&mark.subject_id, mark.present))
            .collect()
    }

    /// Roster members whose final mark is present. Marks for people not on
    /// the roster are ignored.
    #[must_use]
    pub fn present_participants(&self) -> Vec<SubjectId> {
        let marks = self.final_marks();
        self.roster
            .iter()
            .filter(|subject| marks.get(subject).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Whether `subject` is on the roster and its final mark is present.
    #[must_use]
    pub fn attended(&self, subject: &SubjectId) -> bool {
        self.roster.contains(subject) && self.final_marks().get(subject).copied().unwrap_or(false)
    }
}

// ============================================================================
// Certificates
// ============================================================================

/// An issued, hash-verifiable proof of attendance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Unique certificate identifier
    pub id: CertificateId,
    /// Event attended
    pub event_id: EventId,
    /// Participant
    pub subject_id: SubjectId,
    /// Human-readable number, e.g. `CT-2025-3FA4C2D91B`
    pub number: String,
    /// Lower-case SHA-256 hex digest, the public verification key
    pub content_hash: String,
    /// Captured once at first issuance
    pub issued_at: DateTime<Utc>,
    /// Whether it has been revoked
    pub revoked: bool,
    /// Why it was revoked
    pub revocation_reason: Option<String>,
    /// When it was revoked
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Certificate {
    /// Fields safe to show on a public verification page.
    #[must_use]
    pub fn public_view(&self) -> CertificateView {
        CertificateView {
            number: self.number.clone(),
            event_id: self.event_id,
            subject_id: self.subject_id.clone(),
            content_hash: self.content_hash.clone(),
            issued_at: self.issued_at,
            revoked: self.revoked,
        }
    }
}

/// Public fields of a certificate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateView {
    /// Certificate number
    pub number: String,
    /// Event attended
    pub event_id: EventId,
    /// Participant
    pub subject_id: SubjectId,
    /// Verification digest
    pub content_hash: String,
    /// Issue time
    pub issued_at: DateTime<Utc>,
    /// Whether it has been revoked
    pub revoked: bool,
}

// ============================================================================
// Audit
// ============================================================================

/// What happened to an audited record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    /// Record created in its initial status
    Create,
    /// Approved
    Approve,
    /// Rejected
    Reject,
    /// Cancelled by the owning workflow
    Cancel,
    /// Certificate revoked
    Revoke,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
            Self::Revoke => "revoke",
        };
        f.write_str(label)
    }
}

/// Immutable record of a workflow transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier
    pub id: Uuid,
    /// Who did it
    pub actor_id: ActorId,
    /// What was done
    pub action: AuditAction,
    /// Kind of record
    pub target_type: TargetType,
    /// Record identifier
    pub target_id: String,
    /// When
    pub timestamp: DateTime<Utc>,
    /// Status before (absent on creation)
    pub before_status: Option<String>,
    /// Status after
    pub after_status: String,
    /// Reason given, if any
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Creates a new `AuditEntry`
    #[must_use]
    pub fn new(
        actor_id: ActorId,
        action: AuditAction,
        target_type: TargetType,
        target_id: impl fmt::Display,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_id,
            action,
            target_type,
            target_id: target_id.to_string(),
            timestamp,
            before_status: None,
            after_status: String::new(),
            reason: None,
        }
    }

    /// Record the status change.
    #[must_use]
    pub fn with_statuses(mut self, before: Option<&str>, after: &str) -> Self {
        self.before_status = before.map(str::to_string);
        self.after_status = after.to_string();
        self
    }

    /// Attach a reason.
    #[must_use]
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn inverted_single_day_window_is_rejected() {
        assert!(matches!(
            TimeWindow::new(day(1), at(11, 0), at(10, 0)),
            Err(DomainError::Validation(_))
        ));
        assert!(TimeWindow::new(day(1), at(10, 0), at(10, 0)).is_err());
    }

    #[test]
    fn back_to_back_windows_do_not_overlap() {
        let morning = TimeWindow::new(day(1), at(9, 0), at(10, 0)).unwrap();
        let next = TimeWindow::new(day(1), at(10, 0), at(11, 0)).unwrap();
        assert!(!morning.overlaps(&next));
        assert!(!next.overlaps(&morning));
    }

    #[test]
    fn multi_day_window_blocks_the_following_morning() {
        let fest = TimeWindow::spanning(day(1), at(18, 0), Some(day(2)), at(12, 0)).unwrap();
        let seminar = TimeWindow::new(day(2), at(9, 0), at(10, 0)).unwrap();
        let later = TimeWindow::new(day(2), at(12, 0), at(13, 0)).unwrap();
        assert!(fest.overlaps(&seminar));
        assert!(!fest.overlaps(&later));
    }

    #[test]
    fn end_date_equal_to_date_is_single_day() {
        let window = TimeWindow::spanning(day(1), at(9, 0), Some(day(1)), at(10, 0)).unwrap();
        assert_eq!(window.end_date, None);
    }

    #[test]
    fn category_bounds_are_enforced() {
        let category = CreditCategory {
            id: CategoryId::new(),
            name: "Technical Fest".to_string(),
            min_points: Some(5),
            max_points: Some(20),
        };
        assert!(category.check_points(10).is_ok());
        assert!(category.check_points(4).is_err());
        assert!(category.check_points(21).is_err());
        assert!(category.check_points(0).is_err());
    }

    #[test]
    fn only_present_roster_members_count() {
        let mut event = Event::draft(
            ActorId::from("organizer"),
            NewEvent::new(EventDetails::titled("Hackathon")),
            Utc::now(),
        );
        event.roster.insert(SubjectId::from("s1"));
        event.roster.insert(SubjectId::from("s2"));
        event.attendance = Some(vec![
            AttendanceMark::present("s1"),
            AttendanceMark::absent("s2"),
            AttendanceMark::present("walk-in"),
        ]);

        assert_eq!(event.present_participants(), vec![SubjectId::from("s1")]);
        assert!(event.attended(&SubjectId::from("s1")));
        assert!(!event.attended(&SubjectId::from("walk-in")));
    }

    #[test]
    fn later_mark_overrides_earlier_one() {
        let mut event = Event::draft(
            ActorId::from("organizer"),
            NewEvent::new(EventDetails::titled("Hackathon")),
            Utc::now(),
        );
        event.roster.insert(SubjectId::from("s1"));
        event.roster.insert(SubjectId::from("s2"));
        event.attendance = Some(vec![
            AttendanceMark::present("s1"),
            AttendanceMark::absent("s2"),
            AttendanceMark::absent("s1"),
            AttendanceMark::present("s2"),
        ]);

        assert_eq!(event.present_participants(), vec![SubjectId::from("s2")]);
        assert!(!event.attended(&SubjectId::from("s1")));
        assert!(event.attended(&SubjectId::from("s2")));
    }

    proptest! {
        #[test]
        fn overlap_matches_half_open_rule(
            a_start in 0u32..1380, a_len in 1u32..240,
            b_start in 0u32..1380, b_len in 1u32..240,
        ) {
            let minutes = |m: u32| at(m / 60, m % 60);
            let a_end = (a_start + a_len).min(1439);
            let b_end = (b_start + b_len).min(1439);
            prop_assume!(a_end > a_start && b_end > b_start);

            let a = TimeWindow::new(day(1), minutes(a_start), minutes(a_end)).unwrap();
            let b = TimeWindow::new(day(1), minutes(b_start), minutes(b_end)).unwrap();

            prop_assert_eq!(a.overlaps(&b), a_start < b_end && b_start < a_end);
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}
