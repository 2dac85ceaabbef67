//! # CertifyTrack Testing
//!
//! Testing utilities and deterministic collaborators for CertifyTrack.
//!
//! This crate provides:
//! - Mock implementations of the environment traits (clocks, authority
//!   source, attendance source)
//! - An in-memory event bus that records every published notification
//! - A Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```
//! use certifytrack_core::environment::{AttendanceMark, AuthorityProvider};
//! use certifytrack_core::ids::{ActorId, EventId, SubjectId};
//! use certifytrack_testing::{StaticAttendance, StaticAuthority};
//!
//! let authority = StaticAuthority::new().with_mentor("mentor-1", "s-1");
//! assert!(authority.is_mentor_of(&ActorId::from("mentor-1"), &SubjectId::from("s-1")));
//!
//! let attendance = StaticAttendance::new();
//! attendance.set(EventId::new(), vec![AttendanceMark::present("s-1")]);
//! ```

pub mod event_bus;

/// Mock implementations of Environment traits
pub mod mocks {
    #![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for lock poisoning

    use certifytrack_core::environment::{
        AttendanceError, AttendanceMark, AttendanceSource, AuthorityProvider, Clock,
    };
    use certifytrack_core::ids::{ActorId, EventId, ResourceId, SubjectId};
    use chrono::{DateTime, Duration, Utc};
    use std::collections::{HashMap, HashSet};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use certifytrack_testing::mocks::FixedClock;
    /// use certifytrack_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Clock that only moves when the test moves it.
    ///
    /// Clones share the same instant, so a test can keep one handle and give
    /// another to the engine.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a manual clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to an absolute instant
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap() = time;
        }

        /// Move forward by `by`
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap();
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Authority source backed by explicit grants.
    ///
    /// Everything not granted is denied.
    ///
    /// # Example
    ///
    /// ```
    /// use certifytrack_core::environment::AuthorityProvider;
    /// use certifytrack_core::ids::{ActorId, ResourceId};
    /// use certifytrack_testing::StaticAuthority;
    ///
    /// let hall = ResourceId::new();
    /// let authority = StaticAuthority::new().with_resource_approver("coordinator", hall);
    ///
    /// assert!(authority.can_approve_booking(&ActorId::from("coordinator"), &hall));
    /// assert!(!authority.can_approve_booking(&ActorId::from("student"), &hall));
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct StaticAuthority {
        admins: HashSet<ActorId>,
        resource_approvers: HashSet<(ActorId, ResourceId)>,
        mentors: HashSet<(ActorId, SubjectId)>,
        certificate_managers: HashSet<ActorId>,
    }

    impl StaticAuthority {
        /// Create an authority source with no grants
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Grant booking approval on every resource and certificate management
        #[must_use]
        pub fn with_admin(mut self, actor: impl Into<ActorId>) -> Self {
            self.admins.insert(actor.into());
            self
        }

        /// Grant booking approval on one resource
        #[must_use]
        pub fn with_resource_approver(
            mut self,
            actor: impl Into<ActorId>,
            resource: ResourceId,
        ) -> Self {
            self.resource_approvers.insert((actor.into(), resource));
            self
        }

        /// Make `actor` the mentor of `subject`
        #[must_use]
        pub fn with_mentor(mut self, actor: impl Into<ActorId>, subject: impl Into<SubjectId>) -> Self {
            self.mentors.insert((actor.into(), subject.into()));
            self
        }

        /// Grant certificate management only
        #[must_use]
        pub fn with_certificate_manager(mut self, actor: impl Into<ActorId>) -> Self {
            self.certificate_managers.insert(actor.into());
            self
        }
    }

    impl AuthorityProvider for StaticAuthority {
        fn can_approve_booking(&self, actor: &ActorId, resource: &ResourceId) -> bool {
            self.admins.contains(actor)
                || self
                    .resource_approvers
                    .contains(&(actor.clone(), *resource))
        }

        fn is_mentor_of(&self, actor: &ActorId, subject: &SubjectId) -> bool {
            self.mentors.contains(&(actor.clone(), subject.clone()))
        }

        fn can_manage_certificates(&self, actor: &ActorId) -> bool {
            self.admins.contains(actor) || self.certificate_managers.contains(actor)
        }
    }

    /// Attendance source backed by a shared map.
    ///
    /// Events without a record answer [`AttendanceError::NotAvailable`].
    #[derive(Debug, Clone, Default)]
    pub struct StaticAttendance {
        records: Arc<RwLock<HashMap<EventId, Vec<AttendanceMark>>>>,
        failure: Arc<RwLock<Option<String>>>,
    }

    impl StaticAttendance {
        /// Create an empty attendance source
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Store (or replace) the record for an event
        pub fn set(&self, event_id: EventId, marks: Vec<AttendanceMark>) {
            self.records.write().unwrap().insert(event_id, marks);
        }

        /// Make every subsequent fetch fail with `reason`
        pub fn fail_with(&self, reason: impl Into<String>) {
            *self.failure.write().unwrap() = Some(reason.into());
        }
    }

    impl AttendanceSource for StaticAttendance {
        fn attendance(
            &self,
            event_id: EventId,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<AttendanceMark>, AttendanceError>> + Send + '_>>
        {
            Box::pin(async move {
                if let Some(reason) = self.failure.read().unwrap().clone() {
                    return Err(AttendanceError::SourceFailed(reason));
                }
                self.records
                    .read()
                    .unwrap()
                    .get(&event_id)
                    .cloned()
                    .ok_or(AttendanceError::NotAvailable(event_id))
            })
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber once per process.
    ///
    /// Honors `RUST_LOG`, defaulting to `warn`. Output goes through the test
    /// writer so it is captured unless `--nocapture` is given.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

// Re-export commonly used items
pub use event_bus::InMemoryEventBus;
pub use helpers::init_test_tracing;
pub use mocks::{FixedClock, ManualClock, StaticAttendance, StaticAuthority, test_clock};
pub use reducer_test::ReducerTest;

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use certifytrack_core::environment::{
        AttendanceError, AttendanceMark, AttendanceSource, AuthorityProvider, Clock,
    };
    use certifytrack_core::ids::{ActorId, EventId, ResourceId, SubjectId};
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn manual_clock_handles_share_time() {
        let clock = ManualClock::new(test_clock().now());
        let handle = clock.clone();
        handle.advance(Duration::hours(2));
        assert_eq!(clock.now(), test_clock().now() + Duration::hours(2));
    }

    #[test]
    fn static_authority_denies_by_default() {
        let hall = ResourceId::new();
        let authority = StaticAuthority::new()
            .with_admin("admin")
            .with_mentor("mentor", "s-1");

        assert!(authority.can_approve_booking(&ActorId::from("admin"), &hall));
        assert!(authority.can_manage_certificates(&ActorId::from("admin")));
        assert!(!authority.can_approve_booking(&ActorId::from("mentor"), &hall));
        assert!(authority.is_mentor_of(&ActorId::from("mentor"), &SubjectId::from("s-1")));
        assert!(!authority.is_mentor_of(&ActorId::from("mentor"), &SubjectId::from("s-2")));
    }

    #[tokio::test]
    async fn static_attendance_reports_missing_and_failing_sources() {
        let attendance = StaticAttendance::new();
        let event = EventId::new();

        assert_eq!(
            attendance.attendance(event).await,
            Err(AttendanceError::NotAvailable(event))
        );

        attendance.set(event, vec![AttendanceMark::present("s-1")]);
        assert_eq!(attendance.attendance(event).await.unwrap().len(), 1);

        attendance.fail_with("upload unreadable");
        assert!(matches!(
            attendance.attendance(event).await,
            Err(AttendanceError::SourceFailed(_))
        ));
    }
}
