//! # CertifyTrack Core
//!
//! Core traits and types shared by the CertifyTrack engine and its test
//! collaborators.
//!
//! The engine coordinates campus events that consume bookable halls and gates
//! certificates and point credit behind the event lifecycle. This crate holds
//! the parts that do not depend on any particular workflow:
//!
//! - **Identifiers**: UUID newtypes for engine records, string newtypes for
//!   externally owned identities ([`ids`])
//! - **Environment**: injected collaborators (clock, authority source,
//!   attendance source) behind traits ([`environment`])
//! - **Reducer**: the fallible `(State, Command, Environment) → Effects`
//!   abstraction used for state machines ([`reducer`])
//! - **Events**: versioned domain events and the bus they are published on
//!   ([`event`], [`event_bus`])
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: reducers decide, callers execute
//! - Effects are values, returned instead of performed
//! - Every collaborator is injected, so tests swap in deterministic doubles

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod event;
pub mod event_bus;
pub mod ids;

/// Reducer module - pure state transitions with explicit failures
///
/// Reducers validate a command against current state, mutate the state in
/// place and return descriptions of the side effects the caller must run.
/// Unlike a fire-and-forget reducer, a CertifyTrack reducer can refuse a
/// command: illegal transitions are returned as typed errors and must leave
/// the state untouched.
pub mod reducer {
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business rules
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The command type this reducer processes
    /// - `Effect`: Side-effect descriptions returned on success
    /// - `Error`: Typed refusal returned when the command is illegal
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```
    /// use certifytrack_core::reducer::Reducer;
    /// use certifytrack_core::{SmallVec, smallvec};
    ///
    /// struct Counter;
    ///
    /// impl Reducer for Counter {
    ///     type State = u32;
    ///     type Action = u32;
    ///     type Effect = String;
    ///     type Error = String;
    ///     type Environment = ();
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut u32,
    ///         action: u32,
    ///         _env: &(),
    ///     ) -> Result<SmallVec<[String; 4]>, String> {
    ///         if action == 0 {
    ///             return Err("nothing to add".to_string());
    ///         }
    ///         *state += action;
    ///         Ok(smallvec![format!("added {action}")])
    ///     }
    /// }
    ///
    /// let mut total = 1;
    /// assert!(Counter.reduce(&mut total, 0, &()).is_err());
    /// assert_eq!(total, 1);
    /// let effects = Counter.reduce(&mut total, 2, &()).unwrap();
    /// assert_eq!(total, 3);
    /// assert_eq!(effects.len(), 1);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The command type this reducer processes
        type Action;

        /// Side-effect descriptions produced by a successful reduction
        type Effect;

        /// Error returned when the command is refused
        type Error;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce a command into state changes and effects
        ///
        /// On success the state has been updated in place and the returned
        /// effects describe what the caller must do next. Most transitions
        /// produce a handful of effects, hence the inline `SmallVec`.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the command is not legal for the current
        /// state. Implementations must not mutate `state` in that case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Self::Effect; 4]>, Self::Error>;
    }
}

/// Environment module - Dependency injection traits
///
/// All external collaborators are abstracted behind traits and injected:
/// time, the identity/authority source and the attendance source.
pub mod environment {
    use crate::ids::{ActorId, EventId, ResourceId, SubjectId};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::future::Future;
    use std::pin::Pin;
    use thiserror::Error;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use certifytrack_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Identity/authority source.
    ///
    /// Authorization policy lives outside the engine. The workflows ask these
    /// questions as pure predicates and never cache the answers.
    pub trait AuthorityProvider: Send + Sync {
        /// May `actor` approve or reject bookings of `resource`?
        fn can_approve_booking(&self, actor: &ActorId, resource: &ResourceId) -> bool;

        /// Is `actor` the mentor of `subject` (credit approval authority)?
        fn is_mentor_of(&self, actor: &ActorId, subject: &SubjectId) -> bool;

        /// May `actor` revoke certificates?
        fn can_manage_certificates(&self, actor: &ActorId) -> bool;
    }

    /// One line of an attendance record.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct AttendanceMark {
        /// The participant
        pub subject_id: SubjectId,
        /// Whether the participant attended
        pub present: bool,
    }

    impl AttendanceMark {
        /// Mark a participant as present.
        #[must_use]
        pub fn present(subject_id: impl Into<SubjectId>) -> Self {
            Self {
                subject_id: subject_id.into(),
                present: true,
            }
        }

        /// Mark a participant as absent.
        #[must_use]
        pub fn absent(subject_id: impl Into<SubjectId>) -> Self {
            Self {
                subject_id: subject_id.into(),
                present: false,
            }
        }
    }

    /// Errors reported by an attendance source.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum AttendanceError {
        /// The source has no attendance for the event yet
        #[error("Attendance not available for event {0}")]
        NotAvailable(EventId),

        /// The source failed to produce a record
        #[error("Attendance source failed: {0}")]
        SourceFailed(String),
    }

    /// Attendance source.
    ///
    /// Supplies the (participant, present) pairs for an event. The list is
    /// consumed as one atomic input; parsing uploads is the source's job.
    pub trait AttendanceSource: Send + Sync {
        /// Fetch the attendance record of an event.
        ///
        /// # Errors
        ///
        /// Returns [`AttendanceError`] if the record is missing or the source
        /// fails.
        fn attendance(
            &self,
            event_id: EventId,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<AttendanceMark>, AttendanceError>> + Send + '_>>;
    }
}
