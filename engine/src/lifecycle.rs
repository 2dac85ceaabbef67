//! Event lifecycle as a reducer over an explicit transition table.
//!
//! ```text
//! DRAFT ──schedule──► SCHEDULED ──start──► ONGOING ──complete──► COMPLETED
//!   │                     │                   │
//!   └───────cancel────────┴───────cancel──────┴──────────────► CANCELLED
//! ```
//!
//! The reducer only decides. It checks the table and the guard of the
//! command, moves the status and returns the side effects to run; the
//! coordinator runs them. A refused command leaves the event untouched.

use crate::error::{DomainError, TargetType};
use crate::notifications::CampusNotification;
use crate::types::{CreditAward, Event, EventStatus};
use certifytrack_core::environment::Clock;
use certifytrack_core::ids::SubjectId;
use certifytrack_core::reducer::Reducer;
use certifytrack_core::{SmallVec, smallvec};
use chrono::{FixedOffset, NaiveDateTime};
use std::fmt;
use std::sync::Arc;

/// Commands that move an event through its lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// DRAFT → SCHEDULED
    Schedule,
    /// SCHEDULED → ONGOING
    Start {
        /// Skip the start-time guard
        forced: bool,
    },
    /// ONGOING → COMPLETED
    Complete,
    /// Any non-terminal status → CANCELLED
    Cancel {
        /// Why, if given
        reason: Option<String>,
    },
}

/// Payload-free command tag used by the transition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// See [`LifecycleCommand::Schedule`]
    Schedule,
    /// See [`LifecycleCommand::Start`]
    Start,
    /// See [`LifecycleCommand::Complete`]
    Complete,
    /// See [`LifecycleCommand::Cancel`]
    Cancel,
}

impl CommandKind {
    /// Verb used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "schedule",
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LifecycleCommand {
    /// Table key of this command.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Schedule => CommandKind::Schedule,
            Self::Start { .. } => CommandKind::Start,
            Self::Complete => CommandKind::Complete,
            Self::Cancel { .. } => CommandKind::Cancel,
        }
    }
}

/// Every legal move. Anything not listed is an invalid transition.
pub const TRANSITIONS: &[(EventStatus, CommandKind, EventStatus)] = &[
    (EventStatus::Draft, CommandKind::Schedule, EventStatus::Scheduled),
    (EventStatus::Scheduled, CommandKind::Start, EventStatus::Ongoing),
    (EventStatus::Ongoing, CommandKind::Complete, EventStatus::Completed),
    (EventStatus::Draft, CommandKind::Cancel, EventStatus::Cancelled),
    (EventStatus::Scheduled, CommandKind::Cancel, EventStatus::Cancelled),
    (EventStatus::Ongoing, CommandKind::Cancel, EventStatus::Cancelled),
];

/// Look up the status `command` leads to from `from`.
#[must_use]
pub fn next_status(from: EventStatus, command: CommandKind) -> Option<EventStatus> {
    TRANSITIONS
        .iter()
        .find(|(source, kind, _)| *source == from && *kind == command)
        .map(|(_, _, target)| *target)
}

/// Side effects the coordinator runs after a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEffect {
    /// Try the preferred halls in order
    AutoAssignResource,
    /// Cancel the event's PENDING or APPROVED booking
    ReleaseBookings {
        /// Recorded on the cancelled booking
        reason: Option<String>,
    },
    /// Issue a certificate to each present participant
    IssueCertificates {
        /// Present roster members
        participants: Vec<SubjectId>,
    },
    /// Open one PENDING credit transaction per present participant
    OpenCreditTransactions {
        /// The event's credit
        award: CreditAward,
        /// Present roster members
        participants: Vec<SubjectId>,
    },
    /// Publish a notification
    Notify(CampusNotification),
}

/// What the lifecycle reducer needs from the outside world.
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Current time
    pub clock: Arc<dyn Clock>,
    /// Campus wall-clock offset event times are expressed in
    pub campus_offset: FixedOffset,
}

impl LifecycleEnvironment {
    /// Creates a new `LifecycleEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, campus_offset: FixedOffset) -> Self {
        Self {
            clock,
            campus_offset,
        }
    }

    fn local_now(&self) -> NaiveDateTime {
        self.clock
            .now()
            .with_timezone(&self.campus_offset)
            .naive_local()
    }
}

/// Event lifecycle reducer.
#[derive(Clone, Copy, Debug, Default)]
pub struct LifecycleReducer;

impl LifecycleReducer {
    fn check_schedulable(event: &Event) -> Result<(), DomainError> {
        let details = &event.details;
        let mut missing = Vec::new();
        if details.title.trim().is_empty() {
            missing.push("title");
        }
        if details.date.is_none() {
            missing.push("date");
        }
        if details.start.is_none() {
            missing.push("start time");
        }
        if !missing.is_empty() {
            return Err(DomainError::Validation(format!(
                "event {} cannot be scheduled without: {}",
                event.id,
                missing.join(", ")
            )));
        }
        details.validate()
    }

    fn check_started(event: &Event, env: &LifecycleEnvironment) -> Result<(), DomainError> {
        let (Some(date), Some(start)) = (event.details.date, event.details.start) else {
            return Err(DomainError::Validation(format!(
                "event {} has no start date and time",
                event.id
            )));
        };
        let starts_at = NaiveDateTime::new(date, start);
        if env.local_now() < starts_at {
            return Err(DomainError::PreconditionFailed(format!(
                "event {} starts at {starts_at}; it cannot begin earlier unless forced",
                event.id
            )));
        }
        Ok(())
    }
}

impl Reducer for LifecycleReducer {
    type State = Event;
    type Action = LifecycleCommand;
    type Effect = LifecycleEffect;
    type Error = DomainError;
    type Environment = LifecycleEnvironment;

    fn reduce(
        &self,
        event: &mut Event,
        command: LifecycleCommand,
        env: &LifecycleEnvironment,
    ) -> Result<SmallVec<[LifecycleEffect; 4]>, DomainError> {
        let kind = command.kind();
        let Some(next) = next_status(event.status, kind) else {
            tracing::warn!(
                event_id = %event.id,
                status = %event.status,
                command = %kind,
                "Rejected lifecycle transition"
            );
            return Err(DomainError::invalid_transition(
                TargetType::Event,
                event.status,
                kind.as_str(),
            ));
        };

        let effects: SmallVec<[LifecycleEffect; 4]> = match command {
            LifecycleCommand::Schedule => {
                Self::check_schedulable(event)?;
                smallvec![
                    LifecycleEffect::AutoAssignResource,
                    LifecycleEffect::Notify(CampusNotification::EventScheduled {
                        event_id: event.id,
                        title: event.details.title.clone(),
                    }),
                ]
            },
            LifecycleCommand::Start { forced } => {
                if !forced {
                    Self::check_started(event, env)?;
                }
                smallvec![LifecycleEffect::Notify(CampusNotification::EventStarted {
                    event_id: event.id,
                    forced,
                })]
            },
            LifecycleCommand::Complete => {
                if event.attendance.is_none() {
                    return Err(DomainError::PreconditionFailed(format!(
                        "event {} has no attendance record yet",
                        event.id
                    )));
                }
                let participants = event.present_participants();
                let mut effects: SmallVec<[LifecycleEffect; 4]> = SmallVec::new();
                effects.push(LifecycleEffect::Notify(CampusNotification::EventCompleted {
                    event_id: event.id,
                    present: participants.len(),
                }));
                if let Some(award) = event.credit {
                    effects.push(LifecycleEffect::OpenCreditTransactions {
                        award,
                        participants: participants.clone(),
                    });
                }
                effects.push(LifecycleEffect::IssueCertificates { participants });
                effects
            },
            LifecycleCommand::Cancel { reason } => {
                event.cancellation_reason.clone_from(&reason);
                smallvec![
                    LifecycleEffect::ReleaseBookings {
                        reason: reason.clone()
                    },
                    LifecycleEffect::Notify(CampusNotification::EventCancelled {
                        event_id: event.id,
                        reason,
                    }),
                ]
            },
        };

        tracing::debug!(event_id = %event.id, from = %event.status, to = %next, "Lifecycle transition");
        event.status = next;
        Ok(effects)
    }
}
