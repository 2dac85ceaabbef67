//! Error taxonomy for workflow operations.
//!
//! Every failure is returned to the caller as a typed [`DomainError`]. None of
//! them is retried inside the engine: each one is either a caller mistake or a
//! business conflict the caller must decide about.

use certifytrack_core::environment::AttendanceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of record an error or audit entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// A bookable hall
    Resource,
    /// A campus event
    Event,
    /// A hall booking
    Booking,
    /// A point-credit transaction
    CreditTransaction,
    /// An issued certificate
    Certificate,
    /// A credit category
    Category,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Resource => "resource",
            Self::Event => "event",
            Self::Booking => "booking",
            Self::CreditTransaction => "credit transaction",
            Self::Certificate => "certificate",
            Self::Category => "credit category",
        };
        f.write_str(label)
    }
}

/// Failures of workflow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input, e.g. a missing or too short reason
    #[error("Validation failed: {0}")]
    Validation(String),

    /// State machine precondition violated
    #[error("Invalid transition: cannot {attempted} {target} in status {from}")]
    InvalidTransition {
        /// Kind of record
        target: TargetType,
        /// Status the record was in
        from: String,
        /// What the caller tried to do
        attempted: String,
    },

    /// Actor lacks authority over the target
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation not allowed yet (or any more)
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Lost a race for a resource interval
    #[error("Resource conflict: {0}")]
    ResourceConflict(String),

    /// Lookup miss
    #[error("{0}")]
    NotFound(String),

    /// A collaborator reported a failure
    #[error("External collaborator failed: {0}")]
    External(String),
}

impl DomainError {
    /// Lookup miss for a known record kind.
    #[must_use]
    pub fn not_found(target: TargetType, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{target} {id} not found"))
    }

    /// The single answer given for any failed certificate verification.
    ///
    /// Carries no detail about why the lookup failed.
    #[must_use]
    pub fn certificate_not_found() -> Self {
        Self::NotFound("certificate not found".to_string())
    }

    /// Illegal state-machine move.
    #[must_use]
    pub fn invalid_transition(
        target: TargetType,
        from: impl fmt::Display,
        attempted: impl Into<String>,
    ) -> Self {
        Self::InvalidTransition {
            target,
            from: from.to_string(),
            attempted: attempted.into(),
        }
    }

    /// Short machine-friendly name of the variant, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Unauthorized(_) => "unauthorized",
            Self::PreconditionFailed(_) => "precondition_failed",
            Self::ResourceConflict(_) => "resource_conflict",
            Self::NotFound(_) => "not_found",
            Self::External(_) => "external",
        }
    }
}

impl From<AttendanceError> for DomainError {
    fn from(error: AttendanceError) -> Self {
        Self::External(error.to_string())
    }
}

/// Result alias for workflow operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;
    use certifytrack_core::ids::EventId;

    #[test]
    fn messages_are_human_readable() {
        let error = DomainError::invalid_transition(TargetType::Booking, "REJECTED", "approve");
        assert_eq!(
            error.to_string(),
            "Invalid transition: cannot approve booking in status REJECTED"
        );

        let event = EventId::new();
        assert_eq!(
            DomainError::not_found(TargetType::Event, event).to_string(),
            format!("event {event} not found")
        );
    }

    #[test]
    fn certificate_misses_are_uniform() {
        assert_eq!(
            DomainError::certificate_not_found(),
            DomainError::certificate_not_found()
        );
        assert_eq!(
            DomainError::certificate_not_found().to_string(),
            "certificate not found"
        );
    }

    #[test]
    fn attendance_failures_pass_through() {
        let error: DomainError = AttendanceError::SourceFailed("sheet unreadable".to_string()).into();
        assert_eq!(error.kind(), "external");
        assert!(error.to_string().contains("sheet unreadable"));
    }
}
