//! Generic approval state machine.
//!
//! One engine drives every approval-managed record: PENDING moves to APPROVED
//! or REJECTED exactly once, and the owning workflow may withdraw a record to
//! CANCELLED. What differs between bookings and credit transactions is
//! supplied through an [`ApprovalPolicy`]: who may decide, and what must still
//! hold at approval time.
//!
//! The engine is a pure function of its inputs. It mutates the record only
//! when every check has passed and hands back the [`AuditEntry`] describing
//! the transition; storing the record and the entry is the caller's job.
//!
//! ```text
//!            approve            ┌──────────┐
//!        ┌────────────────────► │ APPROVED │ ──┐
//!  ┌─────┴───┐    reject        ├──────────┤   │ cancel
//!  │ PENDING │ ───────────────► │ REJECTED │   │
//!  └─────┬───┘                  └──────────┘   ▼
//!        │          cancel              ┌───────────┐
//!        └────────────────────────────► │ CANCELLED │
//!                                       └───────────┘
//! ```

use crate::config::ApprovalConfig;
use crate::error::{DomainError, Result, TargetType};
use crate::types::{ApprovalStatus, AuditAction, AuditEntry};
use certifytrack_core::ids::ActorId;
use chrono::{DateTime, Utc};

/// A record whose status is governed by the approval engine.
pub trait Approvable {
    /// Kind of record, used in errors and audit entries
    const TARGET: TargetType;

    /// Identifier rendered into audit entries
    fn target_id(&self) -> String;

    /// Current status
    fn status(&self) -> ApprovalStatus;

    /// Record a decision or cancellation.
    fn apply_decision(&mut self, decision: &Decision);
}

/// A transition the engine has validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Resulting status
    pub status: ApprovalStatus,
    /// Who decided
    pub actor: ActorId,
    /// When
    pub at: DateTime<Utc>,
    /// Verification code (approval only)
    pub code: Option<String>,
    /// Reason (rejection, optionally cancellation)
    pub reason: Option<String>,
}

/// Per-use-site rules plugged into the engine.
pub trait ApprovalPolicy<T: Approvable> {
    /// Does `actor` have authority to decide on `target`?
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Unauthorized`] with a readable reason.
    fn authorize(&self, actor: &ActorId, target: &T) -> Result<()>;

    /// Checks that must hold at approval time besides status and authority.
    ///
    /// # Errors
    ///
    /// Returns whatever error describes the violated condition.
    fn check_approve(&self, _target: &T) -> Result<()> {
        Ok(())
    }

    /// Whether approval must carry a verification code.
    fn requires_code(&self) -> bool {
        false
    }
}

/// The shared approval state machine.
#[derive(Clone, Debug)]
pub struct ApprovalEngine {
    min_reason_len: usize,
    code_len: usize,
}

impl ApprovalEngine {
    /// Creates a new `ApprovalEngine`
    #[must_use]
    pub const fn new(min_reason_len: usize, code_len: usize) -> Self {
        Self {
            min_reason_len,
            code_len,
        }
    }

    /// Build from configuration
    #[must_use]
    pub const fn from_config(config: &ApprovalConfig) -> Self {
        Self::new(config.min_reason_len, config.verification_code_len)
    }

    /// Check a rejection or revocation reason and return it trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the trimmed reason is shorter
    /// than the configured minimum.
    pub fn validate_reason(&self, reason: &str) -> Result<String> {
        let trimmed = reason.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation("a reason is required".to_string()));
        }
        if trimmed.chars().count() < self.min_reason_len {
            return Err(DomainError::Validation(format!(
                "reason must be at least {} characters",
                self.min_reason_len
            )));
        }
        Ok(trimmed.to_string())
    }

    /// Check a verification code: exact length, ASCII alphanumeric.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for a malformed code.
    pub fn validate_code(&self, code: &str) -> Result<String> {
        let code = code.trim();
        if code.chars().count() != self.code_len || !code.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DomainError::Validation(format!(
                "verification code must be exactly {} letters or digits",
                self.code_len
            )));
        }
        Ok(code.to_string())
    }

    /// PENDING → APPROVED.
    ///
    /// Checks run in order: status, authority, verification code, policy.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidTransition`] if the record is not PENDING
    /// - [`DomainError::Unauthorized`] if the policy denies `actor`
    /// - [`DomainError::Validation`] for a missing or malformed code
    /// - whatever the policy's approval check reports
    pub fn approve<T, P>(
        &self,
        target: &mut T,
        policy: &P,
        actor: &ActorId,
        code: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry>
    where
        T: Approvable,
        P: ApprovalPolicy<T> + ?Sized,
    {
        Self::ensure_pending(target, "approve")?;
        policy.authorize(actor, target)?;
        let code = match code {
            Some(code) => Some(self.validate_code(code)?),
            None if policy.requires_code() => {
                return Err(DomainError::Validation(
                    "a verification code is required for approval".to_string(),
                ));
            },
            None => None,
        };
        policy.check_approve(target)?;

        let decision = Decision {
            status: ApprovalStatus::Approved,
            actor: actor.clone(),
            at,
            code,
            reason: None,
        };
        Ok(Self::commit(target, &decision, AuditAction::Approve))
    }

    /// PENDING → REJECTED.
    ///
    /// The reason is validated before anything else.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Validation`] for an empty or short reason
    /// - [`DomainError::InvalidTransition`] if the record is not PENDING
    /// - [`DomainError::Unauthorized`] if the policy denies `actor`
    pub fn reject<T, P>(
        &self,
        target: &mut T,
        policy: &P,
        actor: &ActorId,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry>
    where
        T: Approvable,
        P: ApprovalPolicy<T> + ?Sized,
    {
        let reason = self.validate_reason(reason)?;
        Self::ensure_pending(target, "reject")?;
        policy.authorize(actor, target)?;

        let decision = Decision {
            status: ApprovalStatus::Rejected,
            actor: actor.clone(),
            at,
            code: None,
            reason: Some(reason),
        };
        Ok(Self::commit(target, &decision, AuditAction::Reject))
    }

    /// PENDING or APPROVED → CANCELLED, driven by the owning workflow.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTransition`] if the record is already
    /// REJECTED or CANCELLED.
    pub fn cancel<T: Approvable>(
        &self,
        target: &mut T,
        actor: &ActorId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AuditEntry> {
        match target.status() {
            ApprovalStatus::Pending | ApprovalStatus::Approved => {},
            status => return Err(DomainError::invalid_transition(T::TARGET, status, "cancel")),
        }
        let decision = Decision {
            status: ApprovalStatus::Cancelled,
            actor: actor.clone(),
            at,
            code: None,
            reason,
        };
        Ok(Self::commit(target, &decision, AuditAction::Cancel))
    }

    fn ensure_pending<T: Approvable>(target: &T, attempted: &str) -> Result<()> {
        let status = target.status();
        if status == ApprovalStatus::Pending {
            Ok(())
        } else {
            tracing::warn!(
                target_type = %T::TARGET,
                target_id = %target.target_id(),
                status = %status,
                attempted,
                "Rejected approval transition"
            );
            Err(DomainError::invalid_transition(T::TARGET, status, attempted))
        }
    }

    fn commit<T: Approvable>(target: &mut T, decision: &Decision, action: AuditAction) -> AuditEntry {
        let before = target.status();
        target.apply_decision(decision);
        AuditEntry::new(
            decision.actor.clone(),
            action,
            T::TARGET,
            target.target_id(),
            decision.at,
        )
        .with_statuses(Some(before.as_str()), decision.status.as_str())
        .with_reason(decision.reason.clone())
    }
}
