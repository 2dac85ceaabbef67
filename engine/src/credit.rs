//! Credit ledger: categories and point-credit transactions.
//!
//! Transactions are opened when an event completes, one per present
//! participant, and decided by the participant's mentor through the shared
//! [`ApprovalEngine`].
//!
//! Decisions are optimistic. The engine runs on a snapshot; the write only
//! lands if the stored version is still the one the snapshot was taken at,
//! so at most one of several concurrent callers can decide a transaction.
//! The others fail with [`DomainError::InvalidTransition`].

use crate::approval::{Approvable, ApprovalEngine, ApprovalPolicy, Decision};
use crate::audit::AuditLog;
use crate::error::{DomainError, Result, TargetType};
use crate::metrics;
use crate::types::{
    ApprovalStatus, AuditAction, AuditEntry, CreditAward, CreditCategory, CreditTransaction,
};
use certifytrack_core::environment::{AuthorityProvider, Clock};
use certifytrack_core::ids::{ActorId, CategoryId, CreditTransactionId, EventId, SubjectId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

impl Approvable for CreditTransaction {
    const TARGET: TargetType = TargetType::CreditTransaction;

    fn target_id(&self) -> String {
        self.id.to_string()
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn apply_decision(&mut self, decision: &Decision) {
        self.status = decision.status;
        self.verification_code.clone_from(&decision.code);
        self.rejection_reason.clone_from(&decision.reason);
        self.decided_by = Some(decision.actor.clone());
        self.decided_at = Some(decision.at);
    }
}

/// Mentor authority, plus a recorded participation at approval time.
struct CreditPolicy<'a> {
    authority: &'a dyn AuthorityProvider,
    participant_recorded: bool,
    require_code: bool,
}

impl ApprovalPolicy<CreditTransaction> for CreditPolicy<'_> {
    fn authorize(&self, actor: &ActorId, target: &CreditTransaction) -> Result<()> {
        if self.authority.is_mentor_of(actor, &target.subject_id) {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "only the assigned mentor of {} can decide their points",
                target.subject_id
            )))
        }
    }

    fn check_approve(&self, target: &CreditTransaction) -> Result<()> {
        if self.participant_recorded {
            Ok(())
        } else {
            Err(DomainError::PreconditionFailed(format!(
                "{} is not a recorded participant of event {}",
                target.subject_id, target.event_id
            )))
        }
    }

    fn requires_code(&self) -> bool {
        self.require_code
    }
}

/// Categories and credit transactions.
pub struct CreditLedger {
    engine: ApprovalEngine,
    require_code: bool,
    authority: Arc<dyn AuthorityProvider>,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditLog>,
    categories: RwLock<HashMap<CategoryId, CreditCategory>>,
    transactions: RwLock<HashMap<CreditTransactionId, CreditTransaction>>,
}

impl CreditLedger {
    /// Creates a new `CreditLedger`
    #[must_use]
    pub fn new(
        engine: ApprovalEngine,
        require_code: bool,
        authority: Arc<dyn AuthorityProvider>,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            engine,
            require_code,
            authority,
            clock,
            audit,
            categories: RwLock::new(HashMap::new()),
            transactions: RwLock::new(HashMap::new()),
        }
    }

    /// Add a credit category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] for an empty or duplicate name, or
    /// `min_points > max_points`.
    pub async fn register_category(
        &self,
        name: &str,
        min_points: Option<u32>,
        max_points: Option<u32>,
    ) -> Result<CreditCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }
        if let Some((min, max)) = min_points.zip(max_points).filter(|(min, max)| min > max) {
            return Err(DomainError::Validation(format!(
                "minimum points ({min}) cannot exceed maximum points ({max})"
            )));
        }

        let mut categories = self.categories.write().await;
        if categories.values().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(DomainError::Validation(format!(
                "category '{name}' already exists"
            )));
        }
        let category = CreditCategory {
            id: CategoryId::new(),
            name: name.to_string(),
            min_points,
            max_points,
        };
        categories.insert(category.id, category.clone());
        tracing::info!(category_id = %category.id, name = %category.name, "Credit category registered");
        Ok(category)
    }

    /// Look up a category.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown category.
    pub async fn category(&self, id: CategoryId) -> Result<CreditCategory> {
        self.categories
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(TargetType::Category, id))
    }

    /// Check that an award names a known category and fits its bounds.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown category,
    /// [`DomainError::Validation`] for an out-of-bounds amount.
    pub async fn validate_award(&self, award: &CreditAward) -> Result<()> {
        self.category(award.category_id)
            .await?
            .check_points(award.points)
    }

    /// Open one PENDING transaction per participant.
    ///
    /// A participant who already has a transaction for this event is skipped,
    /// so replaying completion never duplicates credit.
    pub async fn open_for_event(
        &self,
        event_id: EventId,
        award: CreditAward,
        participants: &[SubjectId],
        actor: &ActorId,
    ) -> Vec<CreditTransaction> {
        let now = self.clock.now();
        let mut opened = Vec::with_capacity(participants.len());
        {
            let mut transactions = self.transactions.write().await;
            for subject in participants {
                let exists = transactions
                    .values()
                    .any(|t| t.event_id == event_id && &t.subject_id == subject);
                if exists {
                    tracing::debug!(%event_id, %subject, "Credit transaction already open");
                    continue;
                }
                let transaction = CreditTransaction {
                    id: CreditTransactionId::new(),
                    subject_id: subject.clone(),
                    event_id,
                    category_id: award.category_id,
                    points: award.points,
                    status: ApprovalStatus::Pending,
                    verification_code: None,
                    rejection_reason: None,
                    decided_by: None,
                    decided_at: None,
                    created_at: now,
                    version: 0,
                };
                transactions.insert(transaction.id, transaction.clone());
                opened.push(transaction);
            }
        }

        for transaction in &opened {
            self.audit
                .record(
                    AuditEntry::new(
                        actor.clone(),
                        AuditAction::Create,
                        TargetType::CreditTransaction,
                        transaction.id,
                        now,
                    )
                    .with_statuses(None, ApprovalStatus::Pending.as_str()),
                )
                .await;
            metrics::record_credit(ApprovalStatus::Pending);
        }
        tracing::info!(%event_id, opened = opened.len(), "Credit transactions opened");
        opened
    }

    /// Approve a PENDING transaction.
    ///
    /// `participant_recorded` tells whether the subject is still a present
    /// participant of an existing event.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown transaction
    /// - [`DomainError::InvalidTransition`] unless PENDING, including when a
    ///   concurrent decision landed first
    /// - [`DomainError::Unauthorized`] unless `actor` mentors the subject
    /// - [`DomainError::Validation`] for a malformed or missing code
    /// - [`DomainError::PreconditionFailed`] without a recorded participation
    #[tracing::instrument(skip(self, code))]
    pub async fn approve(
        &self,
        id: CreditTransactionId,
        actor: &ActorId,
        code: Option<&str>,
        participant_recorded: bool,
    ) -> Result<CreditTransaction> {
        let mut candidate = self.transaction(id).await?;
        let seen = candidate.version;
        let policy = CreditPolicy {
            authority: self.authority.as_ref(),
            participant_recorded,
            require_code: self.require_code,
        };
        let entry = self
            .engine
            .approve(&mut candidate, &policy, actor, code, self.clock.now())?;
        let approved = self.store_decision(candidate, seen, entry, "approve").await?;

        metrics::record_credit(ApprovalStatus::Approved);
        tracing::info!(transaction_id = %id, points = approved.points, "Credit approved");
        Ok(approved)
    }

    /// Reject a PENDING transaction.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Validation`] for a missing or short reason
    /// - [`DomainError::NotFound`] for an unknown transaction
    /// - [`DomainError::InvalidTransition`] unless PENDING
    /// - [`DomainError::Unauthorized`] unless `actor` mentors the subject
    #[tracing::instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        id: CreditTransactionId,
        actor: &ActorId,
        reason: &str,
    ) -> Result<CreditTransaction> {
        let mut candidate = self.transaction(id).await?;
        let seen = candidate.version;
        let policy = CreditPolicy {
            authority: self.authority.as_ref(),
            participant_recorded: true,
            require_code: false,
        };
        let entry = self
            .engine
            .reject(&mut candidate, &policy, actor, reason, self.clock.now())?;
        let rejected = self.store_decision(candidate, seen, entry, "reject").await?;

        metrics::record_credit(ApprovalStatus::Rejected);
        tracing::info!(transaction_id = %id, "Credit rejected");
        Ok(rejected)
    }

    async fn store_decision(
        &self,
        mut candidate: CreditTransaction,
        seen: u64,
        entry: AuditEntry,
        attempted: &str,
    ) -> Result<CreditTransaction> {
        {
            let mut transactions = self.transactions.write().await;
            let stored = transactions
                .get_mut(&candidate.id)
                .ok_or_else(|| DomainError::not_found(TargetType::CreditTransaction, candidate.id))?;
            if stored.version != seen {
                tracing::warn!(
                    transaction_id = %candidate.id,
                    status = %stored.status,
                    attempted,
                    "Credit transaction changed underneath the decision"
                );
                return Err(DomainError::invalid_transition(
                    TargetType::CreditTransaction,
                    stored.status,
                    attempted,
                ));
            }
            candidate.version = seen + 1;
            *stored = candidate.clone();
        }
        self.audit.record(entry).await;
        Ok(candidate)
    }

    /// Look up a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown transaction.
    pub async fn transaction(&self, id: CreditTransactionId) -> Result<CreditTransaction> {
        self.transactions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(TargetType::CreditTransaction, id))
    }

    /// Transactions of one event, ordered by subject.
    pub async fn for_event(&self, event_id: EventId) -> Vec<CreditTransaction> {
        let mut found: Vec<CreditTransaction> = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.event_id == event_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        found
    }
}
