//! Campus coordinator: the single entry point callers talk to.
//!
//! Owns the events and wires the components together. Every lifecycle
//! command goes through [`LifecycleReducer`]; the effects it returns are run
//! here while the event's lock is still held, so a cancellation cannot
//! interleave with an auto-assignment or a manual booking request for the
//! same event.
//!
//! ```text
//!               ┌──────────────────────┐
//!   caller ───► │  CampusCoordinator   │ ──► Notifier ──► EventBus
//!               └──┬───────┬───────┬───┘
//!                  │       │       │
//!        IntervalScheduler │  CertificateRegistry
//!                  │  CreditLedger │
//!                  └───────┴───────┴──► AuditLog
//! ```

use crate::audit::{AuditFilter, AuditLog};
use crate::catalog::ResourceCatalog;
use crate::certificate::CertificateRegistry;
use crate::config::{ConfigError, EngineConfig};
use crate::credit::CreditLedger;
use crate::approval::ApprovalEngine;
use crate::error::{DomainError, Result, TargetType};
use crate::lifecycle::{LifecycleCommand, LifecycleEffect, LifecycleEnvironment, LifecycleReducer};
use crate::metrics;
use crate::notifications::{CampusNotification, Notifier};
use crate::scheduler::{Assignment, IntervalScheduler};
use crate::types::{
    AuditEntry, Booking, Certificate, CertificateView, CreditCategory, CreditTransaction, Event,
    EventDetails, EventStatus, NewEvent, NewResource, Resource, TimeWindow,
};
use certifytrack_core::environment::{AttendanceSource, AuthorityProvider, Clock};
use certifytrack_core::event_bus::EventBus;
use certifytrack_core::ids::{ActorId, BookingId, CreditTransactionId, EventId, ResourceId, SubjectId};
use certifytrack_core::reducer::Reducer;
use certifytrack_core::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// External collaborators of the coordinator.
#[derive(Clone)]
pub struct CoordinatorEnvironment {
    /// Current time
    pub clock: Arc<dyn Clock>,
    /// Identity/authority source
    pub authority: Arc<dyn AuthorityProvider>,
    /// Attendance source
    pub attendance: Arc<dyn AttendanceSource>,
    /// Where notifications go
    pub event_bus: Arc<dyn EventBus>,
}

/// Result of scheduling an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulingReport {
    /// The event, now SCHEDULED
    pub event: Event,
    /// What happened with the hall
    pub assignment: Assignment,
}

/// Result of completing an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionReport {
    /// The event, now COMPLETED
    pub event: Event,
    /// Certificates of the present participants
    pub certificates: Vec<Certificate>,
    /// PENDING credit transactions opened by the completion
    pub credit_transactions: Vec<CreditTransaction>,
}

#[derive(Default)]
struct Applied {
    assignment: Option<Assignment>,
    certificates: Vec<Certificate>,
    credit_transactions: Vec<CreditTransaction>,
}

/// Facade over catalog, scheduler, lifecycle, credit, certificates and audit.
pub struct CampusCoordinator {
    catalog: Arc<ResourceCatalog>,
    scheduler: IntervalScheduler,
    credits: CreditLedger,
    certificates: CertificateRegistry,
    audit: Arc<AuditLog>,
    notifier: Notifier,
    attendance: Arc<dyn AttendanceSource>,
    clock: Arc<dyn Clock>,
    lifecycle: LifecycleEnvironment,
    events: RwLock<HashMap<EventId, Arc<Mutex<Event>>>>,
}

impl CampusCoordinator {
    /// Build a coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` does not validate.
    pub fn new(config: &EngineConfig, env: CoordinatorEnvironment) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let engine = ApprovalEngine::from_config(&config.approval);
        let catalog = Arc::new(ResourceCatalog::new());
        let audit = Arc::new(AuditLog::new());
        let scheduler = IntervalScheduler::new(
            Arc::clone(&catalog),
            engine.clone(),
            Arc::clone(&env.authority),
            Arc::clone(&env.clock),
            Arc::clone(&audit),
        );
        let credits = CreditLedger::new(
            engine.clone(),
            config.approval.require_verification_code,
            Arc::clone(&env.authority),
            Arc::clone(&env.clock),
            Arc::clone(&audit),
        );
        let certificates = CertificateRegistry::new(
            config.certificates.salt.clone(),
            config.certificates.number_prefix.clone(),
            engine,
            Arc::clone(&env.authority),
            Arc::clone(&env.clock),
            Arc::clone(&audit),
        );

        tracing::info!(
            utc_offset_minutes = config.utc_offset_minutes,
            require_code = config.approval.require_verification_code,
            "Campus coordinator ready"
        );

        Ok(Self {
            catalog,
            scheduler,
            credits,
            certificates,
            audit,
            notifier: Notifier::new(env.event_bus, config.topics.clone()),
            attendance: env.attendance,
            lifecycle: LifecycleEnvironment::new(Arc::clone(&env.clock), config.campus_offset()),
            clock: env.clock,
            events: RwLock::new(HashMap::new()),
        })
    }

    async fn handle(&self, event_id: EventId) -> Result<Arc<Mutex<Event>>> {
        self.events
            .read()
            .await
            .get(&event_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(TargetType::Event, event_id))
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    /// Register a hall.
    ///
    /// # Errors
    ///
    /// See [`ResourceCatalog::register`].
    pub async fn register_resource(&self, resource: NewResource) -> Result<Resource> {
        self.catalog.register(resource).await
    }

    /// Take a hall out of service. Existing bookings are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown hall.
    pub async fn withdraw_resource(&self, resource_id: ResourceId) -> Result<Resource> {
        self.catalog.withdraw(resource_id).await
    }

    /// Put a hall back into service.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown hall.
    pub async fn restore_resource(&self, resource_id: ResourceId) -> Result<Resource> {
        self.catalog.restore(resource_id).await
    }

    /// Register a credit category.
    ///
    /// # Errors
    ///
    /// See [`CreditLedger::register_category`].
    pub async fn register_category(
        &self,
        name: &str,
        min_points: Option<u32>,
        max_points: Option<u32>,
    ) -> Result<CreditCategory> {
        self.credits.register_category(name, min_points, max_points).await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Create a DRAFT event.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Validation`] for an empty title, an inverted window,
    ///   a zero roster cap or credit outside its category bounds
    /// - [`DomainError::NotFound`] for an unknown credit category
    #[tracing::instrument(skip(self, new_event), fields(title = %new_event.details.title))]
    pub async fn create_event(&self, organizer: &ActorId, new_event: NewEvent) -> Result<Event> {
        new_event.details.validate()?;
        if new_event.max_participants == Some(0) {
            return Err(DomainError::Validation(
                "participant cap must be at least 1".to_string(),
            ));
        }
        if let Some(award) = &new_event.credit {
            self.credits.validate_award(award).await?;
        }

        let event = Event::draft(organizer.clone(), new_event, self.clock.now());
        self.events
            .write()
            .await
            .insert(event.id, Arc::new(Mutex::new(event.clone())));

        metrics::record_event(EventStatus::Draft);
        tracing::info!(event_id = %event.id, "Event created");
        Ok(event)
    }

    /// Replace the editable details of a DRAFT event.
    ///
    /// Date and times are frozen while the event holds a PENDING or APPROVED
    /// booking; reject or cancel the booking first.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::PreconditionFailed`] unless DRAFT, or when the timing
    ///   changes while a booking is active
    /// - [`DomainError::Validation`] for invalid details
    pub async fn update_event_details(&self, event_id: EventId, details: EventDetails) -> Result<Event> {
        let handle = self.handle(event_id).await?;
        let mut event = handle.lock().await;
        if event.status != EventStatus::Draft {
            return Err(DomainError::PreconditionFailed(format!(
                "event {event_id} is {}; details can only change while DRAFT",
                event.status
            )));
        }
        details.validate()?;
        let holding = if details.same_timing(&event.details) {
            None
        } else {
            self.scheduler.active_booking(event_id).await
        };
        if let Some(booking) = holding {
            tracing::warn!(%event_id, booking_id = %booking.id, "Timing change refused while booked");
            return Err(DomainError::PreconditionFailed(format!(
                "event {event_id} holds {} booking {} for {}; its timing cannot change",
                booking.status, booking.id, booking.window
            )));
        }
        event.details = details;
        tracing::info!(%event_id, "Event details updated");
        Ok(event.clone())
    }

    /// Add a participant to the roster. Adding someone twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::PreconditionFailed`] once the event has started, or
    ///   when the roster is full
    pub async fn add_participant(&self, event_id: EventId, subject: SubjectId) -> Result<Event> {
        let handle = self.handle(event_id).await?;
        let mut event = handle.lock().await;
        Self::ensure_roster_open(&event)?;
        if event.roster.contains(&subject) {
            return Ok(event.clone());
        }
        let taken = event.roster.len();
        if let Some(max) = event.max_participants.filter(|max| taken >= *max as usize) {
            return Err(DomainError::PreconditionFailed(format!(
                "event {event_id} is full ({max} participants)"
            )));
        }
        tracing::debug!(%event_id, %subject, "Participant added");
        event.roster.insert(subject);
        Ok(event.clone())
    }

    /// Remove a participant from the roster.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::PreconditionFailed`] once the event has started
    pub async fn remove_participant(&self, event_id: EventId, subject: &SubjectId) -> Result<Event> {
        let handle = self.handle(event_id).await?;
        let mut event = handle.lock().await;
        Self::ensure_roster_open(&event)?;
        if event.roster.remove(subject) {
            tracing::debug!(%event_id, %subject, "Participant removed");
        }
        Ok(event.clone())
    }

    fn ensure_roster_open(event: &Event) -> Result<()> {
        if event.status.roster_open() {
            Ok(())
        } else {
            Err(DomainError::PreconditionFailed(format!(
                "roster of event {} is closed ({})",
                event.id, event.status
            )))
        }
    }

    /// DRAFT → SCHEDULED, then try to reserve a preferred hall.
    ///
    /// Failing to reserve a hall does not fail the transition; it shows up
    /// as [`Assignment::ManualBookingRequired`].
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::InvalidTransition`] unless DRAFT
    /// - [`DomainError::Validation`] without title, date or start time
    pub async fn schedule_event(&self, actor: &ActorId, event_id: EventId) -> Result<SchedulingReport> {
        let (event, applied) = self.apply(actor, event_id, LifecycleCommand::Schedule).await?;
        let assignment = applied
            .assignment
            .unwrap_or_else(|| Assignment::ManualBookingRequired {
                reason: "auto-assignment did not run".to_string(),
            });
        Ok(SchedulingReport { event, assignment })
    }

    /// SCHEDULED → ONGOING.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::InvalidTransition`] unless SCHEDULED
    /// - [`DomainError::PreconditionFailed`] before the start time unless
    ///   `forced`
    pub async fn start_event(&self, actor: &ActorId, event_id: EventId, forced: bool) -> Result<Event> {
        self.apply(actor, event_id, LifecycleCommand::Start { forced })
            .await
            .map(|(event, _)| event)
    }

    /// Pull the attendance record of an ONGOING event from the attendance
    /// source. A later call replaces the earlier record.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::PreconditionFailed`] unless ONGOING
    /// - [`DomainError::External`] if the source fails
    #[tracing::instrument(skip(self))]
    pub async fn record_attendance(&self, event_id: EventId) -> Result<Event> {
        let handle = self.handle(event_id).await?;
        Self::ensure_ongoing(&*handle.lock().await)?;

        let marks = self.attendance.attendance(event_id).await.inspect_err(|error| {
            tracing::warn!(%event_id, %error, "Attendance source failed");
        })?;

        let mut event = handle.lock().await;
        Self::ensure_ongoing(&event)?;
        tracing::info!(%event_id, marks = marks.len(), "Attendance recorded");
        event.attendance = Some(marks);
        Ok(event.clone())
    }

    fn ensure_ongoing(event: &Event) -> Result<()> {
        if event.status == EventStatus::Ongoing {
            Ok(())
        } else {
            Err(DomainError::PreconditionFailed(format!(
                "attendance can only be recorded while event {} is ONGOING (it is {})",
                event.id, event.status
            )))
        }
    }

    /// ONGOING → COMPLETED, then issue certificates and open credit for every
    /// present participant.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::InvalidTransition`] unless ONGOING
    /// - [`DomainError::PreconditionFailed`] without an attendance record
    pub async fn complete_event(&self, actor: &ActorId, event_id: EventId) -> Result<CompletionReport> {
        let (event, applied) = self.apply(actor, event_id, LifecycleCommand::Complete).await?;
        Ok(CompletionReport {
            event,
            certificates: applied.certificates,
            credit_transactions: applied.credit_transactions,
        })
    }

    /// Any non-terminal status → CANCELLED. The event's booking is cancelled
    /// and its hall freed.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::InvalidTransition`] from COMPLETED or CANCELLED
    pub async fn cancel_event(
        &self,
        actor: &ActorId,
        event_id: EventId,
        reason: Option<String>,
    ) -> Result<Event> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.apply(actor, event_id, LifecycleCommand::Cancel { reason })
            .await
            .map(|(event, _)| event)
    }

    /// Look up an event.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown event.
    pub async fn event(&self, event_id: EventId) -> Result<Event> {
        let handle = self.handle(event_id).await?;
        let event = handle.lock().await;
        Ok(event.clone())
    }

    #[tracing::instrument(skip(self, command), fields(command = %command.kind()))]
    async fn apply(
        &self,
        actor: &ActorId,
        event_id: EventId,
        command: LifecycleCommand,
    ) -> Result<(Event, Applied)> {
        let handle = self.handle(event_id).await?;
        let mut event = handle.lock().await;
        let from = event.status;

        let effects = LifecycleReducer.reduce(&mut event, command, &self.lifecycle)?;
        metrics::record_event(event.status);
        tracing::info!(%event_id, %from, to = %event.status, "Event transitioned");

        let applied = self.run_effects(actor, &mut event, effects).await;
        Ok((event.clone(), applied))
    }

    async fn run_effects(
        &self,
        actor: &ActorId,
        event: &mut Event,
        effects: SmallVec<[LifecycleEffect; 4]>,
    ) -> Applied {
        let mut applied = Applied::default();
        for effect in effects {
            match effect {
                LifecycleEffect::AutoAssignResource => {
                    let assignment = self.scheduler.auto_assign(event, actor).await;
                    match &assignment {
                        Assignment::Reserved(booking) => {
                            self.notifier.emit(Self::booking_requested(booking)).await;
                        },
                        Assignment::AlreadyBooked(booking) => {
                            tracing::debug!(booking_id = %booking.id, "Event already has a booking");
                        },
                        Assignment::ManualBookingRequired { reason } => {
                            tracing::warn!(event_id = %event.id, %reason, "Manual booking required");
                            self.notifier
                                .emit(CampusNotification::ManualBookingRequired {
                                    event_id: event.id,
                                    reason: reason.clone(),
                                })
                                .await;
                        },
                    }
                    applied.assignment = Some(assignment);
                },
                LifecycleEffect::ReleaseBookings { reason } => {
                    match self.scheduler.cancel_for_event(event.id, actor, reason).await {
                        Ok(Some(booking)) => {
                            tracing::info!(booking_id = %booking.id, "Booking released");
                        },
                        Ok(None) => {},
                        Err(error) => {
                            tracing::warn!(event_id = %event.id, %error, "Failed to release booking");
                        },
                    }
                    event.assigned_resource = None;
                },
                LifecycleEffect::OpenCreditTransactions {
                    award,
                    participants,
                } => {
                    let opened = self
                        .credits
                        .open_for_event(event.id, award, &participants, actor)
                        .await;
                    self.notifier
                        .emit_all(opened.iter().map(|t| CampusNotification::CreditRequested {
                            transaction_id: t.id,
                            event_id: t.event_id,
                            subject_id: t.subject_id.clone(),
                            points: t.points,
                        }))
                        .await;
                    applied.credit_transactions = opened;
                },
                LifecycleEffect::IssueCertificates { participants } => {
                    for subject in &participants {
                        match self.issue_and_announce(event, subject).await {
                            Ok(certificate) => applied.certificates.push(certificate),
                            Err(error) => {
                                tracing::warn!(event_id = %event.id, %subject, %error, "Certificate issuance failed");
                            },
                        }
                    }
                },
                LifecycleEffect::Notify(notification) => self.notifier.emit(notification).await,
            }
        }
        applied
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Halls free for `window`.
    pub async fn find_available(&self, window: &TimeWindow) -> Vec<Resource> {
        self.scheduler.find_available(window).await
    }

    /// Manually reserve a hall for a DRAFT or SCHEDULED event, e.g. after
    /// auto-assignment failed or a booking was rejected.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event or hall
    /// - [`DomainError::PreconditionFailed`] once the event has started, or
    ///   while it still has an active booking
    /// - [`DomainError::Validation`] if the event has no complete window
    /// - [`DomainError::ResourceConflict`] if the hall is taken or withdrawn
    #[tracing::instrument(skip(self))]
    pub async fn request_booking(
        &self,
        actor: &ActorId,
        event_id: EventId,
        resource_id: ResourceId,
    ) -> Result<Booking> {
        let handle = self.handle(event_id).await?;
        let event = handle.lock().await;
        if !matches!(event.status, EventStatus::Draft | EventStatus::Scheduled) {
            return Err(DomainError::PreconditionFailed(format!(
                "event {event_id} is {}; halls can only be booked before it starts",
                event.status
            )));
        }
        let window = event.window()?;
        let booking = self
            .scheduler
            .reserve(event_id, resource_id, window, actor)
            .await?;
        drop(event);

        self.notifier.emit(Self::booking_requested(&booking)).await;
        Ok(booking)
    }

    /// Approve a booking; the event gets the hall assigned.
    ///
    /// # Errors
    ///
    /// See [`IntervalScheduler::approve`].
    pub async fn approve_booking(&self, actor: &ActorId, booking_id: BookingId) -> Result<Booking> {
        let booking = self
            .scheduler
            .approve(booking_id, actor)
            .await
            .inspect_err(|error| {
                tracing::warn!(%booking_id, kind = error.kind(), %error, "Booking approval refused");
            })?;

        if let Ok(handle) = self.handle(booking.event_id).await {
            let mut event = handle.lock().await;
            let still_active = self
                .scheduler
                .active_booking(booking.event_id)
                .await
                .is_some_and(|active| active.id == booking.id && active.status == booking.status);
            if still_active && event.status != EventStatus::Cancelled {
                event.assigned_resource = Some(booking.resource_id);
                tracing::info!(event_id = %event.id, resource_id = %booking.resource_id, "Hall assigned");
            }
        }

        self.notifier
            .emit(CampusNotification::BookingApproved {
                booking_id: booking.id,
                event_id: booking.event_id,
                resource_id: booking.resource_id,
                approved_by: actor.clone(),
            })
            .await;
        Ok(booking)
    }

    /// Reject a booking with a reason.
    ///
    /// # Errors
    ///
    /// See [`IntervalScheduler::reject`].
    pub async fn reject_booking(&self, actor: &ActorId, booking_id: BookingId, reason: &str) -> Result<Booking> {
        let booking = self
            .scheduler
            .reject(booking_id, actor, reason)
            .await
            .inspect_err(|error| {
                tracing::warn!(%booking_id, kind = error.kind(), %error, "Booking rejection refused");
            })?;

        self.notifier
            .emit(CampusNotification::BookingRejected {
                booking_id: booking.id,
                event_id: booking.event_id,
                resource_id: booking.resource_id,
                reason: booking.rejection_reason.clone().unwrap_or_default(),
            })
            .await;
        Ok(booking)
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown booking.
    pub async fn booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.scheduler.booking(booking_id).await
    }

    /// Every booking ever made on a hall.
    pub async fn bookings_for_resource(&self, resource_id: ResourceId) -> Vec<Booking> {
        self.scheduler.bookings_for_resource(resource_id).await
    }

    fn booking_requested(booking: &Booking) -> CampusNotification {
        CampusNotification::BookingRequested {
            booking_id: booking.id,
            event_id: booking.event_id,
            resource_id: booking.resource_id,
            window: booking.window,
        }
    }

    // ========================================================================
    // Credit
    // ========================================================================

    /// Approve a credit transaction as the subject's mentor.
    ///
    /// # Errors
    ///
    /// See [`CreditLedger::approve`]. Approval also needs the event to exist,
    /// be COMPLETED and list the subject as present.
    pub async fn approve_credit(
        &self,
        actor: &ActorId,
        transaction_id: CreditTransactionId,
        code: Option<&str>,
    ) -> Result<CreditTransaction> {
        let transaction = self.credits.transaction(transaction_id).await?;
        let participant_recorded = match self.event(transaction.event_id).await {
            Ok(event) => {
                event.status == EventStatus::Completed && event.attended(&transaction.subject_id)
            },
            Err(_) => false,
        };

        let approved = self
            .credits
            .approve(transaction_id, actor, code, participant_recorded)
            .await
            .inspect_err(|error| {
                tracing::warn!(%transaction_id, kind = error.kind(), %error, "Credit approval refused");
            })?;

        self.notifier
            .emit(CampusNotification::CreditApproved {
                transaction_id,
                subject_id: approved.subject_id.clone(),
                points: approved.points,
                approved_by: actor.clone(),
            })
            .await;
        Ok(approved)
    }

    /// Reject a credit transaction with a reason.
    ///
    /// # Errors
    ///
    /// See [`CreditLedger::reject`].
    pub async fn reject_credit(
        &self,
        actor: &ActorId,
        transaction_id: CreditTransactionId,
        reason: &str,
    ) -> Result<CreditTransaction> {
        let rejected = self
            .credits
            .reject(transaction_id, actor, reason)
            .await
            .inspect_err(|error| {
                tracing::warn!(%transaction_id, kind = error.kind(), %error, "Credit rejection refused");
            })?;

        self.notifier
            .emit(CampusNotification::CreditRejected {
                transaction_id,
                subject_id: rejected.subject_id.clone(),
                reason: rejected.rejection_reason.clone().unwrap_or_default(),
            })
            .await;
        Ok(rejected)
    }

    /// Look up a credit transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown transaction.
    pub async fn credit_transaction(&self, transaction_id: CreditTransactionId) -> Result<CreditTransaction> {
        self.credits.transaction(transaction_id).await
    }

    /// Credit transactions of one event.
    pub async fn credits_for_event(&self, event_id: EventId) -> Vec<CreditTransaction> {
        self.credits.for_event(event_id).await
    }

    // ========================================================================
    // Certificates
    // ========================================================================

    /// Issue (or fetch) the certificate of one participant.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::PreconditionFailed`] unless the event is COMPLETED
    ///   and the subject was present
    pub async fn issue_certificate(&self, event_id: EventId, subject: &SubjectId) -> Result<Certificate> {
        let event = self.event(event_id).await?;
        self.issue_and_announce(&event, subject).await
    }

    /// Issue certificates to every present participant, one at a time.
    ///
    /// Already issued certificates are returned as they are. Dropping the
    /// returned future between two participants leaves every certificate
    /// either fully issued or not issued at all.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown event
    /// - [`DomainError::PreconditionFailed`] unless the event is COMPLETED
    #[tracing::instrument(skip(self))]
    pub async fn issue_for_roster(&self, event_id: EventId) -> Result<Vec<Certificate>> {
        let event = self.event(event_id).await?;
        if event.status != EventStatus::Completed {
            return Err(DomainError::PreconditionFailed(format!(
                "event {event_id} is {}; certificates are issued only after completion",
                event.status
            )));
        }
        let participants = event.present_participants();
        let mut issued = Vec::with_capacity(participants.len());
        for subject in &participants {
            issued.push(self.issue_and_announce(&event, subject).await?);
        }
        Ok(issued)
    }

    async fn issue_and_announce(&self, event: &Event, subject: &SubjectId) -> Result<Certificate> {
        let issuance = self.certificates.issue(event, subject).await?;
        if issuance.is_new() {
            let certificate = issuance.certificate();
            self.notifier
                .emit(CampusNotification::CertificateIssued {
                    certificate_id: certificate.id,
                    event_id: certificate.event_id,
                    subject_id: certificate.subject_id.clone(),
                    number: certificate.number.clone(),
                    content_hash: certificate.content_hash.clone(),
                })
                .await;
        }
        Ok(issuance.into_certificate())
    }

    /// Public verification by digest. Safe to expose without authentication.
    ///
    /// # Errors
    ///
    /// Returns the uniform "certificate not found" for any miss.
    pub async fn verify_certificate(&self, content_hash: &str) -> Result<CertificateView> {
        self.certificates.verify(content_hash).await
    }

    /// Revoke a certificate.
    ///
    /// # Errors
    ///
    /// See [`CertificateRegistry::revoke`].
    pub async fn revoke_certificate(&self, actor: &ActorId, content_hash: &str, reason: &str) -> Result<Certificate> {
        let revoked = self.certificates.revoke(content_hash, actor, reason).await?;
        self.notifier
            .emit(CampusNotification::CertificateRevoked {
                number: revoked.number.clone(),
                content_hash: revoked.content_hash.clone(),
                reason: revoked.revocation_reason.clone().unwrap_or_default(),
            })
            .await;
        Ok(revoked)
    }

    /// Certificates of one event.
    pub async fn certificates_for_event(&self, event_id: EventId) -> Vec<Certificate> {
        self.certificates.for_event(event_id).await
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Audit entries of one record, oldest first.
    pub async fn audit_trail(&self, target_type: TargetType, target_id: &str) -> Vec<AuditEntry> {
        self.audit.for_target(target_type, target_id).await
    }

    /// Audit entries matching `filter`, oldest first.
    pub async fn audit_query(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        self.audit.query(filter).await
    }
}
