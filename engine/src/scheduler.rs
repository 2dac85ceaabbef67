//! Interval scheduler: hall availability, reservations and booking decisions.
//!
//! Occupancy is derived by scanning the bookings of a resource; only APPROVED
//! bookings block a window. Each resource has its own lock, and both the
//! re-validation in [`IntervalScheduler::reserve`] and the occupancy check in
//! [`IntervalScheduler::approve`] run under it, so two requests for the same
//! slot can never both end up APPROVED.
//!
//! Two PENDING bookings may overlap. Whichever is approved first wins; the
//! other fails approval with [`DomainError::ResourceConflict`].
//!
//! Lock order: resource schedule, then the per-event active-booking map.

use crate::approval::{Approvable, ApprovalEngine, ApprovalPolicy, Decision};
use crate::audit::AuditLog;
use crate::catalog::ResourceCatalog;
use crate::error::{DomainError, Result, TargetType};
use crate::metrics;
use crate::types::{ApprovalStatus, AuditAction, AuditEntry, Booking, Event, Resource, TimeWindow};
use certifytrack_core::environment::{AuthorityProvider, Clock};
use certifytrack_core::ids::{ActorId, BookingId, EventId, ResourceId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

impl Approvable for Booking {
    const TARGET: TargetType = TargetType::Booking;

    fn target_id(&self) -> String {
        self.id.to_string()
    }

    fn status(&self) -> ApprovalStatus {
        self.status
    }

    fn apply_decision(&mut self, decision: &Decision) {
        self.status = decision.status;
        self.decided_by = Some(decision.actor.clone());
        self.decided_at = Some(decision.at);
        self.rejection_reason.clone_from(&decision.reason);
    }
}

/// Booking rules: resource authority, and no approved overlap at approval time.
struct BookingPolicy<'a> {
    authority: &'a dyn AuthorityProvider,
    conflict: Option<BookingId>,
    withdrawn: bool,
}

impl ApprovalPolicy<Booking> for BookingPolicy<'_> {
    fn authorize(&self, actor: &ActorId, target: &Booking) -> Result<()> {
        if self.authority.can_approve_booking(actor, &target.resource_id) {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "{actor} may not decide bookings for resource {}",
                target.resource_id
            )))
        }
    }

    fn check_approve(&self, target: &Booking) -> Result<()> {
        if self.withdrawn {
            return Err(DomainError::ResourceConflict(format!(
                "resource {} has been withdrawn from service",
                target.resource_id
            )));
        }
        match self.conflict {
            Some(other) => Err(DomainError::ResourceConflict(format!(
                "resource {} is already taken by approved booking {other} during {}",
                target.resource_id, target.window
            ))),
            None => Ok(()),
        }
    }
}

/// Outcome of automatic hall assignment for a newly scheduled event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// A PENDING booking was created on a preferred resource
    Reserved(Booking),
    /// The event already had an active booking
    AlreadyBooked(Booking),
    /// Neither preference could be reserved; an organizer has to book manually
    ManualBookingRequired {
        /// Why each attempt failed
        reason: String,
    },
}

#[derive(Debug, Default)]
struct ResourceSchedule {
    bookings: Vec<Booking>,
}

impl ResourceSchedule {
    fn approved_conflict(&self, window: &TimeWindow, except: Option<BookingId>) -> Option<BookingId> {
        self.bookings
            .iter()
            .filter(|b| b.status == ApprovalStatus::Approved && Some(b.id) != except)
            .find(|b| b.window.overlaps(window))
            .map(|b| b.id)
    }

    fn get(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    fn get_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }
}

/// Computes free resources and manages the bookings on them.
pub struct IntervalScheduler {
    catalog: Arc<ResourceCatalog>,
    engine: ApprovalEngine,
    authority: Arc<dyn AuthorityProvider>,
    clock: Arc<dyn Clock>,
    audit: Arc<AuditLog>,
    schedules: RwLock<HashMap<ResourceId, Arc<Mutex<ResourceSchedule>>>>,
    locations: RwLock<HashMap<BookingId, ResourceId>>,
    active: Mutex<HashMap<EventId, BookingId>>,
}

impl IntervalScheduler {
    /// Creates a new `IntervalScheduler`
    #[must_use]
    pub fn new(
        catalog: Arc<ResourceCatalog>,
        engine: ApprovalEngine,
        authority: Arc<dyn AuthorityProvider>,
        clock: Arc<dyn Clock>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            catalog,
            engine,
            authority,
            clock,
            audit,
            schedules: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
            active: Mutex::new(HashMap::new()),
        }
    }

    async fn schedule_for(&self, resource_id: ResourceId) -> Arc<Mutex<ResourceSchedule>> {
        if let Some(schedule) = self.schedules.read().await.get(&resource_id) {
            return Arc::clone(schedule);
        }
        Arc::clone(self.schedules.write().await.entry(resource_id).or_default())
    }

    async fn locate(&self, booking_id: BookingId) -> Result<ResourceId> {
        self.locations
            .read()
            .await
            .get(&booking_id)
            .copied()
            .ok_or_else(|| DomainError::not_found(TargetType::Booking, booking_id))
    }

    /// Every in-service resource with no APPROVED booking overlapping `window`.
    ///
    /// The answer is advisory; [`IntervalScheduler::reserve`] checks again.
    #[tracing::instrument(skip(self), fields(window = %window))]
    pub async fn find_available(&self, window: &TimeWindow) -> Vec<Resource> {
        let mut free = Vec::new();
        for resource in self.catalog.list().await {
            if !resource.is_available {
                continue;
            }
            let schedule = self.schedule_for(resource.id).await;
            if schedule.lock().await.approved_conflict(window, None).is_none() {
                free.push(resource);
            }
        }
        tracing::debug!(free = free.len(), "Availability scan finished");
        free
    }

    /// Create a PENDING booking after re-checking availability under the
    /// resource lock.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown resource
    /// - [`DomainError::ResourceConflict`] if the resource is withdrawn or an
    ///   APPROVED booking overlaps `window`
    /// - [`DomainError::PreconditionFailed`] if the event already has an
    ///   active (PENDING or APPROVED) booking
    #[tracing::instrument(skip(self), fields(window = %window))]
    pub async fn reserve(
        &self,
        event_id: EventId,
        resource_id: ResourceId,
        window: TimeWindow,
        actor: &ActorId,
    ) -> Result<Booking> {
        let resource = self.catalog.get(resource_id).await?;
        if !resource.is_available {
            metrics::record_scheduler_conflict();
            return Err(DomainError::ResourceConflict(format!(
                "resource {} is withdrawn from service",
                resource.code
            )));
        }

        let schedule = self.schedule_for(resource_id).await;
        let mut schedule = schedule.lock().await;
        if let Some(other) = schedule.approved_conflict(&window, None) {
            metrics::record_scheduler_conflict();
            tracing::warn!(%other, resource = %resource.code, "Reservation lost to an approved booking");
            return Err(DomainError::ResourceConflict(format!(
                "resource {} is already booked during {window}",
                resource.code
            )));
        }

        let mut active = self.active.lock().await;
        if let Some(existing) = active.get(&event_id) {
            return Err(DomainError::PreconditionFailed(format!(
                "event {event_id} already has active booking {existing}"
            )));
        }

        let now = self.clock.now();
        let booking = Booking {
            id: BookingId::new(),
            event_id,
            resource_id,
            window,
            status: ApprovalStatus::Pending,
            requested_by: actor.clone(),
            requested_at: now,
            decided_by: None,
            decided_at: None,
            rejection_reason: None,
        };
        schedule.bookings.push(booking.clone());
        active.insert(event_id, booking.id);
        drop(active);
        self.locations.write().await.insert(booking.id, resource_id);
        self.audit
            .record(
                AuditEntry::new(actor.clone(), AuditAction::Create, TargetType::Booking, booking.id, now)
                    .with_statuses(None, ApprovalStatus::Pending.as_str()),
            )
            .await;

        metrics::record_booking(ApprovalStatus::Pending);
        tracing::info!(booking_id = %booking.id, resource = %resource.code, "Booking reserved");
        Ok(booking)
    }

    /// Approve a PENDING booking; from now on it blocks its window.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for an unknown booking
    /// - [`DomainError::InvalidTransition`] unless PENDING
    /// - [`DomainError::Unauthorized`] without authority over the resource
    /// - [`DomainError::ResourceConflict`] if another APPROVED booking now
    ///   overlaps, or the resource was withdrawn
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, booking_id: BookingId, actor: &ActorId) -> Result<Booking> {
        let resource_id = self.locate(booking_id).await?;
        let withdrawn = !self.catalog.get(resource_id).await?.is_available;

        let schedule = self.schedule_for(resource_id).await;
        let mut schedule = schedule.lock().await;
        let window = schedule
            .get(booking_id)
            .map(|b| b.window)
            .ok_or_else(|| DomainError::not_found(TargetType::Booking, booking_id))?;
        let policy = BookingPolicy {
            authority: self.authority.as_ref(),
            conflict: schedule.approved_conflict(&window, Some(booking_id)),
            withdrawn,
        };
        let booking = schedule
            .get_mut(booking_id)
            .ok_or_else(|| DomainError::not_found(TargetType::Booking, booking_id))?;

        let entry = match self
            .engine
            .approve(booking, &policy, actor, None, self.clock.now())
        {
            Ok(entry) => entry,
            Err(error) => {
                if matches!(error, DomainError::ResourceConflict(_)) {
                    metrics::record_scheduler_conflict();
                    tracing::warn!(%booking_id, %error, "Booking approval lost to an overlap");
                }
                return Err(error);
            },
        };
        let approved = booking.clone();
        self.audit.record(entry).await;

        metrics::record_booking(ApprovalStatus::Approved);
        tracing::info!(%booking_id, resource_id = %approved.resource_id, "Booking approved");
        Ok(approved)
    }

    /// Reject a PENDING booking. The event may request a new one afterwards.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Validation`] for a missing or short reason
    /// - [`DomainError::NotFound`] for an unknown booking
    /// - [`DomainError::InvalidTransition`] unless PENDING
    /// - [`DomainError::Unauthorized`] without authority over the resource
    #[tracing::instrument(skip(self, reason))]
    pub async fn reject(&self, booking_id: BookingId, actor: &ActorId, reason: &str) -> Result<Booking> {
        let resource_id = self.locate(booking_id).await?;
        let schedule = self.schedule_for(resource_id).await;
        let mut schedule = schedule.lock().await;
        let booking = schedule
            .get_mut(booking_id)
            .ok_or_else(|| DomainError::not_found(TargetType::Booking, booking_id))?;

        let policy = BookingPolicy {
            authority: self.authority.as_ref(),
            conflict: None,
            withdrawn: false,
        };
        let entry = self
            .engine
            .reject(booking, &policy, actor, reason, self.clock.now())?;
        let rejected = booking.clone();
        self.release_event_slot(rejected.event_id, booking_id).await;
        self.audit.record(entry).await;

        metrics::record_booking(ApprovalStatus::Rejected);
        tracing::info!(%booking_id, "Booking rejected");
        Ok(rejected)
    }

    /// Cancel the active booking of an event, freeing its resource.
    ///
    /// Returns the cancelled booking, or `None` if there was nothing to cancel.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] if the booking index is inconsistent.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel_for_event(
        &self,
        event_id: EventId,
        actor: &ActorId,
        reason: Option<String>,
    ) -> Result<Option<Booking>> {
        let Some(booking_id) = self.active.lock().await.get(&event_id).copied() else {
            return Ok(None);
        };
        let resource_id = self.locate(booking_id).await?;
        let schedule = self.schedule_for(resource_id).await;
        let mut schedule = schedule.lock().await;
        let booking = schedule
            .get_mut(booking_id)
            .ok_or_else(|| DomainError::not_found(TargetType::Booking, booking_id))?;
        if booking.status.is_terminal() && booking.status != ApprovalStatus::Approved {
            return Ok(None);
        }

        let entry = self
            .engine
            .cancel(booking, actor, reason, self.clock.now())?;
        let cancelled = booking.clone();
        self.release_event_slot(event_id, booking_id).await;
        self.audit.record(entry).await;

        metrics::record_booking(ApprovalStatus::Cancelled);
        tracing::info!(%booking_id, %event_id, "Booking cancelled");
        Ok(Some(cancelled))
    }

    async fn release_event_slot(&self, event_id: EventId, booking_id: BookingId) {
        let mut active = self.active.lock().await;
        if active.get(&event_id) == Some(&booking_id) {
            active.remove(&event_id);
        }
    }

    /// Reserve a preferred resource for a newly scheduled event.
    ///
    /// Tries the primary preference, then the secondary. Failure to reserve
    /// is reported as [`Assignment::ManualBookingRequired`], never as an error.
    #[tracing::instrument(skip(self, event), fields(event_id = %event.id))]
    pub async fn auto_assign(&self, event: &Event, actor: &ActorId) -> Assignment {
        if let Some(existing) = self.active_booking(event.id).await {
            return Assignment::AlreadyBooked(existing);
        }
        let window = match event.window() {
            Ok(window) => window,
            Err(error) => {
                return Assignment::ManualBookingRequired {
                    reason: error.to_string(),
                };
            },
        };

        let mut candidates = Vec::with_capacity(2);
        for preference in [
            event.details.primary_resource,
            event.details.secondary_resource,
        ]
        .into_iter()
        .flatten()
        {
            if !candidates.contains(&preference) {
                candidates.push(preference);
            }
        }
        if candidates.is_empty() {
            return Assignment::ManualBookingRequired {
                reason: "no resource preference declared".to_string(),
            };
        }

        let mut failures = Vec::with_capacity(candidates.len());
        for resource_id in candidates {
            match self.reserve(event.id, resource_id, window, actor).await {
                Ok(booking) => return Assignment::Reserved(booking),
                Err(error) => {
                    tracing::debug!(%resource_id, %error, "Preferred resource unavailable");
                    failures.push(format!("{resource_id}: {error}"));
                },
            }
        }
        Assignment::ManualBookingRequired {
            reason: failures.join("; "),
        }
    }

    /// Look up a booking.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown booking.
    pub async fn booking(&self, booking_id: BookingId) -> Result<Booking> {
        let resource_id = self.locate(booking_id).await?;
        let schedule = self.schedule_for(resource_id).await;
        let schedule = schedule.lock().await;
        schedule
            .get(booking_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(TargetType::Booking, booking_id))
    }

    /// The PENDING or APPROVED booking of an event, if any.
    pub async fn active_booking(&self, event_id: EventId) -> Option<Booking> {
        let booking_id = self.active.lock().await.get(&event_id).copied()?;
        self.booking(booking_id).await.ok()
    }

    /// All bookings ever made on a resource, oldest first.
    pub async fn bookings_for_resource(&self, resource_id: ResourceId) -> Vec<Booking> {
        let schedule = self.schedule_for(resource_id).await;
        let schedule = schedule.lock().await;
        schedule.bookings.clone()
    }
}
