//! Business metrics for campus coordination.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! host application.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `certifytrack_bookings_total{status}` - Booking transitions by resulting status
//! - `certifytrack_credits_total{status}` - Credit transaction transitions by resulting status
//! - `certifytrack_certificates_issued_total` - Certificates issued (first issuance only)
//! - `certifytrack_certificates_revoked_total` - Certificates revoked
//! - `certifytrack_events_total{status}` - Event lifecycle transitions by resulting status
//! - `certifytrack_scheduler_conflicts_total` - Reservations or approvals lost to an overlap

use crate::types::{ApprovalStatus, EventStatus};
use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "certifytrack_bookings_total",
        "Total number of booking transitions by status (pending, approved, rejected, cancelled)"
    );
    describe_counter!(
        "certifytrack_credits_total",
        "Total number of credit transaction transitions by status"
    );
    describe_counter!(
        "certifytrack_certificates_issued_total",
        "Total number of certificates issued"
    );
    describe_counter!(
        "certifytrack_certificates_revoked_total",
        "Total number of certificates revoked"
    );
    describe_counter!(
        "certifytrack_events_total",
        "Total number of event lifecycle transitions by status"
    );
    describe_counter!(
        "certifytrack_scheduler_conflicts_total",
        "Total number of reservations or approvals rejected because of an overlap"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

const fn status_label(status: ApprovalStatus) -> &'static str {
    match status {
        ApprovalStatus::Pending => "pending",
        ApprovalStatus::Approved => "approved",
        ApprovalStatus::Rejected => "rejected",
        ApprovalStatus::Cancelled => "cancelled",
    }
}

/// Record a booking reaching `status`.
pub fn record_booking(status: ApprovalStatus) {
    metrics::counter!("certifytrack_bookings_total", "status" => status_label(status))
        .increment(1);
    tracing::debug!(status = %status, "Recorded booking metric");
}

/// Record a credit transaction reaching `status`.
pub fn record_credit(status: ApprovalStatus) {
    metrics::counter!("certifytrack_credits_total", "status" => status_label(status))
        .increment(1);
    tracing::debug!(status = %status, "Recorded credit metric");
}

/// Record a first-time certificate issuance.
pub fn record_certificate_issued() {
    metrics::counter!("certifytrack_certificates_issued_total").increment(1);
}

/// Record a certificate revocation.
pub fn record_certificate_revoked() {
    metrics::counter!("certifytrack_certificates_revoked_total").increment(1);
}

/// Record an event reaching `status`.
pub fn record_event(status: EventStatus) {
    let label = match status {
        EventStatus::Draft => "draft",
        EventStatus::Scheduled => "scheduled",
        EventStatus::Ongoing => "ongoing",
        EventStatus::Completed => "completed",
        EventStatus::Cancelled => "cancelled",
    };
    metrics::counter!("certifytrack_events_total", "status" => label).increment(1);
    tracing::debug!(status = %status, "Recorded event metric");
}

/// Record a reservation or approval lost to an overlapping booking.
pub fn record_scheduler_conflict() {
    metrics::counter!("certifytrack_scheduler_conflicts_total").increment(1);
}
