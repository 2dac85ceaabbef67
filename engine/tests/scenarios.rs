//! End-to-end workflows through the campus coordinator.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use certifytrack_core::environment::AttendanceMark;
use certifytrack_core::ids::{EventId, SubjectId};
use certifytrack_engine::types::{ApprovalStatus, AuditAction, EventStatus, NewEvent};
use certifytrack_engine::{Assignment, CampusCoordinator, DomainError, TargetType};
use common::{admin, campus, completed_event, details, hall, mentor, window};

/// An assigned hall must be backed by an APPROVED booking of the event for
/// the event's current window.
async fn assert_hall_backed(c: &CampusCoordinator, event_id: EventId) {
    let event = c.event(event_id).await.unwrap();
    let Some(resource_id) = event.assigned_resource else {
        return;
    };
    let window = event.window().unwrap();
    let backed = c
        .bookings_for_resource(resource_id)
        .await
        .iter()
        .any(|b| b.event_id == event_id && b.status == ApprovalStatus::Approved && b.window == window);
    assert!(backed, "event {event_id} claims {resource_id} without an approved booking for {window}");
}

#[tokio::test]
async fn approved_booking_blocks_the_window() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;

    let first = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    let second = c
        .create_event(&admin(), NewEvent::new(details("Debate", (10, 30), (11, 30))))
        .await
        .unwrap();

    let booking = c.request_booking(&admin(), first.id, hall_1.id).await.unwrap();
    assert_eq!(booking.status, ApprovalStatus::Pending);
    // Pending bookings do not block
    assert_eq!(c.find_available(&window((10, 30), (11, 30))).await.len(), 1);
    let contender = c.request_booking(&admin(), second.id, hall_1.id).await.unwrap();

    c.approve_booking(&admin(), booking.id).await.unwrap();
    assert!(c.find_available(&window((10, 30), (11, 30))).await.is_empty());
    assert_eq!(c.event(first.id).await.unwrap().assigned_resource, Some(hall_1.id));

    let err = c.approve_booking(&admin(), contender.id).await.unwrap_err();
    assert!(matches!(err, DomainError::ResourceConflict(_)));
    assert_eq!(c.booking(contender.id).await.unwrap().status, ApprovalStatus::Pending);
    assert_eq!(c.event(second.id).await.unwrap().assigned_resource, None);

    // Adjacent windows do not overlap
    assert_eq!(c.find_available(&window((11, 0), (12, 0))).await.len(), 1);
}

#[tokio::test]
async fn request_after_approval_is_refused() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;

    let first = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    let booking = c.request_booking(&admin(), first.id, hall_1.id).await.unwrap();
    c.approve_booking(&admin(), booking.id).await.unwrap();

    let second = c
        .create_event(&admin(), NewEvent::new(details("Debate", (10, 30), (11, 30))))
        .await
        .unwrap();
    let err = c.request_booking(&admin(), second.id, hall_1.id).await.unwrap_err();
    assert!(matches!(err, DomainError::ResourceConflict(_)));
}

#[tokio::test]
async fn scheduling_falls_back_to_secondary_hall() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;
    let hall_2 = hall(&campus, "Hall-2").await;

    let quiz = c
        .create_event(
            &admin(),
            NewEvent::new(details("Quiz", (10, 0), (11, 0)).prefer(hall_1.id, None)),
        )
        .await
        .unwrap();
    let Assignment::Reserved(taken) = c.schedule_event(&admin(), quiz.id).await.unwrap().assignment
    else {
        panic!("quiz should reserve Hall-1");
    };
    c.approve_booking(&admin(), taken.id).await.unwrap();

    let workshop = c
        .create_event(
            &admin(),
            NewEvent::new(
                details("Workshop", (10, 0), (12, 0)).prefer(hall_1.id, Some(hall_2.id)),
            ),
        )
        .await
        .unwrap();
    let report = c.schedule_event(&admin(), workshop.id).await.unwrap();
    assert_eq!(report.event.status, EventStatus::Scheduled);
    match report.assignment {
        Assignment::Reserved(booking) => {
            assert_eq!(booking.resource_id, hall_2.id);
            assert_eq!(booking.status, ApprovalStatus::Pending);
        },
        other => panic!("expected a reservation on Hall-2, got {other:?}"),
    }
}

#[tokio::test]
async fn scheduling_without_free_hall_needs_manual_booking() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;
    c.withdraw_resource(hall_1.id).await.unwrap();

    let event = c
        .create_event(
            &admin(),
            NewEvent::new(details("Quiz", (10, 0), (11, 0)).prefer(hall_1.id, None)),
        )
        .await
        .unwrap();
    let report = c.schedule_event(&admin(), event.id).await.unwrap();

    assert_eq!(report.event.status, EventStatus::Scheduled);
    assert!(matches!(report.assignment, Assignment::ManualBookingRequired { .. }));
    assert_eq!(campus.bus.count_of("ManualBookingRequired.v1"), 1);
}

#[tokio::test]
async fn completion_rewards_only_present_participants() {
    let campus = campus();
    let c = &campus.coordinator;
    let category = c.register_category("Technical", None, None).await.unwrap();

    let report = completed_event(
        &campus,
        Some((category.id, 10)),
        vec![AttendanceMark::present("s1"), AttendanceMark::absent("s2")],
    )
    .await;

    assert_eq!(report.event.status, EventStatus::Completed);
    assert_eq!(report.credit_transactions.len(), 1);
    let transaction = &report.credit_transactions[0];
    assert_eq!(transaction.subject_id, SubjectId::from("s1"));
    assert_eq!(transaction.status, ApprovalStatus::Pending);
    assert_eq!(transaction.points, 10);

    assert_eq!(report.certificates.len(), 1);
    assert_eq!(report.certificates[0].subject_id, SubjectId::from("s1"));
    assert_eq!(c.certificates_for_event(report.event.id).await.len(), 1);

    let err = c
        .issue_certificate(report.event.id, &SubjectId::from("s2"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    assert_eq!(campus.bus.count_of("EventCompleted.v1"), 1);
    assert_eq!(campus.bus.count_of("CreditRequested.v1"), 1);
    assert_eq!(campus.bus.count_of("CertificateIssued.v1"), 1);
}

#[tokio::test]
async fn completion_without_credit_opens_no_transactions() {
    let campus = campus();
    let report = completed_event(&campus, None, vec![AttendanceMark::present("s1")]).await;

    assert!(report.credit_transactions.is_empty());
    assert_eq!(report.certificates.len(), 1);
}

#[tokio::test]
async fn rejected_credit_stays_rejected() {
    let campus = campus();
    let c = &campus.coordinator;
    let category = c.register_category("Cultural", None, None).await.unwrap();
    let report = completed_event(&campus, Some((category.id, 5)), vec![AttendanceMark::present("s1")]).await;
    let transaction = report.credit_transactions[0].clone();

    let rejected = c
        .reject_credit(&mentor(), transaction.id, "insufficient evidence")
        .await
        .unwrap();
    assert_eq!(rejected.status, ApprovalStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("insufficient evidence"));

    let err = c.approve_credit(&mentor(), transaction.id, None).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));

    let trail = c
        .audit_trail(TargetType::CreditTransaction, &transaction.id.to_string())
        .await;
    let rejections: Vec<_> = trail.iter().filter(|e| e.action == AuditAction::Reject).collect();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].after_status, "REJECTED");
    assert!(trail.iter().all(|e| e.action != AuditAction::Approve));
}

#[tokio::test]
async fn credit_approval_needs_mentor() {
    let campus = campus();
    let c = &campus.coordinator;
    let category = c.register_category("Sports", None, None).await.unwrap();
    let report = completed_event(&campus, Some((category.id, 5)), vec![AttendanceMark::present("s1")]).await;
    let transaction = &report.credit_transactions[0];

    let err = c
        .approve_credit(&admin(), transaction.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));

    let approved = c
        .approve_credit(&mentor(), transaction.id, Some("MNT20250"))
        .await
        .unwrap();
    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(approved.verification_code.as_deref(), Some("MNT20250"));
    assert_eq!(campus.bus.count_of("CreditApproved.v1"), 1);
}

#[tokio::test]
async fn cancelling_frees_the_hall() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;

    let event = c
        .create_event(
            &admin(),
            NewEvent::new(details("Quiz", (10, 0), (11, 0)).prefer(hall_1.id, None)),
        )
        .await
        .unwrap();
    let Assignment::Reserved(booking) = c.schedule_event(&admin(), event.id).await.unwrap().assignment
    else {
        panic!("expected a reservation");
    };
    c.approve_booking(&admin(), booking.id).await.unwrap();
    assert!(c.find_available(&window((10, 0), (11, 0))).await.is_empty());

    let cancelled = c
        .cancel_event(&admin(), event.id, Some("speaker unavailable".to_string()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);
    assert_eq!(cancelled.assigned_resource, None);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("speaker unavailable"));
    assert_eq!(c.booking(booking.id).await.unwrap().status, ApprovalStatus::Cancelled);
    assert_eq!(c.find_available(&window((10, 0), (11, 0))).await.len(), 1);

    let err = c.complete_event(&admin(), event.id).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidTransition { .. }));
    assert_eq!(campus.bus.count_of("EventCancelled.v1"), 1);
}

#[tokio::test]
async fn start_waits_for_start_time_unless_forced() {
    let campus = campus();
    let c = &campus.coordinator;
    let event = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    c.schedule_event(&admin(), event.id).await.unwrap();

    // Clock sits at 08:00
    let err = c.start_event(&admin(), event.id, false).await.unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    campus.clock.advance(chrono::Duration::hours(2));
    let started = c.start_event(&admin(), event.id, false).await.unwrap();
    assert_eq!(started.status, EventStatus::Ongoing);
}

#[tokio::test]
async fn completion_requires_attendance() {
    let campus = campus();
    let c = &campus.coordinator;
    let event = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    c.schedule_event(&admin(), event.id).await.unwrap();
    c.start_event(&admin(), event.id, true).await.unwrap();

    let err = c.complete_event(&admin(), event.id).await.unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
    assert_eq!(c.event(event.id).await.unwrap().status, EventStatus::Ongoing);

    campus.attendance.fail_with("register offline");
    let err = c.record_attendance(event.id).await.unwrap_err();
    assert!(matches!(err, DomainError::External(_)));
}

#[tokio::test]
async fn roster_closes_once_started() {
    let campus = campus();
    let c = &campus.coordinator;
    let event = c
        .create_event(
            &admin(),
            NewEvent::new(details("Quiz", (10, 0), (11, 0))).with_max_participants(1),
        )
        .await
        .unwrap();
    c.add_participant(event.id, SubjectId::from("s1")).await.unwrap();
    // Re-adding is a no-op even when full
    c.add_participant(event.id, SubjectId::from("s1")).await.unwrap();
    let err = c
        .add_participant(event.id, SubjectId::from("s2"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    c.schedule_event(&admin(), event.id).await.unwrap();
    c.start_event(&admin(), event.id, true).await.unwrap();
    let err = c
        .remove_participant(event.id, &SubjectId::from("s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
}

#[tokio::test]
async fn notification_outage_does_not_undo_decisions() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;
    let event = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    let booking = c.request_booking(&admin(), event.id, hall_1.id).await.unwrap();

    campus.bus.fail_publishes("broker down");
    let approved = c.approve_booking(&admin(), booking.id).await.unwrap();

    assert_eq!(approved.status, ApprovalStatus::Approved);
    assert_eq!(c.booking(booking.id).await.unwrap().status, ApprovalStatus::Approved);
}

#[tokio::test]
async fn booked_draft_keeps_its_timing() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;

    let first = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    let booking = c.request_booking(&admin(), first.id, hall_1.id).await.unwrap();
    c.approve_booking(&admin(), booking.id).await.unwrap();

    let err = c
        .update_event_details(first.id, details("Quiz", (14, 0), (15, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));
    assert_eq!(c.event(first.id).await.unwrap().window().unwrap(), window((10, 0), (11, 0)));
    assert_hall_backed(c, first.id).await;

    // Retitling leaves the timing alone
    let renamed = c
        .update_event_details(first.id, details("Quiz Finals", (10, 0), (11, 0)))
        .await
        .unwrap();
    assert_eq!(renamed.details.title, "Quiz Finals");

    // The afternoon slot goes to someone else, and only one event holds it
    let second = c
        .create_event(&admin(), NewEvent::new(details("Debate", (14, 0), (15, 0))))
        .await
        .unwrap();
    let afternoon = c.request_booking(&admin(), second.id, hall_1.id).await.unwrap();
    c.approve_booking(&admin(), afternoon.id).await.unwrap();

    for event_id in [first.id, second.id] {
        assert_hall_backed(c, event_id).await;
    }
}

#[tokio::test]
async fn pending_booking_freezes_timing_until_rejected() {
    let campus = campus();
    let c = &campus.coordinator;
    let hall_1 = hall(&campus, "Hall-1").await;

    let event = c
        .create_event(&admin(), NewEvent::new(details("Quiz", (10, 0), (11, 0))))
        .await
        .unwrap();
    let booking = c.request_booking(&admin(), event.id, hall_1.id).await.unwrap();

    let err = c
        .update_event_details(event.id, details("Quiz", (14, 0), (15, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PreconditionFailed(_)));

    c.reject_booking(&admin(), booking.id, "hall under maintenance")
        .await
        .unwrap();
    let moved = c
        .update_event_details(event.id, details("Quiz", (14, 0), (15, 0)))
        .await
        .unwrap();
    assert_eq!(moved.window().unwrap(), window((14, 0), (15, 0)));

    let rebooked = c.request_booking(&admin(), event.id, hall_1.id).await.unwrap();
    assert_eq!(rebooked.window, window((14, 0), (15, 0)));
    c.approve_booking(&admin(), rebooked.id).await.unwrap();
    assert_hall_backed(c, event.id).await;
}
