//! Races on shared halls, certificates and credit decisions.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use certifytrack_core::environment::AttendanceMark;
use certifytrack_core::ids::SubjectId;
use certifytrack_engine::types::{ApprovalStatus, AuditAction, NewEvent};
use certifytrack_engine::{DomainError, TargetType};
use common::{admin, campus, completed_event, details, hall, mentor};
use futures::future::join_all;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_approval_wins_a_contested_slot() {
    let campus = campus();
    let resource_id = hall(&campus, "Hall-1").await.id;

    let mut events = Vec::new();
    for i in 0..16 {
        let event = campus
            .coordinator
            .create_event(
                &admin(),
                NewEvent::new(details(&format!("Event {i}"), (10, 0), (11, 0))),
            )
            .await
            .unwrap();
        events.push(event.id);
    }

    let tasks = events.into_iter().map(|event_id| {
        let coordinator = Arc::clone(&campus.coordinator);
        tokio::spawn(async move {
            let booking = coordinator.request_booking(&admin(), event_id, resource_id).await?;
            coordinator.approve_booking(&admin(), booking.id).await
        })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|error| matches!(error, DomainError::ResourceConflict(_))));

    let approved = campus
        .coordinator
        .bookings_for_resource(resource_id)
        .await
        .into_iter()
        .filter(|booking| booking.status == ApprovalStatus::Approved)
        .count();
    assert_eq!(approved, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn approved_bookings_never_overlap() {
    let campus = campus();
    let halls = [
        hall(&campus, "Hall-1").await.id,
        hall(&campus, "Hall-2").await.id,
    ];
    let slots = [
        ((9, 0), (10, 30)),
        ((10, 0), (11, 0)),
        ((10, 30), (12, 0)),
        ((11, 0), (12, 0)),
        ((9, 30), (11, 30)),
        ((12, 0), (13, 0)),
    ];

    let mut requests = Vec::new();
    for (start, end) in slots {
        for resource_id in halls {
            let event = campus
                .coordinator
                .create_event(&admin(), NewEvent::new(details("Session", start, end)))
                .await
                .unwrap();
            requests.push((event.id, resource_id));
        }
    }

    let tasks = requests.into_iter().map(|(event_id, resource_id)| {
        let coordinator = Arc::clone(&campus.coordinator);
        tokio::spawn(async move {
            let booking = coordinator.request_booking(&admin(), event_id, resource_id).await?;
            coordinator.approve_booking(&admin(), booking.id).await
        })
    });
    for joined in join_all(tasks).await {
        let outcome = joined.unwrap();
        assert!(matches!(outcome, Ok(_) | Err(DomainError::ResourceConflict(_))));
    }

    for resource_id in halls {
        let approved: Vec<_> = campus
            .coordinator
            .bookings_for_resource(resource_id)
            .await
            .into_iter()
            .filter(|booking| booking.status == ApprovalStatus::Approved)
            .collect();
        assert!(!approved.is_empty());
        for (i, a) in approved.iter().enumerate() {
            for b in &approved[i + 1..] {
                assert!(!a.window.overlaps(&b.window), "{a:?} overlaps {b:?}");
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuance_yields_one_certificate() {
    let campus = campus();
    let report = completed_event(&campus, None, vec![AttendanceMark::present("s1")]).await;
    let event_id = report.event.id;
    let expected = report.certificates[0].content_hash.clone();

    let tasks = (0..16).map(|_| {
        let coordinator = Arc::clone(&campus.coordinator);
        tokio::spawn(async move {
            coordinator
                .issue_certificate(event_id, &SubjectId::from("s1"))
                .await
        })
    });
    for joined in join_all(tasks).await {
        let certificate = joined.unwrap().unwrap();
        assert_eq!(certificate.content_hash, expected);
    }

    assert_eq!(campus.coordinator.certificates_for_event(event_id).await.len(), 1);
    assert_eq!(campus.bus.count_of("CertificateIssued.v1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_credit_decisions_have_one_winner() {
    let campus = campus();
    let category = campus
        .coordinator
        .register_category("Technical", None, None)
        .await
        .unwrap();
    let report = completed_event(
        &campus,
        Some((category.id, 10)),
        vec![AttendanceMark::present("s1")],
    )
    .await;
    let transaction_id = report.credit_transactions[0].id;

    let tasks = (0..8).map(|i| {
        let coordinator = Arc::clone(&campus.coordinator);
        tokio::spawn(async move {
            if i % 2 == 0 {
                coordinator.approve_credit(&mentor(), transaction_id, None).await
            } else {
                coordinator
                    .reject_credit(&mentor(), transaction_id, "duplicate claim filed")
                    .await
            }
        })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().err())
        .all(|error| matches!(error, DomainError::InvalidTransition { .. })));

    let decisions = campus
        .coordinator
        .audit_trail(TargetType::CreditTransaction, &transaction_id.to_string())
        .await
        .into_iter()
        .filter(|entry| matches!(entry.action, AuditAction::Approve | AuditAction::Reject))
        .count();
    assert_eq!(decisions, 1);
}
