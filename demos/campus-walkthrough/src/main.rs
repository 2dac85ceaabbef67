//! Walkthrough of a campus event from hall booking to certificate
//! verification, using in-memory collaborators.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p campus-walkthrough
//! RUST_LOG=debug CERTIFYTRACK_UTC_OFFSET_MINUTES=330 cargo run -p campus-walkthrough
//! ```

use certifytrack_core::environment::AttendanceMark;
use certifytrack_core::event_bus::EventBus;
use certifytrack_core::ids::{ActorId, SubjectId};
use certifytrack_engine::metrics::register_business_metrics;
use certifytrack_engine::types::{EventDetails, NewEvent, NewResource};
use certifytrack_engine::{Assignment, CampusCoordinator, CoordinatorEnvironment, EngineConfig};
use certifytrack_testing::{InMemoryEventBus, ManualClock, StaticAttendance, StaticAuthority};
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::StreamExt;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,certifytrack_engine=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== CertifyTrack demo ===");
    register_business_metrics();

    let config = EngineConfig::from_env();
    let offset = config.campus_offset();

    let date = NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("invalid demo date")?;
    let at = |h: u32| NaiveTime::from_hms_opt(h, 0, 0).ok_or("invalid demo time");
    let opening = offset
        .from_local_datetime(&date.and_time(at(8)?))
        .single()
        .ok_or("ambiguous demo time")?
        .with_timezone(&Utc);

    let clock = ManualClock::new(opening);
    let attendance = Arc::new(StaticAttendance::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let authority = StaticAuthority::new()
        .with_admin("coordinator")
        .with_mentor("mentor-rao", "s-101")
        .with_mentor("mentor-rao", "s-102")
        .with_certificate_manager("registrar");

    let coordinator = CampusCoordinator::new(
        &config,
        CoordinatorEnvironment {
            clock: Arc::new(clock.clone()),
            authority: Arc::new(authority),
            attendance: attendance.clone(),
            event_bus: bus.clone(),
        },
    )?;

    let mut notifications = bus
        .subscribe(&[
            config.topics.bookings.as_str(),
            config.topics.events.as_str(),
            config.topics.credits.as_str(),
            config.topics.certificates.as_str(),
        ])
        .await?;
    let listener = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(Ok(envelope)) = notifications.next().await {
            seen.push(envelope.event_type);
        }
        seen
    });

    let coordinator_id = ActorId::from("coordinator");
    let organizer = ActorId::from("organizer-meena");

    // Halls and credit categories
    let hall_1 = coordinator
        .register_resource(NewResource::new("Hall-1", "Seminar Hall 1", 100, "Block A"))
        .await?;
    let hall_2 = coordinator
        .register_resource(NewResource::new("Hall-2", "Seminar Hall 2", 80, "Block B"))
        .await?;
    let technical = coordinator
        .register_category("Technical", Some(5), Some(20))
        .await?;

    // Hall-1 is already taken in the morning
    let quiz = coordinator
        .create_event(
            &organizer,
            NewEvent::new(
                EventDetails::titled("Quiz Finals")
                    .on(date)
                    .between(at(10)?, at(11)?)
                    .prefer(hall_1.id, None),
            ),
        )
        .await?;
    let quiz_report = coordinator.schedule_event(&organizer, quiz.id).await?;
    if let Assignment::Reserved(booking) = quiz_report.assignment {
        coordinator.approve_booking(&coordinator_id, booking.id).await?;
    }

    // The workshop prefers Hall-1 but falls back to Hall-2
    let workshop = coordinator
        .create_event(
            &organizer,
            NewEvent::new(
                EventDetails::titled("Robotics Workshop")
                    .on(date)
                    .between(at(10)?, at(12)?)
                    .prefer(hall_1.id, Some(hall_2.id)),
            )
            .with_credit(technical.id, 10),
        )
        .await?;
    for subject in ["s-101", "s-102"] {
        coordinator
            .add_participant(workshop.id, SubjectId::from(subject))
            .await?;
    }

    let report = coordinator.schedule_event(&organizer, workshop.id).await?;
    match report.assignment {
        Assignment::Reserved(booking) => {
            info!(hall = %booking.resource_id, "Workshop booking pending approval");
            coordinator.approve_booking(&coordinator_id, booking.id).await?;
        },
        other => info!(?other, "Workshop needs a manual booking"),
    }

    // Run the event
    clock.advance(Duration::hours(2));
    coordinator.start_event(&organizer, workshop.id, false).await?;
    attendance.set(
        workshop.id,
        vec![
            AttendanceMark::present("s-101"),
            AttendanceMark::absent("s-102"),
        ],
    );
    coordinator.record_attendance(workshop.id).await?;
    clock.advance(Duration::hours(2));
    let completion = coordinator.complete_event(&organizer, workshop.id).await?;
    info!(
        certificates = completion.certificates.len(),
        credit = completion.credit_transactions.len(),
        "Workshop completed"
    );

    // Mentor decides on the credit
    let mentor = ActorId::from("mentor-rao");
    for transaction in &completion.credit_transactions {
        let approved = coordinator
            .approve_credit(&mentor, transaction.id, Some("RAO20250"))
            .await?;
        info!(subject = %approved.subject_id, points = approved.points, "Credit approved");
    }

    // Public verification
    for certificate in &completion.certificates {
        let view = coordinator.verify_certificate(&certificate.content_hash).await?;
        info!(number = %view.number, subject = %view.subject_id, revoked = view.revoked, "Certificate verified");
    }
    let miss = coordinator.verify_certificate(&"0".repeat(64)).await;
    info!(outcome = ?miss.err(), "Verification of an unknown digest");

    drop(coordinator);
    drop(bus);
    let seen = tokio::time::timeout(std::time::Duration::from_millis(200), listener)
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default();
    info!(notifications = ?seen, "Notifications published");

    Ok(())
}
