//! Shared fixtures for the engine integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use certifytrack_core::environment::AttendanceMark;
use certifytrack_core::ids::{ActorId, CategoryId, SubjectId};
use certifytrack_engine::types::{EventDetails, NewEvent, NewResource, Resource, TimeWindow};
use certifytrack_engine::{CampusCoordinator, CompletionReport, CoordinatorEnvironment, EngineConfig};
use certifytrack_testing::{InMemoryEventBus, ManualClock, StaticAttendance, StaticAuthority};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use std::sync::Arc;

pub struct Campus {
    pub coordinator: Arc<CampusCoordinator>,
    pub attendance: Arc<StaticAttendance>,
    pub bus: Arc<InMemoryEventBus>,
    pub clock: ManualClock,
}

/// Coordinator on 2025-03-01 08:00 UTC with an admin, a registrar and a
/// mentor for `s1` and `s2`.
pub fn campus() -> Campus {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap());
    let attendance = Arc::new(StaticAttendance::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let authority = StaticAuthority::new()
        .with_admin("admin")
        .with_mentor("mentor", "s1")
        .with_mentor("mentor", "s2")
        .with_certificate_manager("registrar");

    let coordinator = CampusCoordinator::new(
        &EngineConfig::default(),
        CoordinatorEnvironment {
            clock: Arc::new(clock.clone()),
            authority: Arc::new(authority),
            attendance: attendance.clone(),
            event_bus: bus.clone(),
        },
    )
    .unwrap();

    Campus {
        coordinator: Arc::new(coordinator),
        attendance,
        bus,
        clock,
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    TimeWindow::new(day(), time(start.0, start.1), time(end.0, end.1)).unwrap()
}

pub fn details(title: &str, start: (u32, u32), end: (u32, u32)) -> EventDetails {
    EventDetails::titled(title)
        .on(day())
        .between(time(start.0, start.1), time(end.0, end.1))
}

pub fn admin() -> ActorId {
    ActorId::from("admin")
}

pub fn mentor() -> ActorId {
    ActorId::from("mentor")
}

pub async fn hall(campus: &Campus, code: &str) -> Resource {
    campus
        .coordinator
        .register_resource(NewResource::new(code, code, 100, "Main block"))
        .await
        .unwrap()
}

/// Run an event with roster `s1`, `s2` through to COMPLETED with the given
/// attendance.
pub async fn completed_event(
    campus: &Campus,
    credit: Option<(CategoryId, u32)>,
    marks: Vec<AttendanceMark>,
) -> CompletionReport {
    let c = &campus.coordinator;
    let mut new_event = NewEvent::new(details("Robotics Workshop", (10, 0), (12, 0)));
    if let Some((category, points)) = credit {
        new_event = new_event.with_credit(category, points);
    }
    let event = c.create_event(&admin(), new_event).await.unwrap();
    c.add_participant(event.id, SubjectId::from("s1")).await.unwrap();
    c.add_participant(event.id, SubjectId::from("s2")).await.unwrap();
    c.schedule_event(&admin(), event.id).await.unwrap();
    c.start_event(&admin(), event.id, true).await.unwrap();
    campus.attendance.set(event.id, marks);
    c.record_attendance(event.id).await.unwrap();
    c.complete_event(&admin(), event.id).await.unwrap()
}
