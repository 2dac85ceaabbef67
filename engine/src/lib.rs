//! # CertifyTrack Engine
//!
//! Hall scheduling, approval workflows, event lifecycle and certificate
//! issuance for campus events.
//!
//! ## Components
//!
//! - **Resource catalog** ([`catalog`]): bookable halls
//! - **Interval scheduler** ([`scheduler`]): free halls for a window,
//!   reservations, booking decisions
//! - **Approval engine** ([`approval`]): one PENDING → APPROVED | REJECTED
//!   state machine shared by bookings and credit transactions
//! - **Event lifecycle** ([`lifecycle`]): reducer over an explicit transition
//!   table that decides which side effects a transition triggers
//! - **Credit ledger** ([`credit`]): categories and mentor-approved point credit
//! - **Certificate registry** ([`certificate`]): attendance-gated,
//!   hash-verifiable certificates
//! - **Audit log** ([`audit`]): append-only trail of every decision
//!
//! [`CampusCoordinator`] wires them together and is what callers use.
//!
//! ## Example
//!
//! ```
//! use certifytrack_engine::{CampusCoordinator, CoordinatorEnvironment, EngineConfig};
//! use certifytrack_engine::types::{EventDetails, NewEvent, NewResource};
//! use certifytrack_core::ids::ActorId;
//! use certifytrack_testing::{InMemoryEventBus, StaticAttendance, StaticAuthority, test_clock};
//! use chrono::{NaiveDate, NaiveTime};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = CampusCoordinator::new(
//!     &EngineConfig::default(),
//!     CoordinatorEnvironment {
//!         clock: Arc::new(test_clock()),
//!         authority: Arc::new(StaticAuthority::new().with_admin("admin")),
//!         attendance: Arc::new(StaticAttendance::new()),
//!         event_bus: Arc::new(InMemoryEventBus::new()),
//!     },
//! )?;
//!
//! let hall = coordinator
//!     .register_resource(NewResource::new("SH-1", "Seminar Hall 1", 100, "Block A"))
//!     .await?;
//! let details = EventDetails::titled("Robotics Workshop")
//!     .on(NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("date")?)
//!     .between(
//!         NaiveTime::from_hms_opt(10, 0, 0).ok_or("time")?,
//!         NaiveTime::from_hms_opt(11, 0, 0).ok_or("time")?,
//!     )
//!     .prefer(hall.id, None);
//!
//! let admin = ActorId::from("admin");
//! let event = coordinator.create_event(&admin, NewEvent::new(details)).await?;
//! let report = coordinator.schedule_event(&admin, event.id).await?;
//! println!("{:?}", report.assignment);
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub mod audit;
pub mod catalog;
pub mod certificate;
pub mod config;
pub mod coordinator;
pub mod credit;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod notifications;
pub mod scheduler;
pub mod types;

pub use config::EngineConfig;
pub use coordinator::{CampusCoordinator, CompletionReport, CoordinatorEnvironment, SchedulingReport};
pub use error::{DomainError, Result, TargetType};
pub use scheduler::Assignment;
