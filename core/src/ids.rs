//! Identifiers shared by every CertifyTrack component.
//!
//! Records created by the engine (resources, events, bookings, credit
//! transactions, certificates, categories) get random UUID identifiers.
//! People (actors and participants) are owned by the identity collaborator
//! and arrive as opaque strings such as a roll number or a login name.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Wrap an external identifier as a `", stringify!($name), "`")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a bookable resource (hall)
    ResourceId
);

uuid_id!(
    /// Unique identifier for a campus event
    EventId
);

uuid_id!(
    /// Unique identifier for a hall booking
    BookingId
);

uuid_id!(
    /// Unique identifier for a point-credit transaction
    CreditTransactionId
);

uuid_id!(
    /// Unique identifier for an issued certificate
    CertificateId
);

uuid_id!(
    /// Unique identifier for a credit category
    CategoryId
);

string_id!(
    /// Identity of whoever performs an operation (organizer, coordinator, mentor, admin)
    ActorId
);

string_id!(
    /// Identity of a participant (the subject of credit and certificates)
    SubjectId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique_and_round_trip_through_uuid() {
        let a = BookingId::new();
        let b = BookingId::new();
        assert_ne!(a, b);
        assert_eq!(BookingId::from_uuid(*a.as_uuid()), a);
    }

    #[test]
    fn string_ids_display_verbatim() {
        let subject = SubjectId::from("1RV21CS042");
        assert_eq!(subject.to_string(), "1RV21CS042");
        assert_eq!(subject.as_str(), "1RV21CS042");
        assert_eq!(ActorId::new("mentor-7"), ActorId::from("mentor-7"));
    }
}
