//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the SIAGA stack.
//! Each identifier is a distinct type — a [`DriverId`] cannot be passed
//! where an [`AmbulanceId`] is expected, so a resource-release call can
//! never free the wrong kind of resource by accident.
//!
//! All identifiers are UUID-backed and valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier of a booking.
    BookingId
}

uuid_id! {
    /// Unique identifier of a payment attempt.
    PaymentId
}

uuid_id! {
    /// Unique identifier of a driver.
    DriverId
}

uuid_id! {
    /// Unique identifier of an ambulance.
    AmbulanceId
}

uuid_id! {
    /// Unique identifier of the requesting user.
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_per_construction() {
        assert_ne!(BookingId::new(), BookingId::new());
    }

    #[test]
    fn from_uuid_roundtrip() {
        let raw = Uuid::new_v4();
        let id = PaymentId::from_uuid(raw);
        assert_eq!(*id.as_uuid(), raw);
    }

    #[test]
    fn display_matches_uuid() {
        let raw = Uuid::new_v4();
        let id = DriverId::from_uuid(raw);
        assert_eq!(id.to_string(), raw.to_string());
    }

    #[test]
    fn serde_is_transparent() {
        let raw = Uuid::new_v4();
        let id = AmbulanceId::from_uuid(raw);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{raw}\""));
        let parsed: AmbulanceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
