//! # Dispatch Resources — Drivers and Ambulances
//!
//! A resource is exclusively linked to at most one active booking at a
//! time; once that booking ends (terminal, or lapsed for non-payment)
//! it goes back into the pool. Release flips `OnDuty` to `Available`
//! and nothing else — the manual `Maintenance` and `Inactive` workflows
//! are never overridden by the automatic release path.

use serde::{Deserialize, Serialize};

use siaga_core::{AmbulanceId, DriverId};

/// Availability status of a driver or ambulance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Free for assignment.
    Available,
    /// Linked to an active booking.
    OnDuty,
    /// Under maintenance (manual workflow).
    Maintenance,
    /// Removed from the fleet roster (manual workflow).
    Inactive,
}

impl ResourceStatus {
    /// Return the canonical string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::OnDuty => "ON_DUTY",
            Self::Maintenance => "MAINTENANCE",
            Self::Inactive => "INACTIVE",
        }
    }

    /// The status after an automatic release, or `None` when release
    /// must not touch this resource.
    ///
    /// `Available` returns `None` so a repeated release is a no-op, and
    /// the manual statuses return `None` so a maintenance flag set
    /// mid-booking survives the booking's cancellation.
    pub fn released(&self) -> Option<ResourceStatus> {
        match self {
            Self::OnDuty => Some(Self::Available),
            Self::Available | Self::Maintenance | Self::Inactive => None,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A driver in the fleet roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    /// Unique driver identifier.
    pub id: DriverId,
    /// Display name.
    pub name: String,
    /// Current availability.
    pub status: ResourceStatus,
}

impl Driver {
    /// Create an available driver.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: DriverId::new(),
            name: name.into(),
            status: ResourceStatus::Available,
        }
    }
}

/// An ambulance in the fleet roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ambulance {
    /// Unique ambulance identifier.
    pub id: AmbulanceId,
    /// Registration plate.
    pub plate_number: String,
    /// Current availability.
    pub status: ResourceStatus,
}

impl Ambulance {
    /// Create an available ambulance.
    pub fn new(plate_number: impl Into<String>) -> Self {
        Self {
            id: AmbulanceId::new(),
            plate_number: plate_number.into(),
            status: ResourceStatus::Available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_frees_on_duty_only() {
        assert_eq!(
            ResourceStatus::OnDuty.released(),
            Some(ResourceStatus::Available)
        );
        assert_eq!(ResourceStatus::Available.released(), None);
        assert_eq!(ResourceStatus::Maintenance.released(), None);
        assert_eq!(ResourceStatus::Inactive.released(), None);
    }

    #[test]
    fn new_resources_start_available() {
        assert_eq!(Driver::new("Budi").status, ResourceStatus::Available);
        assert_eq!(Ambulance::new("B 1234 XYZ").status, ResourceStatus::Available);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ResourceStatus::OnDuty).unwrap(),
            "\"ON_DUTY\""
        );
    }
}
