//! # Resource Release Coordinator
//!
//! When a booking reaches a terminal status, its linked driver and
//! ambulance go back into the dispatch pool. Release is conditional:
//! only `OnDuty` flips to `Available` ([`ResourceStatus::released`]),
//! so a repeated release is a no-op and a resource moved to
//! `Maintenance` mid-booking keeps that status. The booking keeps its
//! resource links for history — release touches the roster, never the
//! booking.

use siaga_state::Booking;
use siaga_store::{AmbulanceStore, DriverStore};

/// What a release pass actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// The linked driver was flipped `OnDuty` -> `Available`.
    pub driver_released: bool,
    /// The linked ambulance was flipped `OnDuty` -> `Available`.
    pub ambulance_released: bool,
}

impl ReleaseOutcome {
    /// Whether anything changed.
    pub fn any(&self) -> bool {
        self.driver_released || self.ambulance_released
    }
}

/// Release the resources linked to `booking`, in memory.
///
/// Dangling links (a booking referencing a driver or ambulance that is
/// no longer in the roster) are logged and skipped — the rest of the
/// release still happens.
pub fn release_for_booking(
    drivers: &DriverStore,
    ambulances: &AmbulanceStore,
    booking: &Booking,
) -> ReleaseOutcome {
    let mut outcome = ReleaseOutcome::default();

    if let Some(driver_id) = booking.driver_id {
        match drivers.update(&driver_id, |driver| {
            if let Some(next) = driver.status.released() {
                driver.status = next;
                outcome.driver_released = true;
            }
        }) {
            Some(_) => {}
            None => {
                tracing::warn!(
                    booking_id = %booking.id,
                    driver_id = %driver_id,
                    "booking references a driver missing from the roster"
                );
            }
        }
    }

    if let Some(ambulance_id) = booking.ambulance_id {
        match ambulances.update(&ambulance_id, |ambulance| {
            if let Some(next) = ambulance.status.released() {
                ambulance.status = next;
                outcome.ambulance_released = true;
            }
        }) {
            Some(_) => {}
            None => {
                tracing::warn!(
                    booking_id = %booking.id,
                    ambulance_id = %ambulance_id,
                    "booking references an ambulance missing from the roster"
                );
            }
        }
    }

    outcome
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use siaga_core::{AmbulanceId, DriverId, Money, UserId};
    use siaga_state::{Ambulance, Driver, Priority, ResourceStatus};

    fn booking_with(driver_id: Option<DriverId>, ambulance_id: Option<AmbulanceId>) -> Booking {
        let now = Utc.with_ymd_and_hms(2026, 8, 21, 10, 0, 0).unwrap();
        let mut b = Booking::new_emergency(
            "AMB-20260821-00002",
            UserId::new(),
            Priority::Critical,
            Money::from_minor(100),
            Money::from_minor(0),
            now,
        )
        .unwrap();
        if let Some(id) = driver_id {
            b.assign_driver(id, now).unwrap();
        }
        if let Some(id) = ambulance_id {
            b.assign_ambulance(id, now).unwrap();
        }
        b
    }

    fn on_duty_driver(store: &DriverStore) -> DriverId {
        let mut driver = Driver::new("Budi");
        driver.status = ResourceStatus::OnDuty;
        let id = driver.id;
        store.insert(driver);
        id
    }

    fn on_duty_ambulance(store: &AmbulanceStore) -> AmbulanceId {
        let mut ambulance = Ambulance::new("B 4412 AMB");
        ambulance.status = ResourceStatus::OnDuty;
        let id = ambulance.id;
        store.insert(ambulance);
        id
    }

    #[test]
    fn releases_both_resources() {
        let drivers = DriverStore::new();
        let ambulances = AmbulanceStore::new();
        let driver_id = on_duty_driver(&drivers);
        let ambulance_id = on_duty_ambulance(&ambulances);
        let booking = booking_with(Some(driver_id), Some(ambulance_id));

        let outcome = release_for_booking(&drivers, &ambulances, &booking);
        assert!(outcome.driver_released);
        assert!(outcome.ambulance_released);
        assert_eq!(
            drivers.get(&driver_id).unwrap().status,
            ResourceStatus::Available
        );
        assert_eq!(
            ambulances.get(&ambulance_id).unwrap().status,
            ResourceStatus::Available
        );

        // Booking keeps its links for history.
        assert!(booking.has_resource());
    }

    #[test]
    fn repeated_release_is_a_no_op() {
        let drivers = DriverStore::new();
        let ambulances = AmbulanceStore::new();
        let driver_id = on_duty_driver(&drivers);
        let booking = booking_with(Some(driver_id), None);

        assert!(release_for_booking(&drivers, &ambulances, &booking).driver_released);
        let second = release_for_booking(&drivers, &ambulances, &booking);
        assert!(!second.any());
    }

    #[test]
    fn maintenance_and_inactive_survive_release() {
        let drivers = DriverStore::new();
        let ambulances = AmbulanceStore::new();

        let mut driver = Driver::new("Sari");
        driver.status = ResourceStatus::Maintenance;
        let driver_id = driver.id;
        drivers.insert(driver);

        let mut ambulance = Ambulance::new("B 9001 AMB");
        ambulance.status = ResourceStatus::Inactive;
        let ambulance_id = ambulance.id;
        ambulances.insert(ambulance);

        let booking = booking_with(Some(driver_id), Some(ambulance_id));
        let outcome = release_for_booking(&drivers, &ambulances, &booking);

        assert!(!outcome.any());
        assert_eq!(
            drivers.get(&driver_id).unwrap().status,
            ResourceStatus::Maintenance
        );
        assert_eq!(
            ambulances.get(&ambulance_id).unwrap().status,
            ResourceStatus::Inactive
        );
    }

    #[test]
    fn dangling_links_are_tolerated() {
        let drivers = DriverStore::new();
        let ambulances = AmbulanceStore::new();
        let booking = booking_with(Some(DriverId::new()), Some(AmbulanceId::new()));

        let outcome = release_for_booking(&drivers, &ambulances, &booking);
        assert!(!outcome.any());
    }

    #[test]
    fn booking_without_resources_releases_nothing() {
        let drivers = DriverStore::new();
        let ambulances = AmbulanceStore::new();
        let booking = booking_with(None, None);
        assert!(!release_for_booking(&drivers, &ambulances, &booking).any());
    }
}
