use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tracing::{debug, warn};

use crate::problem::{
    route::{Route, RouteId},
    vehicle::VehicleId,
};

use super::state::VehicleChargeState;

/// Cumulative energy a vehicle must hold by one route's departure.
#[derive(Serialize, Debug, Clone)]
pub struct RouteEnergyRequirement {
    pub route_id: RouteId,
    pub plan_start: Timestamp,
    pub plan_end: Timestamp,
    /// This route's energy with the safety factor applied.
    pub route_energy_kwh: f64,
    /// Running total across the vehicle's routes, departure order.
    pub cumulative_energy_kwh: f64,
    pub sequence_index: usize,
    pub back_to_back: bool,
}

/// Compute per-vehicle cumulative energy checkpoints from the routes each
/// vehicle is due to run.
pub fn build_energy_requirements(
    vehicle_routes: &FxHashMap<VehicleId, Vec<Route>>,
    states: &[VehicleChargeState],
    safety_factor: f64,
    back_to_back_threshold: SignedDuration,
) -> FxHashMap<VehicleId, Vec<RouteEnergyRequirement>> {
    let mut requirements = FxHashMap::default();

    for state in states {
        let Some(routes) = vehicle_routes.get(&state.vehicle_id) else {
            continue;
        };
        if routes.is_empty() {
            continue;
        }

        let mut sorted: Vec<&Route> = routes.iter().collect();
        sorted.sort_by(|a, b| {
            a.plan_start()
                .cmp(&b.plan_start())
                .then_with(|| a.route_id().cmp(b.route_id()))
        });

        let mut cumulative = 0.0;
        let mut entries = Vec::with_capacity(sorted.len());

        for (index, route) in sorted.iter().enumerate() {
            let route_energy = route.mileage() * state.efficiency_kwh_per_mile * safety_factor;
            cumulative += route_energy;

            let back_to_back = sorted.get(index + 1).is_some_and(|next| {
                let gap = next.plan_start().duration_since(route.plan_end());
                gap < back_to_back_threshold
            });
            if back_to_back {
                warn!(
                    vehicle_id = %state.vehicle_id,
                    route_id = %route.route_id(),
                    "back-to-back routes leave little charging room"
                );
            }

            debug!(
                vehicle_id = %state.vehicle_id,
                route_id = %route.route_id(),
                route_energy_kwh = route_energy,
                cumulative_energy_kwh = cumulative,
                "route energy requirement"
            );

            entries.push(RouteEnergyRequirement {
                route_id: route.route_id().clone(),
                plan_start: route.plan_start(),
                plan_end: route.plan_end(),
                route_energy_kwh: route_energy,
                cumulative_energy_kwh: cumulative,
                sequence_index: index,
                back_to_back,
            });
        }

        requirements.insert(state.vehicle_id, entries);
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        solver::charge::state::build_charge_states,
        test_utils::{snapshot_with, test_route, test_vehicle},
    };

    #[test]
    fn test_cumulative_requirements() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 0.5)], vec![]);
        let states = build_charge_states(&snapshot);

        let mut vehicle_routes = FxHashMap::default();
        vehicle_routes.insert(
            VehicleId::new(1),
            vec![
                test_route("R2", "2026-02-16T12:00:00Z", 60, 40.0),
                test_route("R1", "2026-02-16T08:00:00Z", 60, 20.0),
            ],
        );

        let requirements = build_energy_requirements(
            &vehicle_routes,
            &states,
            1.0,
            SignedDuration::from_mins(90),
        );

        let entries = &requirements[&VehicleId::new(1)];
        assert_eq!(entries.len(), 2);
        // Sorted by departure despite input order.
        assert_eq!(entries[0].route_id, RouteId::new("R1"));
        assert_eq!(entries[0].cumulative_energy_kwh, 10.0);
        assert_eq!(entries[1].cumulative_energy_kwh, 30.0);
    }

    #[test]
    fn test_safety_factor_scales_energy() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 0.5)], vec![]);
        let states = build_charge_states(&snapshot);

        let mut vehicle_routes = FxHashMap::default();
        vehicle_routes.insert(
            VehicleId::new(1),
            vec![test_route("R1", "2026-02-16T08:00:00Z", 60, 20.0)],
        );

        let requirements = build_energy_requirements(
            &vehicle_routes,
            &states,
            1.15,
            SignedDuration::from_mins(90),
        );

        let entries = &requirements[&VehicleId::new(1)];
        assert!((entries[0].route_energy_kwh - 11.5).abs() < 1e-9);
    }

    #[test]
    fn test_back_to_back_flagged() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 0.5)], vec![]);
        let states = build_charge_states(&snapshot);

        let mut vehicle_routes = FxHashMap::default();
        vehicle_routes.insert(
            VehicleId::new(1),
            vec![
                test_route("R1", "2026-02-16T08:00:00Z", 60, 20.0),
                // Departs one hour after R1 arrives: below the 90-minute
                // threshold.
                test_route("R2", "2026-02-16T10:00:00Z", 60, 20.0),
            ],
        );

        let requirements = build_energy_requirements(
            &vehicle_routes,
            &states,
            1.0,
            SignedDuration::from_mins(90),
        );

        let entries = &requirements[&VehicleId::new(1)];
        assert!(entries[0].back_to_back);
        assert!(!entries[1].back_to_back);
    }
}
