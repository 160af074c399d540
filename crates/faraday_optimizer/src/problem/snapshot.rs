use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use tracing::{info, warn};

use crate::{
    error::SourceError,
    problem::{
        price_point::PriceSample,
        route::{Route, RouteId, RouteStatus},
        vehicle::{Vehicle, VehicleId},
        vehicle_state::VehicleState,
    },
    sources::DomainSource,
};

/// The immutable domain snapshot a run computes over. A re-plan triggered by
/// an external event always loads a fresh snapshot.
#[derive(Debug, Clone, Default)]
pub struct DomainSnapshot {
    pub site_id: i64,
    pub vehicles: Vec<Vehicle>,
    pub states: FxHashMap<VehicleId, VehicleState>,
    pub routes: Vec<Route>,
    pub committed: Vec<(RouteId, VehicleId)>,
    pub previous_allocations: FxHashMap<RouteId, VehicleId>,
    pub prices: Vec<PriceSample>,
    pub vehicle_chargers: FxHashMap<VehicleId, Option<i64>>,
    /// Diagnostic tags for records dropped during sanitation.
    pub dropped: Vec<String>,
}

impl DomainSnapshot {
    pub fn load(
        source: &dyn DomainSource,
        site_id: i64,
        window_start: Timestamp,
        window_end: Timestamp,
        swap_lookback: SignedDuration,
    ) -> Result<DomainSnapshot, SourceError> {
        let vehicles = source.list_vehicles(site_id)?;
        let states = source.latest_vehicle_states(site_id)?;
        let routes = source.list_routes_in_window(site_id, window_start, window_end)?;
        let committed = source.list_committed_allocations(site_id, window_start, window_end)?;
        let prices = source.prices_and_forecast(window_start, window_end)?;
        let chargers = source.vehicle_chargers(site_id, window_start)?;

        let mut snapshot = DomainSnapshot {
            site_id,
            committed,
            prices,
            ..DomainSnapshot::default()
        };

        for vehicle in vehicles {
            if vehicle.battery_capacity_kwh() <= 0.0 {
                warn!(
                    vehicle_id = %vehicle.vehicle_id(),
                    "dropping vehicle with non-positive battery capacity"
                );
                snapshot
                    .dropped
                    .push(format!("vehicle:{}:zero_battery", vehicle.vehicle_id()));
                continue;
            }
            snapshot.vehicles.push(vehicle);
        }

        for route in routes {
            if route.plan_end() < route.plan_start() {
                warn!(route_id = %route.route_id(), "dropping route ending before it starts");
                snapshot
                    .dropped
                    .push(format!("route:{}:inverted_plan", route.route_id()));
                continue;
            }
            snapshot.routes.push(route);
        }

        // Deterministic order regardless of source order.
        snapshot
            .vehicles
            .sort_by_key(|vehicle| vehicle.vehicle_id());
        snapshot.routes.sort_by(|a, b| {
            a.plan_start()
                .cmp(&b.plan_start())
                .then_with(|| a.route_id().cmp(b.route_id()))
        });

        for state in states {
            snapshot.states.insert(state.vehicle_id, state);
        }
        for (vehicle_id, charger_id) in chargers {
            snapshot.vehicle_chargers.insert(vehicle_id, charger_id);
        }

        let since = window_start - swap_lookback;
        for route in &snapshot.routes {
            if route.status() == RouteStatus::New
                && let Some(vehicle_id) = source.previous_allocation(route.route_id(), since)?
            {
                snapshot
                    .previous_allocations
                    .insert(route.route_id().clone(), vehicle_id);
            }
        }

        info!(
            site_id,
            vehicles = snapshot.vehicles.len(),
            routes = snapshot.routes.len(),
            committed = snapshot.committed.len(),
            price_samples = snapshot.prices.len(),
            dropped = snapshot.dropped.len(),
            "domain snapshot loaded"
        );

        Ok(snapshot)
    }

    pub fn vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.vehicle_id() == vehicle_id)
    }

    pub fn route(&self, route_id: &RouteId) -> Option<&Route> {
        self.routes.iter().find(|route| route.route_id() == route_id)
    }
}
