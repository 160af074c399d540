use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};

use crate::{
    maf::parameters::{ConstraintConfig, MafParameters},
    problem::{
        route::{Route, RouteBuilder, RouteId},
        snapshot::DomainSnapshot,
        vehicle::{Vehicle, VehicleBuilder, VehicleId},
        window::VehicleAvailability,
    },
    solver::constraints::evaluation_context::EvaluationContext,
};

pub const TEST_SITE_ID: i64 = 10;

pub fn test_now() -> Timestamp {
    "2026-02-16T04:00:00Z".parse().unwrap()
}

pub fn test_vehicle(id: i64, battery_kwh: f64, efficiency: f64) -> Vehicle {
    let mut builder = VehicleBuilder::default();
    builder.set_vehicle_id(id);
    builder.set_site_id(TEST_SITE_ID);
    builder.set_battery_capacity_kwh(battery_kwh);
    builder.set_efficiency_kwh_per_mile(efficiency);
    builder.build()
}

pub fn test_route(id: &str, start: &str, duration_minutes: i64, miles: f64) -> Route {
    let start: Timestamp = start.parse().unwrap();
    let mut builder = RouteBuilder::default();
    builder.set_route_id(id);
    builder.set_site_id(TEST_SITE_ID);
    builder.set_plan_start(start);
    builder.set_plan_end(start + SignedDuration::from_mins(duration_minutes));
    builder.set_mileage(miles);
    builder.set_n_orders(20);
    builder.build()
}

pub fn parameters_from(entries: &[(&str, &str)]) -> MafParameters {
    MafParameters::decode(entries.iter().copied())
}

pub fn constraint_config_from(name: &str, entries: &[(&str, &str)]) -> ConstraintConfig {
    parameters_from(entries).constraint_config(name)
}

/// An enabled constraint config with the given penalty and no extra
/// parameters.
pub fn default_constraint_config(penalty: f64) -> ConstraintConfig {
    let penalty_value = penalty.to_string();
    let entries = vec![
        ("constraint_test_enabled".to_owned(), "true".to_owned()),
        ("constraint_test_penalty".to_owned(), penalty_value),
    ];
    MafParameters::decode(entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .constraint_config("test")
}

/// Owns the maps an [`EvaluationContext`] borrows. Vehicles start fully
/// charged and available from [`test_now`].
pub struct EvaluationFixture {
    pub now: Timestamp,
    pub vehicles: Vec<Vehicle>,
    pub routes: Vec<Route>,
    pub availability: FxHashMap<VehicleId, VehicleAvailability>,
    pub chargers: FxHashMap<VehicleId, Option<i64>>,
    pub previous: FxHashMap<RouteId, VehicleId>,
}

impl EvaluationFixture {
    pub fn context(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            now: self.now,
            all_routes: &self.routes,
            all_vehicles: &self.vehicles,
            availability: &self.availability,
            vehicle_chargers: &self.chargers,
            previous_allocations: &self.previous,
        }
    }
}

pub fn evaluation_fixture(vehicles: Vec<Vehicle>, routes: Vec<Route>) -> EvaluationFixture {
    let now = test_now();
    let availability = vehicles
        .iter()
        .map(|vehicle| {
            (
                vehicle.vehicle_id(),
                VehicleAvailability {
                    available_from: now,
                    available_energy_kwh: vehicle.battery_capacity_kwh(),
                },
            )
        })
        .collect();

    EvaluationFixture {
        now,
        vehicles,
        routes,
        availability,
        chargers: FxHashMap::default(),
        previous: FxHashMap::default(),
    }
}

/// A snapshot with full-battery defaults, no telemetry and no committed
/// work.
pub fn snapshot_with(vehicles: Vec<Vehicle>, routes: Vec<Route>) -> DomainSnapshot {
    let mut snapshot = DomainSnapshot {
        site_id: TEST_SITE_ID,
        vehicles,
        routes,
        ..DomainSnapshot::default()
    };
    snapshot.vehicles.sort_by_key(|vehicle| vehicle.vehicle_id());
    snapshot.routes.sort_by(|a, b| {
        a.plan_start()
            .cmp(&b.plan_start())
            .then_with(|| a.route_id().cmp(b.route_id()))
    });
    snapshot
}
