use jiff::{SignedDuration, Timestamp};

use faraday_optimizer::{
    maf::parameters::MafParameters,
    problem::{
        price_point::PriceSample,
        route::{Route, RouteBuilder},
        snapshot::DomainSnapshot,
        vehicle::{Vehicle, VehicleBuilder},
    },
    solver::unified::config::{OptimizationMode, UnifiedConfig},
};

pub const SITE_ID: i64 = 10;

pub fn now() -> Timestamp {
    "2026-02-16T04:00:00Z".parse().unwrap()
}

pub fn vehicle(id: i64, battery_kwh: f64, efficiency: f64) -> Vehicle {
    let mut builder = VehicleBuilder::default();
    builder.set_vehicle_id(id);
    builder.set_site_id(SITE_ID);
    builder.set_battery_capacity_kwh(battery_kwh);
    builder.set_efficiency_kwh_per_mile(efficiency);
    builder.set_ac_charge_rate_kw(22.0);
    builder.set_dc_charge_rate_kw(50.0);
    builder.build()
}

pub fn route(id: &str, start: &str, duration_minutes: i64, miles: f64) -> Route {
    let start: Timestamp = start.parse().unwrap();
    let mut builder = RouteBuilder::default();
    builder.set_route_id(id);
    builder.set_site_id(SITE_ID);
    builder.set_plan_start(start);
    builder.set_plan_end(start + SignedDuration::from_mins(duration_minutes));
    builder.set_mileage(miles);
    builder.set_n_orders(20);
    builder.build()
}

pub fn snapshot(vehicles: Vec<Vehicle>, routes: Vec<Route>) -> DomainSnapshot {
    let mut snapshot = DomainSnapshot {
        site_id: SITE_ID,
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

/// A flat half-hourly price feed starting at [`now`].
pub fn flat_prices(hours: i64, energy_price: f64) -> Vec<PriceSample> {
    (0..hours * 2)
        .map(|index| PriceSample {
            at: now() + SignedDuration::from_mins(30 * index),
            energy_price,
            triad: false,
            load_forecast_kw: 0.0,
        })
        .collect()
}

/// Scenario parameter defaults: no reserve vehicles and no shift cap, so
/// the window scenarios exercise turnaround and energy behavior in
/// isolation. Later entries override earlier ones.
pub fn scenario_params(extra: &[(&str, &str)]) -> MafParameters {
    let mut entries = vec![
        ("reserve_vehicle_count", "0"),
        ("constraint_shift_hours_strict_enabled", "false"),
    ];
    entries.extend_from_slice(extra);
    MafParameters::decode(entries.iter().copied())
}

pub fn config(mode: OptimizationMode) -> UnifiedConfig {
    UnifiedConfig {
        mode,
        ..UnifiedConfig::default()
    }
}
