use fxhash::FxHashMap;
use jiff::Timestamp;

use crate::problem::{
    route::{Route, RouteId},
    vehicle::{Vehicle, VehicleId},
    window::VehicleAvailability,
};

/// Shared context for constraint evaluation: everything a constraint may
/// need beyond the (vehicle, sequence) pair itself.
pub struct EvaluationContext<'a> {
    pub now: Timestamp,
    /// Every eligible route in the window, for global-ranking constraints.
    pub all_routes: &'a [Route],
    /// Every allocation-candidate vehicle, in snapshot order.
    pub all_vehicles: &'a [Vehicle],
    pub availability: &'a FxHashMap<VehicleId, VehicleAvailability>,
    /// Charger each vehicle currently occupies; absent means disconnected.
    pub vehicle_chargers: &'a FxHashMap<VehicleId, Option<i64>>,
    /// Most recent prior allocation per route inside the swap lookback.
    pub previous_allocations: &'a FxHashMap<RouteId, VehicleId>,
}

impl EvaluationContext<'_> {
    /// Energy the vehicle brings into its first route.
    pub fn starting_energy_kwh(&self, vehicle: &Vehicle) -> f64 {
        self.availability
            .get(&vehicle.vehicle_id())
            .map(|availability| availability.available_energy_kwh)
            .unwrap_or_else(|| vehicle.battery_capacity_kwh())
    }
}
