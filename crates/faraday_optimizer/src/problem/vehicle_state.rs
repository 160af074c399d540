use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::problem::{
    route::RouteId,
    vehicle::{Vehicle, VehicleId},
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    OnRoute,
    AtDepot,
    Charging,
    #[default]
    Unknown,
}

impl VehicleStatus {
    /// Map the telematics status labels onto the closed status set. Unknown
    /// labels degrade to [`VehicleStatus::Unknown`] rather than erroring.
    pub fn parse(label: &str) -> VehicleStatus {
        match label.to_lowercase().replace(['-', ' '], "_").as_str() {
            "on_route" | "onroute" => VehicleStatus::OnRoute,
            "at_depot" | "atdepot" | "idle" | "depot" => VehicleStatus::AtDepot,
            "charging" => VehicleStatus::Charging,
            _ => VehicleStatus::Unknown,
        }
    }
}

/// Latest telemetry for one vehicle.
#[derive(Serialize, Debug, Clone, Default)]
pub struct VehicleState {
    pub vehicle_id: VehicleId,
    pub status: VehicleStatus,
    pub estimated_soc_percent: Option<f64>,
    pub return_eta: Option<Timestamp>,
    pub return_soc_percent: Option<f64>,
    pub current_route_id: Option<RouteId>,
}

impl VehicleState {
    /// Instant from which the vehicle can take new work: its return ETA when
    /// it is out on a route, otherwise now.
    pub fn available_from(&self, now: Timestamp) -> Timestamp {
        match (self.status, self.return_eta) {
            (VehicleStatus::OnRoute, Some(eta)) => eta,
            _ => now,
        }
    }

    /// Usable energy at availability, from the better of the estimated and
    /// the projected return SOC. Without telemetry a full battery is assumed.
    pub fn available_energy_kwh(&self, vehicle: &Vehicle) -> f64 {
        let best_soc = match (self.estimated_soc_percent, self.return_soc_percent) {
            (Some(estimated), Some(projected)) => Some(estimated.max(projected)),
            (Some(estimated), None) => Some(estimated),
            (None, Some(projected)) => Some(projected),
            (None, None) => None,
        };

        match best_soc {
            Some(soc) => (soc / 100.0) * vehicle.battery_capacity_kwh(),
            None => vehicle.battery_capacity_kwh(),
        }
    }
}
