use jiff::Timestamp;
use serde::Serialize;
use tracing::warn;

use crate::problem::{
    snapshot::DomainSnapshot,
    vehicle::VehicleId,
    vehicle_state::VehicleStatus,
};

/// Fallback when no vehicle in the fleet reports efficiency data.
pub const DEFAULT_FLEET_EFFICIENCY_KWH_PER_MILE: f64 = 0.35;

/// SOC assumed for vehicles without telemetry when scheduling charging.
const UNKNOWN_SOC_PERCENT: f64 = 50.0;

/// Everything the charge optimizer needs to know about one vehicle.
#[derive(Serialize, Debug, Clone)]
pub struct VehicleChargeState {
    pub vehicle_id: VehicleId,
    pub battery_capacity_kwh: f64,
    pub initial_soc_kwh: f64,
    pub ac_charge_rate_kw: f64,
    pub dc_charge_rate_kw: f64,
    pub efficiency_kwh_per_mile: f64,
    pub out_of_service: bool,
    pub status: VehicleStatus,
    pub return_eta: Option<Timestamp>,
}

impl VehicleChargeState {
    /// Headroom between the battery and the current charge.
    pub fn max_deliverable_kwh(&self) -> f64 {
        (self.battery_capacity_kwh - self.initial_soc_kwh).max(0.0)
    }
}

/// Mean efficiency over vehicles that report one.
pub fn fleet_average_efficiency(snapshot: &DomainSnapshot) -> f64 {
    let efficiencies: Vec<f64> = snapshot
        .vehicles
        .iter()
        .map(|vehicle| vehicle.efficiency_kwh_per_mile())
        .filter(|efficiency| *efficiency > 0.0)
        .collect();

    if efficiencies.is_empty() {
        warn!(
            fallback = DEFAULT_FLEET_EFFICIENCY_KWH_PER_MILE,
            "no vehicles with efficiency data, using fleet default"
        );
        return DEFAULT_FLEET_EFFICIENCY_KWH_PER_MILE;
    }

    efficiencies.iter().sum::<f64>() / efficiencies.len() as f64
}

/// Build charge states for every vehicle in the snapshot, ascending id.
/// Vehicles without telemetry are assumed half charged.
pub fn build_charge_states(snapshot: &DomainSnapshot) -> Vec<VehicleChargeState> {
    let fleet_efficiency = fleet_average_efficiency(snapshot);

    let mut states: Vec<VehicleChargeState> = snapshot
        .vehicles
        .iter()
        .map(|vehicle| {
            let telemetry = snapshot.states.get(&vehicle.vehicle_id());

            let soc_percent = telemetry
                .and_then(|state| state.estimated_soc_percent)
                .unwrap_or(UNKNOWN_SOC_PERCENT);

            let efficiency = if vehicle.efficiency_kwh_per_mile() > 0.0 {
                vehicle.efficiency_kwh_per_mile()
            } else {
                fleet_efficiency
            };

            VehicleChargeState {
                vehicle_id: vehicle.vehicle_id(),
                battery_capacity_kwh: vehicle.battery_capacity_kwh(),
                initial_soc_kwh: (soc_percent / 100.0) * vehicle.battery_capacity_kwh(),
                ac_charge_rate_kw: vehicle.ac_charge_rate_kw(),
                dc_charge_rate_kw: vehicle.dc_charge_rate_kw(),
                efficiency_kwh_per_mile: efficiency,
                out_of_service: vehicle.is_out_of_service(),
                status: telemetry.map(|state| state.status).unwrap_or_default(),
                return_eta: telemetry.and_then(|state| state.return_eta),
            }
        })
        .collect();

    states.sort_by_key(|state| state.vehicle_id);
    states
}
