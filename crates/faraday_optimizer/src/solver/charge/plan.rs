use schemars::JsonSchema;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::RunError,
    problem::{route::RouteId, time_slot::SLOT_HOURS, vehicle::VehicleId},
    solver::allocation::model::SolveStatus,
};

use super::model::{ChargeModel, ChargeSolution};

/// Threshold below which a slot's power is considered noise and omitted.
const NEGLIGIBLE_POWER_KW: f64 = 0.01;

const ENERGY_EPSILON: f64 = 1e-6;

/// One charging slot of a vehicle's schedule.
#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
pub struct ChargeSlot {
    pub slot_index: usize,
    pub power_kw: f64,
    /// Energy delivered through the end of this slot.
    pub cumulative_energy_kwh: f64,
    pub energy_price: f64,
    pub triad: bool,
}

/// A vehicle's half-hourly charging schedule.
#[derive(Serialize, JsonSchema, Debug, Clone)]
pub struct VehicleChargeSchedule {
    pub vehicle_id: VehicleId,
    pub initial_soc_kwh: f64,
    pub target_soc_kwh: f64,
    pub energy_needed_kwh: f64,
    pub scheduled_energy_kwh: f64,
    pub shortfall_kwh: f64,
    pub has_routes: bool,
    pub slots: Vec<ChargeSlot>,
}

/// The complete charge plan for a site and window.
#[derive(Serialize, JsonSchema, Debug, Clone)]
pub struct ChargePlan {
    pub schedules: Vec<VehicleChargeSchedule>,
    pub total_energy_kwh: f64,
    pub total_cost: f64,
    pub solve_status: SolveStatus,
    pub fallback: bool,
    /// Route departures whose energy requirement the schedule misses.
    pub checkpoint_misses: Vec<RouteId>,
    pub tags: Vec<String>,
}

impl ChargePlan {
    /// Whether every route departure is energetically covered.
    pub fn meets_all_checkpoints(&self) -> bool {
        self.checkpoint_misses.is_empty()
    }

    pub fn total_shortfall_kwh(&self) -> f64 {
        self.schedules
            .iter()
            .map(|schedule| schedule.shortfall_kwh)
            .sum()
    }

    /// Turn a solved power matrix into the emitted plan.
    ///
    /// Physical invariants (non-negative power within rate, silence while
    /// unavailable, cumulative energy within battery headroom) are enforced
    /// here; a violation is a programmer error in the solver stage and
    /// aborts the run. Checkpoint misses are not errors: the plan is emitted
    /// partial and the misses reported.
    pub fn from_solution(model: &ChargeModel, solution: &ChargeSolution) -> Result<ChargePlan, RunError> {
        let slot_count = model.slots.len();
        let mut schedules = Vec::with_capacity(model.vehicles.len());
        let mut checkpoint_misses = Vec::new();
        let mut total_energy = 0.0;
        let mut total_cost = 0.0;

        for (vehicle_index, state) in model.vehicles.iter().enumerate() {
            let row = &solution.power[vehicle_index];
            if row.len() != slot_count {
                return Err(RunError::Fatal(format!(
                    "power row for vehicle {} has {} slots, expected {slot_count}",
                    state.vehicle_id,
                    row.len()
                )));
            }

            let mut cumulative = vec![0.0; slot_count];
            let mut running = 0.0;

            for (slot_index, &power_kw) in row.iter().enumerate() {
                if power_kw < -ENERGY_EPSILON {
                    return Err(RunError::Fatal(format!(
                        "negative charge power for vehicle {} at slot {slot_index}",
                        state.vehicle_id
                    )));
                }
                if power_kw > state.ac_charge_rate_kw + ENERGY_EPSILON {
                    return Err(RunError::Fatal(format!(
                        "charge power above rate for vehicle {} at slot {slot_index}",
                        state.vehicle_id
                    )));
                }
                if power_kw > ENERGY_EPSILON && !model.availability[vehicle_index][slot_index] {
                    return Err(RunError::Fatal(format!(
                        "charge power while vehicle {} unavailable at slot {slot_index}",
                        state.vehicle_id
                    )));
                }

                running += power_kw * SLOT_HOURS;
                cumulative[slot_index] = running;
            }

            if running > state.max_deliverable_kwh() + ENERGY_EPSILON {
                return Err(RunError::Fatal(format!(
                    "vehicle {} charged past battery capacity",
                    state.vehicle_id
                )));
            }

            for checkpoint in &model.checkpoints[vehicle_index] {
                let by_departure = cumulative[checkpoint.slot_index - 1];
                if by_departure + ENERGY_EPSILON < checkpoint.required_kwh {
                    warn!(
                        vehicle_id = %state.vehicle_id,
                        route_id = %checkpoint.route_id,
                        required_kwh = checkpoint.required_kwh,
                        scheduled_kwh = by_departure,
                        "charge schedule misses a route energy requirement"
                    );
                    checkpoint_misses.push(checkpoint.route_id.clone());
                }
            }

            let mut slots = Vec::new();
            let mut emitted = 0.0;
            for (slot_index, &power_kw) in row.iter().enumerate() {
                if power_kw <= NEGLIGIBLE_POWER_KW {
                    continue;
                }
                let point = model.prices[slot_index];
                let energy = power_kw * SLOT_HOURS;
                emitted += energy;
                total_energy += energy;
                total_cost += energy * point.energy_price;

                slots.push(ChargeSlot {
                    slot_index,
                    power_kw,
                    cumulative_energy_kwh: emitted,
                    energy_price: point.energy_price,
                    triad: point.triad,
                });
            }

            let shortfall_ceiling = (model.target_soc_kwh[vehicle_index] - state.initial_soc_kwh).max(0.0);
            let shortfall = (model.target_soc_kwh[vehicle_index] - state.initial_soc_kwh - running)
                .max(0.0)
                .min(shortfall_ceiling);

            schedules.push(VehicleChargeSchedule {
                vehicle_id: state.vehicle_id,
                initial_soc_kwh: state.initial_soc_kwh,
                target_soc_kwh: model.target_soc_kwh[vehicle_index],
                energy_needed_kwh: model.energy_needed_kwh(vehicle_index),
                scheduled_energy_kwh: emitted,
                shortfall_kwh: shortfall,
                has_routes: model.route_energy_kwh[vehicle_index] > 0.0,
                slots,
            });
        }

        let plan = ChargePlan {
            schedules,
            total_energy_kwh: total_energy,
            total_cost,
            solve_status: solution.status,
            fallback: solution.status == SolveStatus::GreedyFallback,
            checkpoint_misses,
            tags: Vec::new(),
        };

        info!(
            vehicles = plan.schedules.len(),
            total_energy_kwh = plan.total_energy_kwh,
            total_cost = plan.total_cost,
            checkpoint_misses = plan.checkpoint_misses.len(),
            "charge plan assembled"
        );

        Ok(plan)
    }
}
