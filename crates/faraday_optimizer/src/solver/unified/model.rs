use tracing::debug;

use crate::{
    problem::window::AllocationProblem,
    solver::{
        allocation::model::{AllocationModel, AllocationSolution},
        charge::model::{ChargeModel, ChargeSolution},
    },
};

/// A route-energy checkpoint that only binds when its covering sequence is
/// selected: the linearization coupling allocation and scheduling variables.
/// Backends may lower it to indicator or big-M form.
#[derive(Debug, Clone)]
pub struct GatedCheckpoint {
    /// Index into the allocation model's sequences.
    pub sequence_index: usize,
    /// Index into the charge model's vehicle order.
    pub vehicle_index: usize,
    pub slot_index: usize,
    pub required_kwh: f64,
}

/// The single weighted-sum model over both stages:
/// maximize `α·(W·coverage + sequence scores) − β·(charging cost + λ·shortfall)`.
///
/// The embedded charge model carries the unconditional checkpoints
/// (committed and pre-assigned work); checkpoints for candidate sequences
/// are gated on the sequence selection variables.
#[derive(Debug, Clone)]
pub struct UnifiedModel {
    pub allocation: AllocationModel,
    pub charge: ChargeModel,
    pub gated_checkpoints: Vec<GatedCheckpoint>,
    pub allocation_weight: f64,
    pub scheduling_weight: f64,
}

impl UnifiedModel {
    pub fn build(
        allocation: AllocationModel,
        charge: ChargeModel,
        problem: &AllocationProblem,
        route_energy_safety_factor: f64,
        allocation_weight: f64,
        scheduling_weight: f64,
    ) -> UnifiedModel {
        let mut gated_checkpoints = Vec::new();

        for (sequence_index, candidate) in allocation.sequences.iter().enumerate() {
            let Some(vehicle_index) = charge
                .vehicles
                .iter()
                .position(|state| state.vehicle_id == candidate.vehicle_id)
            else {
                continue;
            };
            let state = &charge.vehicles[vehicle_index];

            let mut cumulative = 0.0;
            for &route_index in &candidate.route_indices {
                let route = &problem.routes[route_index];
                cumulative +=
                    route.mileage() * state.efficiency_kwh_per_mile * route_energy_safety_factor;

                let Some(slot_index) = charge.slots.index_at_or_after(route.plan_start()) else {
                    continue;
                };
                if slot_index == 0 {
                    continue;
                }

                let required = (cumulative - state.initial_soc_kwh).max(0.0);
                if required > 0.0 {
                    gated_checkpoints.push(GatedCheckpoint {
                        sequence_index,
                        vehicle_index,
                        slot_index,
                        required_kwh: required,
                    });
                }
            }
        }

        debug!(
            sequences = allocation.sequences.len(),
            gated_checkpoints = gated_checkpoints.len(),
            "unified model built"
        );

        UnifiedModel {
            allocation,
            charge,
            gated_checkpoints,
            allocation_weight,
            scheduling_weight,
        }
    }
}

/// Joint solution of the unified model.
#[derive(Debug, Clone)]
pub struct UnifiedSolution {
    pub allocation: AllocationSolution,
    pub charge: ChargeSolution,
}
