use fxhash::FxHashMap;
use jiff::SignedDuration;
use tracing::debug;

use crate::problem::{
    route::Route,
    time_slot::TimeSlots,
    vehicle::VehicleId,
    vehicle_state::VehicleStatus,
};

use super::state::VehicleChargeState;

/// Per-slot charging availability for one vehicle.
#[derive(Debug, Clone)]
pub struct AvailabilityMatrix {
    slots: Vec<bool>,
}

impl AvailabilityMatrix {
    pub fn is_available(&self, slot_index: usize) -> bool {
        self.slots.get(slot_index).copied().unwrap_or(false)
    }

    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|available| **available).count()
    }

    pub fn slots(&self) -> &[bool] {
        &self.slots
    }
}

/// Derive when each vehicle can draw power: never while out of service,
/// not before its return ETA when out on a route, and not while running (or
/// preparing to run) a planned route.
pub fn build_availability_matrices(
    states: &[VehicleChargeState],
    vehicle_routes: &FxHashMap<VehicleId, Vec<Route>>,
    slots: &TimeSlots,
    departure_buffer: SignedDuration,
) -> FxHashMap<VehicleId, AvailabilityMatrix> {
    let mut matrices = FxHashMap::default();

    for state in states {
        let mut available = vec![true; slots.len()];

        if state.out_of_service {
            available.fill(false);
        } else {
            if state.status == VehicleStatus::OnRoute
                && let Some(return_eta) = state.return_eta
            {
                for (index, slot_start) in slots.iter().enumerate() {
                    if slot_start < return_eta {
                        available[index] = false;
                    }
                }
            }

            for route in vehicle_routes.get(&state.vehicle_id).into_iter().flatten() {
                let blocked_from = route.plan_start() - departure_buffer;
                let blocked_until = route.plan_end();
                for (index, slot_start) in slots.iter().enumerate() {
                    if blocked_from <= slot_start && slot_start < blocked_until {
                        available[index] = false;
                    }
                }
            }
        }

        let matrix = AvailabilityMatrix { slots: available };
        debug!(
            vehicle_id = %state.vehicle_id,
            available = matrix.available_count(),
            total = slots.len(),
            "availability matrix built"
        );
        matrices.insert(state.vehicle_id, matrix);
    }

    matrices
}
