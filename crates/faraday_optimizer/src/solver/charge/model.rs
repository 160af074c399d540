use fxhash::FxHashMap;
use tracing::{debug, warn};

use crate::{
    maf::site_config::SiteConfig,
    problem::{
        price_point::{PriceCurve, PricePoint},
        route::RouteId,
        time_slot::TimeSlots,
        vehicle::VehicleId,
    },
    solver::allocation::model::SolveStatus,
};

use super::{
    availability::AvailabilityMatrix, requirements::RouteEnergyRequirement,
    state::VehicleChargeState,
};

/// A route departure the cumulative energy curve must clear: by the end of
/// slot `slot_index - 1` the vehicle must have received `required_kwh`.
#[derive(Debug, Clone)]
pub struct ChargeCheckpoint {
    pub route_id: RouteId,
    pub slot_index: usize,
    pub required_kwh: f64,
}

/// The continuous charge-scheduling model over `(slot, vehicle)` power
/// variables.
///
/// Decision shape for an external backend: `p[t,v] ∈ [0, rate_v]` (zero when
/// unavailable), cumulative energy bounded by battery headroom, checkpoint
/// rows from `checkpoints`, per-slot capacity rows from `capacity_kw`, and
/// the objective `Σ slot_costs[t]·p[t,v]·Δ + penalty·Σ shortfall[v]`.
#[derive(Debug, Clone)]
pub struct ChargeModel {
    pub slots: TimeSlots,
    /// Ascending vehicle id; indices below refer to this order.
    pub vehicles: Vec<VehicleChargeState>,
    pub prices: Vec<PricePoint>,
    /// Effective per-slot cost: energy price + synthetic time price + triad
    /// penalty.
    pub slot_costs: Vec<f64>,
    /// Headroom left by the site demand forecast, per slot.
    pub capacity_kw: Vec<f64>,
    /// `[vehicle][slot]` charging availability.
    pub availability: Vec<Vec<bool>>,
    /// Per vehicle, departure-ordered checkpoints net of initial SOC.
    pub checkpoints: Vec<Vec<ChargeCheckpoint>>,
    /// Final cumulative route energy per vehicle (gross, not net of SOC).
    pub route_energy_kwh: Vec<f64>,
    /// Target-SOC energy per vehicle.
    pub target_soc_kwh: Vec<f64>,
    pub shortfall_penalty: f64,
    /// Kept separate from `slot_costs` for the greedy ordering, which uses
    /// price plus triad penalty only.
    pub triad_penalty_factor: f64,
}

impl ChargeModel {
    pub fn build(
        slots: TimeSlots,
        curve: &PriceCurve,
        vehicles: Vec<VehicleChargeState>,
        requirements: &FxHashMap<VehicleId, Vec<RouteEnergyRequirement>>,
        availability: &FxHashMap<VehicleId, AvailabilityMatrix>,
        config: &SiteConfig,
    ) -> ChargeModel {
        let slot_count = slots.len();

        let prices: Vec<PricePoint> = (0..slot_count).map(|index| curve.get(index)).collect();

        let slot_costs: Vec<f64> = prices
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let synthetic = config.synthetic_time_price_factor
                    * (slot_count - index) as f64
                    / slot_count as f64;
                let triad = if point.triad {
                    config.triad_penalty_factor
                } else {
                    0.0
                };
                point.energy_price + synthetic + triad
            })
            .collect();

        let capacity_kw: Vec<f64> = prices
            .iter()
            .map(|point| (config.site_capacity_kw - point.load_forecast_kw).max(0.0))
            .collect();

        let mut availability_rows = Vec::with_capacity(vehicles.len());
        let mut checkpoint_rows = Vec::with_capacity(vehicles.len());
        let mut route_energy_kwh = Vec::with_capacity(vehicles.len());
        let mut target_soc_kwh = Vec::with_capacity(vehicles.len());

        for state in &vehicles {
            availability_rows.push(
                availability
                    .get(&state.vehicle_id)
                    .map(|matrix| matrix.slots().to_vec())
                    .unwrap_or_else(|| vec![true; slot_count]),
            );

            let vehicle_requirements = requirements
                .get(&state.vehicle_id)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut rows = Vec::new();
            for requirement in vehicle_requirements {
                let Some(slot_index) = slots.index_at_or_after(requirement.plan_start) else {
                    warn!(
                        vehicle_id = %state.vehicle_id,
                        route_id = %requirement.route_id,
                        "route departure outside the slot grid, checkpoint skipped"
                    );
                    continue;
                };
                if slot_index == 0 {
                    // No charging can precede the first slot.
                    continue;
                }

                let required = (requirement.cumulative_energy_kwh - state.initial_soc_kwh).max(0.0);
                if required > 0.0 {
                    rows.push(ChargeCheckpoint {
                        route_id: requirement.route_id.clone(),
                        slot_index,
                        required_kwh: required,
                    });
                }
            }
            checkpoint_rows.push(rows);

            route_energy_kwh.push(
                vehicle_requirements
                    .last()
                    .map(|requirement| requirement.cumulative_energy_kwh)
                    .unwrap_or(0.0),
            );
            target_soc_kwh.push((config.target_soc_percent / 100.0) * state.battery_capacity_kwh);
        }

        debug!(
            vehicles = vehicles.len(),
            slots = slot_count,
            checkpoints = checkpoint_rows.iter().map(Vec::len).sum::<usize>(),
            "charge model built"
        );

        ChargeModel {
            slots,
            vehicles,
            prices,
            slot_costs,
            capacity_kw,
            availability: availability_rows,
            checkpoints: checkpoint_rows,
            route_energy_kwh,
            target_soc_kwh,
            shortfall_penalty: config.target_soc_shortfall_penalty,
            triad_penalty_factor: config.triad_penalty_factor,
        }
    }

    /// Energy the vehicle must receive in total: enough for its routes and
    /// the target SOC, bounded by battery headroom.
    pub fn energy_needed_kwh(&self, vehicle_index: usize) -> f64 {
        let state = &self.vehicles[vehicle_index];
        let gross_target = self.route_energy_kwh[vehicle_index].max(self.target_soc_kwh[vehicle_index]);
        (gross_target - state.initial_soc_kwh)
            .max(0.0)
            .min(state.max_deliverable_kwh())
    }
}

/// Per-vehicle, per-slot power assignment produced by a charge solve.
#[derive(Debug, Clone)]
pub struct ChargeSolution {
    /// `[vehicle][slot]` power in kW, aligned with the model's vehicle
    /// order.
    pub power: Vec<Vec<f64>>,
    pub status: SolveStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::price_point::{PriceCurve, PriceSample},
        solver::charge::{
            availability::build_availability_matrices, requirements::build_energy_requirements,
            state::build_charge_states,
        },
        test_utils::{snapshot_with, test_route, test_vehicle},
    };
    use jiff::SignedDuration;

    fn build_simple_model(route_miles: f64) -> ChargeModel {
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 1.0)], vec![]);
        let mut states = build_charge_states(&snapshot);
        states[0].initial_soc_kwh = 20.0;

        let slots = TimeSlots::build(
            "2026-02-16T04:00:00Z".parse().unwrap(),
            "2026-02-16T16:00:00Z".parse().unwrap(),
        );
        let curve = PriceCurve::align(&slots, &[]);

        let mut vehicle_routes = FxHashMap::default();
        vehicle_routes.insert(
            VehicleId::new(1),
            vec![test_route(
                "R1",
                "2026-02-16T09:00:00Z",
                60,
                route_miles,
            )],
        );

        let requirements = build_energy_requirements(
            &vehicle_routes,
            &states,
            1.0,
            SignedDuration::from_mins(90),
        );
        let availability = build_availability_matrices(
            &states,
            &FxHashMap::default(),
            &slots,
            SignedDuration::from_mins(60),
        );

        ChargeModel::build(
            slots,
            &curve,
            states,
            &requirements,
            &availability,
            &SiteConfig {
                target_soc_percent: 75.0,
                ..SiteConfig::default()
            },
        )
    }

    #[test]
    fn test_checkpoint_net_of_initial_soc() {
        let model = build_simple_model(80.0);

        // 80 kWh route minus 20 kWh on board: 60 kWh by slot 10 (09:00).
        assert_eq!(model.checkpoints[0].len(), 1);
        let checkpoint = &model.checkpoints[0][0];
        assert_eq!(checkpoint.slot_index, 10);
        assert!((checkpoint.required_kwh - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_needed_takes_max_of_route_and_target() {
        // Route needs 80 gross; target is 75: route dominates.
        let model = build_simple_model(80.0);
        assert!((model.energy_needed_kwh(0) - 60.0).abs() < 1e-9);

        // Tiny route; target SOC dominates: 75 - 20 = 55.
        let model = build_simple_model(10.0);
        assert!((model.energy_needed_kwh(0) - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthetic_price_prefers_early_slots() {
        let model = build_simple_model(80.0);
        assert!(model.slot_costs[0] > model.slot_costs[1]);
        assert!(model.slot_costs[1] > model.slot_costs[23]);
    }

    #[test]
    fn test_capacity_subtracts_forecast() {
        let slots = TimeSlots::build(
            "2026-02-16T04:00:00Z".parse().unwrap(),
            "2026-02-16T05:00:00Z".parse().unwrap(),
        );
        let curve = PriceCurve::align(
            &slots,
            &[PriceSample {
                at: "2026-02-16T04:00:00Z".parse().unwrap(),
                energy_price: 0.1,
                triad: false,
                load_forecast_kw: 150.0,
            }],
        );

        let model = ChargeModel::build(
            slots,
            &curve,
            vec![],
            &FxHashMap::default(),
            &FxHashMap::default(),
            &SiteConfig::default(),
        );

        assert_eq!(model.capacity_kw[0], 50.0);
        assert_eq!(model.capacity_kw[1], 200.0);
    }
}
