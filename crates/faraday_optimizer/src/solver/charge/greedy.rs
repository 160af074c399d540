use tracing::info;

use crate::problem::time_slot::SLOT_HOURS;
use crate::solver::allocation::model::SolveStatus;

use super::model::{ChargeModel, ChargeSolution};

/// Greedy charge scheduling fallback.
///
/// Per vehicle: fill the cheapest available slots at full rate until the
/// energy need is met, ranking slots by energy price plus triad penalty with
/// earlier slots winning ties. Site capacity is enforced afterwards by
/// clipping each oversubscribed slot, cutting the highest vehicle ids first
/// so the lowest id keeps its power.
pub fn solve_greedy(model: &ChargeModel) -> ChargeSolution {
    let slot_count = model.slots.len();
    let mut power = vec![vec![0.0; slot_count]; model.vehicles.len()];

    for (vehicle_index, state) in model.vehicles.iter().enumerate() {
        let need_kwh = model.energy_needed_kwh(vehicle_index);
        if need_kwh <= 0.0 {
            continue;
        }

        let mut slot_order: Vec<(f64, usize)> = (0..slot_count)
            .filter(|&slot| model.availability[vehicle_index][slot])
            .map(|slot| {
                let point = model.prices[slot];
                let triad = if point.triad {
                    model.triad_penalty_factor
                } else {
                    0.0
                };
                (point.energy_price + triad, slot)
            })
            .collect();
        slot_order.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let rate = state.ac_charge_rate_kw;
        let mut delivered = 0.0;

        for (_, slot) in slot_order {
            if delivered >= need_kwh {
                break;
            }
            let energy_this_slot = (rate * SLOT_HOURS).min(need_kwh - delivered);
            power[vehicle_index][slot] = energy_this_slot / SLOT_HOURS;
            delivered += energy_this_slot;
        }
    }

    clip_to_site_capacity(model, &mut power);

    info!(
        vehicles = model.vehicles.len(),
        slots = slot_count,
        "greedy charge schedule complete"
    );

    ChargeSolution {
        power,
        status: SolveStatus::GreedyFallback,
    }
}

fn clip_to_site_capacity(model: &ChargeModel, power: &mut [Vec<f64>]) {
    for slot in 0..model.slots.len() {
        let capacity = model.capacity_kw[slot];
        let mut total: f64 = power.iter().map(|row| row[slot]).sum();
        if total <= capacity {
            continue;
        }

        for vehicle_index in (0..model.vehicles.len()).rev() {
            let excess = total - capacity;
            if excess <= 0.0 {
                break;
            }
            let cut = power[vehicle_index][slot].min(excess);
            power[vehicle_index][slot] -= cut;
            total -= cut;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        maf::site_config::SiteConfig,
        problem::{
            price_point::{PriceCurve, PriceSample},
            time_slot::TimeSlots,
            vehicle::VehicleId,
        },
        solver::charge::{
            availability::build_availability_matrices, model::ChargeModel,
            requirements::build_energy_requirements, state::build_charge_states,
        },
        test_utils::{snapshot_with, test_route, test_vehicle},
    };
    use fxhash::FxHashMap;
    use jiff::{SignedDuration, Timestamp};

    fn ts(value: &str) -> Timestamp {
        value.parse().unwrap()
    }

    #[test]
    fn test_fills_cheapest_slots_first() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 1.0)], vec![]);
        let mut states = build_charge_states(&snapshot);
        states[0].initial_soc_kwh = 50.0;
        states[0].ac_charge_rate_kw = 22.0;

        let slots = TimeSlots::build(ts("2026-02-16T04:00:00Z"), ts("2026-02-16T08:00:00Z"));
        // Slot 3 is cheap, slot 0 expensive.
        let samples: Vec<PriceSample> = (0..8)
            .map(|index| PriceSample {
                at: ts("2026-02-16T04:00:00Z") + SignedDuration::from_mins(30 * index),
                energy_price: 0.30 - 0.02 * index as f64,
                triad: false,
                load_forecast_kw: 0.0,
            })
            .collect();
        let curve = PriceCurve::align(&slots, &samples);

        let availability = build_availability_matrices(
            &states,
            &FxHashMap::default(),
            &slots,
            SignedDuration::from_mins(60),
        );
        let model = ChargeModel::build(
            slots,
            &curve,
            states,
            &FxHashMap::default(),
            &availability,
            &SiteConfig {
                target_soc_percent: 75.0,
                ..SiteConfig::default()
            },
        );

        // Needs 25 kWh: three slots at 11 kWh each (22 kW × 0.5 h), cheapest
        // last slots first.
        let solution = solve_greedy(&model);
        let row = &solution.power[0];
        assert_eq!(row[7], 22.0);
        assert_eq!(row[6], 22.0);
        assert!(row[5] > 0.0 && row[5] < 22.0);
        assert_eq!(row[0], 0.0);
    }

    #[test]
    fn test_triad_slots_avoided() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 1.0)], vec![]);
        let mut states = build_charge_states(&snapshot);
        states[0].initial_soc_kwh = 64.0;
        states[0].ac_charge_rate_kw = 22.0;

        let slots = TimeSlots::build(ts("2026-02-16T04:00:00Z"), ts("2026-02-16T05:30:00Z"));
        let samples = vec![
            PriceSample {
                at: ts("2026-02-16T04:00:00Z"),
                energy_price: 0.05,
                triad: true,
                load_forecast_kw: 0.0,
            },
            PriceSample {
                at: ts("2026-02-16T04:30:00Z"),
                energy_price: 0.20,
                triad: false,
                load_forecast_kw: 0.0,
            },
            PriceSample {
                at: ts("2026-02-16T05:00:00Z"),
                energy_price: 0.25,
                triad: false,
                load_forecast_kw: 0.0,
            },
        ];
        let curve = PriceCurve::align(&slots, &samples);

        let availability = build_availability_matrices(
            &states,
            &FxHashMap::default(),
            &slots,
            SignedDuration::from_mins(60),
        );
        let model = ChargeModel::build(
            slots,
            &curve,
            states,
            &FxHashMap::default(),
            &availability,
            &SiteConfig {
                target_soc_percent: 75.0,
                ..SiteConfig::default()
            },
        );

        // Needs 11 kWh, one full slot. The nominally cheapest slot carries a
        // triad flag and loses to both plain slots.
        let solution = solve_greedy(&model);
        let row = &solution.power[0];
        assert_eq!(row[0], 0.0);
        assert_eq!(row[1], 22.0);
    }

    #[test]
    fn test_site_capacity_clips_higher_ids_first() {
        let snapshot = snapshot_with(
            vec![test_vehicle(1, 100.0, 1.0), test_vehicle(2, 100.0, 1.0)],
            vec![],
        );
        let mut states = build_charge_states(&snapshot);
        for state in &mut states {
            state.initial_soc_kwh = 0.0;
            state.ac_charge_rate_kw = 22.0;
        }

        let slots = TimeSlots::build(ts("2026-02-16T04:00:00Z"), ts("2026-02-16T05:00:00Z"));
        let curve = PriceCurve::align(&slots, &[]);
        let availability = build_availability_matrices(
            &states,
            &FxHashMap::default(),
            &slots,
            SignedDuration::from_mins(60),
        );

        let model = ChargeModel::build(
            slots,
            &curve,
            states,
            &FxHashMap::default(),
            &availability,
            &SiteConfig {
                site_capacity_kw: 20.0,
                target_soc_percent: 75.0,
                ..SiteConfig::default()
            },
        );

        let solution = solve_greedy(&model);
        for slot in 0..2 {
            let total: f64 = solution.power.iter().map(|row| row[slot]).sum();
            assert!(total <= 20.0 + 1e-9);
            // Vehicle 1 keeps its draw; vehicle 2 loses out.
            assert!(solution.power[0][slot] >= solution.power[1][slot]);
        }
    }

    #[test]
    fn test_route_checkpoint_covered_with_flat_prices() {
        // One vehicle, 100 kWh battery, 20 kWh on board, route needing
        // 60 kWh more at slot 10, 22 kW rate, flat prices: the greedy fill
        // lands on the earliest slots and covers the checkpoint.
        let snapshot = snapshot_with(vec![test_vehicle(1, 100.0, 1.0)], vec![]);
        let mut states = build_charge_states(&snapshot);
        states[0].initial_soc_kwh = 20.0;
        states[0].ac_charge_rate_kw = 22.0;

        let slots = TimeSlots::build(ts("2026-02-16T04:00:00Z"), ts("2026-02-16T16:00:00Z"));
        let curve = PriceCurve::align(&slots, &[]);

        let mut vehicle_routes = FxHashMap::default();
        vehicle_routes.insert(
            VehicleId::new(1),
            // 80 miles at 1.0 kWh/mi: cumulative 80 kWh, 60 net of SOC.
            vec![test_route("R1", "2026-02-16T09:00:00Z", 60, 80.0)],
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

        let model = ChargeModel::build(
            slots,
            &curve,
            states,
            &requirements,
            &availability,
            &SiteConfig {
                target_soc_percent: 75.0,
                ..SiteConfig::default()
            },
        );

        let solution = solve_greedy(&model);
        let row = &solution.power[0];

        // 60 kWh at 11 kWh per slot: slots 0..5 at 22 kW, slot 5 partial.
        for slot in 0..5 {
            assert_eq!(row[slot], 22.0);
        }
        assert!((row[5] - 10.0).abs() < 1e-9);

        // Cumulative by the end of slot 9 covers the 60 kWh requirement.
        let cumulative: f64 = row[..10].iter().map(|p| p * SLOT_HOURS).sum();
        assert!(cumulative >= 60.0 - 1e-9);
    }
}
