mod setup;

use faraday_optimizer::{
    problem::{route::RouteId, vehicle::VehicleId},
    solver::{
        allocation::result::AllocationStatus,
        backend::NoExternalSolver,
        unified::{config::OptimizationMode, coordinator::Coordinator},
    },
};

use setup::{config, flat_prices, now, route, scenario_params, snapshot, vehicle};

#[test]
fn test_three_disjoint_routes_fully_allocated() {
    // Two 200 kWh vehicles and three one-hour routes four hours apart: all
    // three are covered and the score is pure coverage.
    let snapshot = snapshot(
        vec![vehicle(1, 200.0, 1.0), vehicle(2, 200.0, 1.0)],
        vec![
            route("R1", "2026-02-16T08:00:00Z", 60, 30.0),
            route("R2", "2026-02-16T12:00:00Z", 60, 30.0),
            route("R3", "2026-02-16T16:00:00Z", 60, 30.0),
        ],
    );
    let params = scenario_params(&[]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();
    let allocation = result.allocation.unwrap();

    assert_eq!(allocation.routes_allocated, 3);
    assert_eq!(allocation.routes_in_window, 3);
    assert_eq!(allocation.total_score, 300.0);
    assert_eq!(allocation.status, AllocationStatus::Allocated);
    assert!(allocation.unallocated_routes.is_empty());
    assert!(allocation.fallback);
}

#[test]
fn test_overlapping_route_moves_to_other_vehicle() {
    // The second route departs while the first is still out, so no single
    // vehicle can run both; it lands on the other vehicle and all three
    // routes stay covered.
    let snapshot = snapshot(
        vec![vehicle(1, 200.0, 1.0), vehicle(2, 200.0, 1.0)],
        vec![
            route("R1", "2026-02-16T08:00:00Z", 60, 30.0),
            route("R2", "2026-02-16T09:00:00Z", 60, 30.0),
            route("R3", "2026-02-16T16:00:00Z", 60, 30.0),
        ],
    );
    let params = scenario_params(&[]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();
    let allocation = result.allocation.unwrap();

    assert_eq!(allocation.routes_allocated, 3);

    let r1_vehicle = allocation
        .assignments
        .iter()
        .find(|assignment| assignment.route_id == RouteId::new("R1"))
        .unwrap()
        .vehicle_id;
    let r2_vehicle = allocation
        .assignments
        .iter()
        .find(|assignment| assignment.route_id == RouteId::new("R2"))
        .unwrap()
        .vehicle_id;
    assert_ne!(r1_vehicle, r2_vehicle);
}

#[test]
fn test_energy_infeasible_route_fails_allocation() {
    // 60 miles at 2.0 kWh/mile needs 120 kWh against a 100 kWh battery:
    // no feasible sequence exists and the run reports failure.
    let snapshot = snapshot(
        vec![vehicle(1, 100.0, 2.0)],
        vec![route("R1", "2026-02-16T08:00:00Z", 60, 60.0)],
    );
    let params = scenario_params(&[]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();
    let allocation = result.allocation.unwrap();

    assert_eq!(allocation.routes_allocated, 0);
    assert_eq!(allocation.status, AllocationStatus::Failed);
    assert_eq!(allocation.unallocated_routes, vec![RouteId::new("R1")]);
}

#[test]
fn test_disabling_strict_turnaround_admits_tight_pairs() {
    // 30-minute gap against a 45-minute strict minimum: infeasible as a
    // pair by default, feasible once the strict constraint is disabled,
    // with the preferred tier still charging its penalty.
    use faraday_optimizer::{
        maf::site_config::SiteConfig,
        problem::window::VehicleAvailability,
        solver::{
            constraints::{engine::ConstraintEngine, evaluation_context::EvaluationContext},
            sequences::{EnumerationLimits, effective_turnaround, enumerate_sequences},
        },
    };
    use fxhash::FxHashMap;

    let vehicles = vec![vehicle(1, 200.0, 1.0)];
    let routes = vec![
        route("R1", "2026-02-16T08:00:00Z", 60, 10.0),
        route("R2", "2026-02-16T09:30:00Z", 60, 10.0),
    ];

    let availability: FxHashMap<_, _> = vehicles
        .iter()
        .map(|vehicle| {
            (
                vehicle.vehicle_id(),
                VehicleAvailability {
                    available_from: now(),
                    available_energy_kwh: vehicle.battery_capacity_kwh(),
                },
            )
        })
        .collect();
    let chargers = FxHashMap::default();
    let previous = FxHashMap::default();
    let ctx = EvaluationContext {
        now: now(),
        all_routes: &routes,
        all_vehicles: &vehicles,
        availability: &availability,
        vehicle_chargers: &chargers,
        previous_allocations: &previous,
    };

    let enumerate = |params: &faraday_optimizer::maf::parameters::MafParameters| {
        let engine = ConstraintEngine::from_parameters(params);
        let site = SiteConfig {
            route_sequence_buffer_minutes: 0,
            ..SiteConfig::from_parameters(params)
        };
        let limits = EnumerationLimits {
            max_routes_per_vehicle: 5,
            turnaround: effective_turnaround(&engine, &site),
        };
        enumerate_sequences(&vehicles, &routes, &engine, &ctx, &limits)
    };

    let strict = enumerate(&scenario_params(&[]));
    assert!(strict.iter().all(|candidate| candidate.len() == 1));

    let relaxed = enumerate(&scenario_params(&[(
        "constraint_turnaround_time_strict_enabled",
        "false",
    )]));
    let pair = relaxed
        .iter()
        .find(|candidate| candidate.len() == 2)
        .expect("pair admissible with strict turnaround disabled");
    assert_eq!(pair.score.soft_score, -2.0);
}

#[test]
fn test_allocation_is_deterministic() {
    let build = || {
        snapshot(
            vec![vehicle(2, 150.0, 0.8), vehicle(1, 150.0, 0.8)],
            vec![
                route("R1", "2026-02-16T06:00:00Z", 90, 25.0),
                route("R2", "2026-02-16T09:00:00Z", 60, 40.0),
                route("R3", "2026-02-16T12:30:00Z", 120, 35.0),
                route("R4", "2026-02-16T17:00:00Z", 60, 20.0),
            ],
        )
    };
    let params = scenario_params(&[]);

    let first_snapshot = build();
    let coordinator = Coordinator::new(
        &first_snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );
    let first = coordinator.run(now(), 1).unwrap();

    let second_snapshot = build();
    let coordinator = Coordinator::new(
        &second_snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );
    let second = coordinator.run(now(), 1).unwrap();

    let first_rendered = serde_json::to_string(&first.allocation.unwrap()).unwrap();
    let second_rendered = serde_json::to_string(&second.allocation.unwrap()).unwrap();
    assert_eq!(first_rendered, second_rendered);
}

#[test]
fn test_adding_soft_bonus_never_lowers_score() {
    let build = || {
        let mut snapshot = snapshot(
            vec![vehicle(1, 200.0, 1.0), vehicle(2, 200.0, 1.0)],
            vec![
                route("R1", "2026-02-16T08:00:00Z", 60, 30.0),
                route("R2", "2026-02-16T12:00:00Z", 60, 30.0),
            ],
        );
        snapshot
            .previous_allocations
            .insert(RouteId::new("R1"), VehicleId::new(1));
        snapshot
    };

    let base_params = scenario_params(&[]);
    let base_snapshot = build();
    let coordinator = Coordinator::new(
        &base_snapshot,
        &base_params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );
    let base = coordinator.run(now(), 1).unwrap();

    // Same inputs, plus the swap-minimization bonus.
    let bonus_params = scenario_params(&[("constraint_swap_minimization_enabled", "true")]);
    let bonus_snapshot = build();
    let coordinator = Coordinator::new(
        &bonus_snapshot,
        &bonus_params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );
    let bonus = coordinator.run(now(), 1).unwrap();

    assert!(bonus.objective_value >= base.objective_value);
}

#[test]
fn test_score_is_pure_coverage_without_soft_constraints() {
    let snapshot = snapshot(
        vec![vehicle(1, 200.0, 1.0), vehicle(2, 200.0, 1.0)],
        vec![
            route("R1", "2026-02-16T08:00:00Z", 60, 30.0),
            route("R2", "2026-02-16T09:30:00Z", 60, 30.0),
            route("R3", "2026-02-16T14:00:00Z", 60, 30.0),
        ],
    );
    let params = scenario_params(&[(
        "constraint_turnaround_time_preferred_enabled",
        "false",
    )]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();
    let allocation = result.allocation.unwrap();

    assert_eq!(
        allocation.total_score,
        100.0 * allocation.routes_allocated as f64
    );
}

#[test]
fn test_committed_route_not_reallocated() {
    let mut committed_snapshot = snapshot(
        vec![vehicle(1, 200.0, 1.0)],
        vec![
            route("R1", "2026-02-16T08:00:00Z", 60, 30.0),
            route("R2", "2026-02-16T12:00:00Z", 60, 30.0),
        ],
    );
    committed_snapshot
        .committed
        .push((RouteId::new("R1"), VehicleId::new(1)));

    let params = scenario_params(&[]);
    let coordinator = Coordinator::new(
        &committed_snapshot,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();
    let allocation = result.allocation.unwrap();

    // Only R2 is an allocation candidate; R1 stays with its commitment.
    assert_eq!(allocation.routes_in_window, 1);
    assert_eq!(allocation.routes_allocated, 1);
    assert_eq!(allocation.assignments[0].route_id, RouteId::new("R2"));
}

#[test]
fn test_flat_price_feed_is_ignored_by_allocation() {
    // Allocation-only runs do not require any price data.
    let with_prices = {
        let mut snapshot = snapshot(
            vec![vehicle(1, 200.0, 1.0)],
            vec![route("R1", "2026-02-16T08:00:00Z", 60, 30.0)],
        );
        snapshot.prices = flat_prices(18, 0.12);
        snapshot
    };
    let params = scenario_params(&[]);
    let coordinator = Coordinator::new(
        &with_prices,
        &params,
        config(OptimizationMode::AllocationOnly),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();
    assert_eq!(result.allocation.unwrap().routes_allocated, 1);
}
