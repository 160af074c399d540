mod setup;

use faraday_optimizer::{
    problem::{vehicle::VehicleId, vehicle_state::VehicleState},
    solver::{
        allocation::model::SolveStatus,
        backend::NoExternalSolver,
        unified::{config::OptimizationMode, coordinator::Coordinator},
    },
};

use setup::{config, flat_prices, now, route, scenario_params, snapshot, vehicle};

fn soc(vehicle_id: i64, percent: f64) -> VehicleState {
    VehicleState {
        vehicle_id: VehicleId::new(vehicle_id),
        estimated_soc_percent: Some(percent),
        ..VehicleState::default()
    }
}

#[test]
fn test_integrated_produces_both_outputs() {
    let mut snapshot = snapshot(
        vec![vehicle(1, 200.0, 1.0), vehicle(2, 200.0, 1.0)],
        vec![
            route("R1", "2026-02-16T08:00:00Z", 60, 30.0),
            route("R2", "2026-02-16T12:00:00Z", 60, 30.0),
        ],
    );
    snapshot.states.insert(VehicleId::new(1), soc(1, 60.0));
    snapshot.states.insert(VehicleId::new(2), soc(2, 60.0));
    snapshot.prices = flat_prices(18, 0.10);

    let params = scenario_params(&[("target_soc_percent", "50")]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::Integrated),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();

    assert_eq!(result.mode, OptimizationMode::Integrated);
    assert_eq!(result.solver_status, SolveStatus::GreedyFallback);
    assert!(result.fallback);

    let allocation = result.allocation.as_ref().unwrap();
    assert_eq!(allocation.routes_allocated, 2);

    let plan = result.charge_plan.as_ref().unwrap();
    assert!(plan.meets_all_checkpoints());

    // With no shortfall the objective is the allocation score minus the
    // charging cost, at unit weights.
    let expected = allocation.total_score - plan.total_cost;
    assert!((result.objective_value - expected).abs() < 1e-6);
}

#[test]
fn test_integrated_schedules_chosen_routes() {
    // The allocated route must be charged for before departure: the
    // integrated run wires the allocation result into the charge model.
    // 70 kWh route, 80 kWh on board: allocatable as-is, but the 1.2 safety
    // factor pushes the scheduling requirement to 84 kWh.
    let mut snapshot = snapshot(
        vec![vehicle(1, 100.0, 1.0)],
        vec![route("R1", "2026-02-16T10:00:00Z", 60, 70.0)],
    );
    snapshot.states.insert(VehicleId::new(1), soc(1, 80.0));
    snapshot.prices = flat_prices(18, 0.10);

    let params = scenario_params(&[
        ("target_soc_percent", "50"),
        ("route_energy_safety_factor", "1.2"),
    ]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::Integrated),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();

    let allocation = result.allocation.as_ref().unwrap();
    assert_eq!(allocation.routes_allocated, 1);

    let plan = result.charge_plan.as_ref().unwrap();
    let schedule = &plan.schedules[0];
    assert!(schedule.has_routes);
    assert!(plan.meets_all_checkpoints());
    // 84 kWh needed by departure against 80 on board.
    assert!((schedule.scheduled_energy_kwh - 4.0).abs() < 1e-6);
}

#[test]
fn test_integrated_degrades_to_scheduling_without_routes() {
    let mut snapshot = snapshot(vec![vehicle(1, 100.0, 1.0)], vec![]);
    snapshot.states.insert(VehicleId::new(1), soc(1, 40.0));
    snapshot.prices = flat_prices(18, 0.10);

    let params = scenario_params(&[]);
    let coordinator = Coordinator::new(
        &snapshot,
        &params,
        config(OptimizationMode::Integrated),
        &NoExternalSolver,
    );

    let result = coordinator.run(now(), 1).unwrap();

    assert_eq!(result.mode, OptimizationMode::SchedulingOnly);
    assert!(result.allocation.is_none());
    assert!(result.charge_plan.is_some());
}

#[test]
fn test_scheduling_weight_scales_objective() {
    let build = || {
        let mut snapshot = snapshot(
            vec![vehicle(1, 200.0, 1.0)],
            vec![route("R1", "2026-02-16T08:00:00Z", 60, 30.0)],
        );
        snapshot.states.insert(VehicleId::new(1), soc(1, 50.0));
        snapshot.prices = flat_prices(18, 0.10);
        snapshot
    };
    // 75% of 200 kWh against 100 on board: 50 kWh of paid charging.
    let params = scenario_params(&[("target_soc_percent", "75")]);

    let base_snapshot = build();
    let coordinator = Coordinator::new(
        &base_snapshot,
        &params,
        config(OptimizationMode::Integrated),
        &NoExternalSolver,
    );
    let base = coordinator.run(now(), 1).unwrap();

    let weighted_snapshot = build();
    let mut weighted_config = config(OptimizationMode::Integrated);
    weighted_config.scheduling_weight = 2.0;
    let coordinator = Coordinator::new(
        &weighted_snapshot,
        &params,
        weighted_config,
        &NoExternalSolver,
    );
    let weighted = coordinator.run(now(), 1).unwrap();

    let base_cost = base.charge_plan.as_ref().unwrap().total_cost;
    let weighted_cost = weighted.charge_plan.as_ref().unwrap().total_cost;
    assert!((base_cost - weighted_cost).abs() < 1e-9);
    assert!(
        (base.objective_value - weighted.objective_value - base_cost).abs() < 1e-6
    );
}
