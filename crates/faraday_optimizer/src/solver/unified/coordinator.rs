use fxhash::FxHashMap;
use jiff::{SignedDuration, Timestamp};
use tracing::{info, warn};

use crate::{
    error::RunError,
    maf::{
        parameters::MafParameters,
        site_config::{MIN_WINDOW_HOURS, SiteConfig},
    },
    problem::{
        price_point::{PriceCurve, feed_horizon},
        route::{Route, RouteStatus},
        snapshot::DomainSnapshot,
        time_slot::TimeSlots,
        vehicle::{Vehicle, VehicleId},
        window::{AllocationProblem, PlanningWindow, build_allocation_problem},
    },
    solver::{
        allocation::{
            greedy as allocation_greedy,
            model::{AllocationModel, AllocationSolution, SolveStatus},
            result::{AllocationResult, assemble_allocation_result},
        },
        backend::{SolverBackend, StageOutcome},
        charge::{
            availability::build_availability_matrices,
            greedy as charge_greedy,
            model::ChargeModel,
            plan::ChargePlan,
            requirements::build_energy_requirements,
            state::build_charge_states,
        },
        constraints::{
            engine::ConstraintEngine, evaluation_context::EvaluationContext,
            swap_minimization_constraint::SwapMinimizationConstraint,
        },
        sequences::{EnumerationLimits, effective_turnaround, enumerate_sequences},
        unified::{
            config::{OptimizationMode, UnifiedConfig},
            model::UnifiedModel,
            result::UnifiedResult,
        },
    },
};

/// How far back prior allocations are loaded for the swap-minimization
/// bonus.
pub fn swap_lookback(params: &MafParameters) -> SignedDuration {
    let config = params.constraint_config("swap_minimization");
    let hours = SwapMinimizationConstraint::lookback_hours(&config);
    SignedDuration::from_secs((hours * 3600.0) as i64)
}

/// Drives the three run modes over one immutable snapshot. A run is a pure
/// computation; re-planning takes a fresh snapshot and a new coordinator.
pub struct Coordinator<'a> {
    snapshot: &'a DomainSnapshot,
    parameters: &'a MafParameters,
    site: SiteConfig,
    config: UnifiedConfig,
    backend: &'a dyn SolverBackend,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        snapshot: &'a DomainSnapshot,
        parameters: &'a MafParameters,
        config: UnifiedConfig,
        backend: &'a dyn SolverBackend,
    ) -> Coordinator<'a> {
        Coordinator {
            snapshot,
            parameters,
            site: SiteConfig::from_parameters(parameters),
            config,
            backend,
        }
    }

    pub fn site_config(&self) -> &SiteConfig {
        &self.site
    }

    /// Override site-level values (CLI flags beat MAF parameters).
    pub fn with_site_overrides(mut self, apply: impl FnOnce(&mut SiteConfig)) -> Coordinator<'a> {
        apply(&mut self.site);
        self
    }

    pub fn run(&self, now: Timestamp, allocation_id: i64) -> Result<UnifiedResult, RunError> {
        let started = Timestamp::now();
        let mode = self.determine_mode();
        info!(?mode, %now, site_id = self.snapshot.site_id, "starting optimization run");

        let mut result = match mode {
            OptimizationMode::AllocationOnly => self.run_allocation_only(now, allocation_id)?,
            OptimizationMode::SchedulingOnly => self.run_scheduling_only(now)?,
            OptimizationMode::Integrated => self.run_integrated(now, allocation_id)?,
        };
        result.solve_time = Timestamp::now().duration_since(started);

        info!(
            objective = result.objective_value,
            status = ?result.solver_status,
            fallback = result.fallback,
            "optimization run complete"
        );
        Ok(result)
    }

    /// Degrade the requested mode when the snapshot cannot support it.
    fn determine_mode(&self) -> OptimizationMode {
        if self.config.mode != OptimizationMode::Integrated {
            return self.config.mode;
        }

        let has_vehicles = !self.snapshot.vehicles.is_empty();
        let has_candidate_routes = self
            .snapshot
            .routes
            .iter()
            .any(|route| route.status() == RouteStatus::New);

        if !has_vehicles {
            warn!("no vehicles in snapshot, degrading to allocation_only");
            OptimizationMode::AllocationOnly
        } else if !has_candidate_routes {
            info!("no candidate routes in snapshot, degrading to scheduling_only");
            OptimizationMode::SchedulingOnly
        } else {
            OptimizationMode::Integrated
        }
    }

    fn run_allocation_only(
        &self,
        now: Timestamp,
        allocation_id: i64,
    ) -> Result<UnifiedResult, RunError> {
        let result = self.allocation_stage(now, allocation_id)?;

        Ok(UnifiedResult {
            mode: OptimizationMode::AllocationOnly,
            objective_value: result.total_score,
            solver_status: result.solve_status,
            fallback: result.fallback,
            allocation: Some(result),
            charge_plan: None,
            solve_time: SignedDuration::ZERO,
        })
    }

    fn run_scheduling_only(&self, now: Timestamp) -> Result<UnifiedResult, RunError> {
        let slots = self.scheduling_slots(now)?;
        let vehicle_routes = self.assigned_routes();
        let model = self.charge_model(slots, &vehicle_routes);

        let solution = match self
            .backend
            .solve_charge(&model, self.config.scheduling_time_limit)
        {
            StageOutcome::Solved(solution) => solution,
            StageOutcome::Timeout(Some(best)) => {
                warn!("charge solve timed out, taking best feasible solution");
                best
            }
            StageOutcome::Timeout(None) => {
                warn!("charge solve timed out with nothing feasible, using greedy");
                charge_greedy::solve_greedy(&model)
            }
            StageOutcome::Unavailable => {
                info!("no external solver, using greedy charge scheduling");
                charge_greedy::solve_greedy(&model)
            }
        };

        let plan = ChargePlan::from_solution(&model, &solution)?;
        let objective =
            -(plan.total_cost + model.shortfall_penalty * plan.total_shortfall_kwh());

        Ok(UnifiedResult {
            mode: OptimizationMode::SchedulingOnly,
            objective_value: objective,
            solver_status: plan.solve_status,
            fallback: plan.fallback,
            allocation: None,
            charge_plan: Some(plan),
            solve_time: SignedDuration::ZERO,
        })
    }

    fn run_integrated(
        &self,
        now: Timestamp,
        allocation_id: i64,
    ) -> Result<UnifiedResult, RunError> {
        let slots = self.scheduling_slots(now)?;
        let (engine, problem, allocation_model) = self.allocation_inputs(now);
        let base_routes = self.assigned_routes();
        let charge_model = self.charge_model(slots, &base_routes);

        let unified_model = UnifiedModel::build(
            allocation_model,
            charge_model,
            &problem,
            self.site.route_energy_safety_factor,
            self.config.allocation_weight,
            self.config.scheduling_weight,
        );

        let (allocation_solution, charge_solution) = match self
            .backend
            .solve_unified(&unified_model, self.config.integrated_time_limit)
        {
            StageOutcome::Solved(solution) => (Some(solution.allocation), Some(solution.charge)),
            StageOutcome::Timeout(Some(best)) => {
                warn!("unified solve timed out, taking best feasible solution");
                (Some(best.allocation), Some(best.charge))
            }
            StageOutcome::Timeout(None) => {
                warn!("unified solve timed out with nothing feasible, composing greedily");
                (None, None)
            }
            StageOutcome::Unavailable => {
                info!("no external solver, composing allocation and scheduling greedily");
                (None, None)
            }
        };

        let allocation_solution = allocation_solution
            .unwrap_or_else(|| allocation_greedy::solve_greedy(&unified_model.allocation));

        let dc_recovery = engine
            .energy_feasibility()
            .map(|constraint| constraint.allow_dc_charging())
            .unwrap_or(true);
        let allocation_result = assemble_allocation_result(
            allocation_id,
            &unified_model.allocation,
            &allocation_solution,
            &problem,
            self.snapshot,
            dc_recovery,
            self.site.min_allocation_score,
        );

        // Scheduling runs against the routes that actually got chosen, on
        // top of the committed and pre-assigned work.
        let mut scheduled_routes = base_routes;
        for (vehicle_id, routes) in
            selected_routes(&unified_model.allocation, &allocation_solution, &problem)
        {
            scheduled_routes.entry(vehicle_id).or_default().extend(routes);
        }
        let final_charge_model = self.charge_model(slots, &scheduled_routes);

        let charge_solution = charge_solution
            .unwrap_or_else(|| charge_greedy::solve_greedy(&final_charge_model));
        let plan = ChargePlan::from_solution(&final_charge_model, &charge_solution)?;

        let objective = self.config.allocation_weight * allocation_result.total_score
            - self.config.scheduling_weight
                * (plan.total_cost
                    + final_charge_model.shortfall_penalty * plan.total_shortfall_kwh());

        Ok(UnifiedResult {
            mode: OptimizationMode::Integrated,
            objective_value: objective,
            solver_status: combine_status(allocation_result.solve_status, plan.solve_status),
            fallback: allocation_result.fallback || plan.fallback,
            allocation: Some(allocation_result),
            charge_plan: Some(plan),
            solve_time: SignedDuration::ZERO,
        })
    }

    fn allocation_inputs(
        &self,
        now: Timestamp,
    ) -> (ConstraintEngine, AllocationProblem, AllocationModel) {
        let engine = ConstraintEngine::from_parameters(self.parameters);
        let turnaround = effective_turnaround(&engine, &self.site);
        let problem = build_allocation_problem(self.snapshot, &self.site, now, turnaround);

        let vehicles: Vec<Vehicle> = problem
            .allocatable
            .iter()
            .filter_map(|vehicle_id| self.snapshot.vehicle(*vehicle_id))
            .cloned()
            .collect();

        let ctx = EvaluationContext {
            now,
            all_routes: &problem.routes,
            all_vehicles: &vehicles,
            availability: &problem.availability,
            vehicle_chargers: &self.snapshot.vehicle_chargers,
            previous_allocations: &self.snapshot.previous_allocations,
        };
        let limits = EnumerationLimits {
            max_routes_per_vehicle: self.site.max_routes_per_vehicle_in_window,
            turnaround,
        };

        let candidates = enumerate_sequences(&vehicles, &problem.routes, &engine, &ctx, &limits);
        let model = AllocationModel::build(candidates, &problem.routes);

        (engine, problem, model)
    }

    fn allocation_stage(
        &self,
        now: Timestamp,
        allocation_id: i64,
    ) -> Result<AllocationResult, RunError> {
        let (engine, problem, model) = self.allocation_inputs(now);

        let solution = match self
            .backend
            .solve_allocation(&model, self.config.allocation_time_limit)
        {
            StageOutcome::Solved(solution) => solution,
            StageOutcome::Timeout(Some(best)) => {
                warn!("allocation solve timed out, taking best feasible solution");
                best
            }
            StageOutcome::Timeout(None) => {
                warn!("allocation solve timed out with nothing feasible, using greedy");
                allocation_greedy::solve_greedy(&model)
            }
            StageOutcome::Unavailable => {
                info!("no external solver, using greedy allocation");
                allocation_greedy::solve_greedy(&model)
            }
        };

        let dc_recovery = engine
            .energy_feasibility()
            .map(|constraint| constraint.allow_dc_charging())
            .unwrap_or(true);
        Ok(assemble_allocation_result(
            allocation_id,
            &model,
            &solution,
            &problem,
            self.snapshot,
            dc_recovery,
            self.site.min_allocation_score,
        ))
    }

    /// The scheduling slot grid: the rolling window capped by the price and
    /// forecast feed horizon, never shorter than the minimum window.
    fn scheduling_slots(&self, now: Timestamp) -> Result<TimeSlots, RunError> {
        let window = PlanningWindow::build(now, self.site.allocation_window_hours);
        let mut end = window.end;

        if let Some(horizon) = feed_horizon(&self.snapshot.prices)
            && horizon < end
        {
            info!(
                %horizon,
                target_end = %window.end,
                "planning window capped by price/forecast horizon"
            );
            end = horizon;
        }

        let slots = TimeSlots::build(window.start, end);
        let minimum_hours = MIN_WINDOW_HOURS as f64;
        if slots.hours() < minimum_hours {
            return Err(RunError::WindowTooShort {
                actual_hours: slots.hours(),
                minimum_hours,
            });
        }
        Ok(slots)
    }

    /// Routes already bound to a vehicle: committed allocations first, then
    /// pre-assignments for the remainder.
    fn assigned_routes(&self) -> FxHashMap<VehicleId, Vec<Route>> {
        let mut map: FxHashMap<VehicleId, Vec<Route>> = FxHashMap::default();

        for route in &self.snapshot.routes {
            if !matches!(route.status(), RouteStatus::New | RouteStatus::Active) {
                continue;
            }

            let committed = self
                .snapshot
                .committed
                .iter()
                .find(|(route_id, _)| route_id == route.route_id())
                .map(|(_, vehicle_id)| *vehicle_id);

            if let Some(vehicle_id) = committed.or_else(|| route.preassigned_vehicle()) {
                map.entry(vehicle_id).or_default().push(route.clone());
            }
        }

        map
    }

    fn charge_model(
        &self,
        slots: TimeSlots,
        vehicle_routes: &FxHashMap<VehicleId, Vec<Route>>,
    ) -> ChargeModel {
        let states = build_charge_states(self.snapshot);
        let requirements = build_energy_requirements(
            vehicle_routes,
            &states,
            self.site.route_energy_safety_factor,
            SignedDuration::from_mins(self.site.back_to_back_threshold_minutes),
        );
        let availability = build_availability_matrices(
            &states,
            vehicle_routes,
            &slots,
            SignedDuration::from_mins(self.site.min_departure_buffer_minutes),
        );
        let curve = PriceCurve::align(&slots, &self.snapshot.prices);

        ChargeModel::build(slots, &curve, states, &requirements, &availability, &self.site)
    }
}

fn selected_routes(
    model: &AllocationModel,
    solution: &AllocationSolution,
    problem: &AllocationProblem,
) -> FxHashMap<VehicleId, Vec<Route>> {
    let mut map: FxHashMap<VehicleId, Vec<Route>> = FxHashMap::default();

    for &sequence_index in &solution.selected {
        let candidate = &model.sequences[sequence_index];
        let routes = map.entry(candidate.vehicle_id).or_default();
        for &route_index in &candidate.route_indices {
            routes.push(problem.routes[route_index].clone());
        }
    }

    map
}

fn combine_status(allocation: SolveStatus, scheduling: SolveStatus) -> SolveStatus {
    match (allocation, scheduling) {
        (SolveStatus::GreedyFallback, _) | (_, SolveStatus::GreedyFallback) => {
            SolveStatus::GreedyFallback
        }
        (SolveStatus::Feasible, _) | (_, SolveStatus::Feasible) => SolveStatus::Feasible,
        _ => SolveStatus::Optimal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        solver::backend::NoExternalSolver,
        test_utils::{parameters_from, snapshot_with, test_now, test_route, test_vehicle},
    };

    #[test]
    fn test_mode_degrades_without_routes() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 200.0, 1.0)], vec![]);
        let params = parameters_from(&[]);
        let coordinator =
            Coordinator::new(&snapshot, &params, UnifiedConfig::default(), &NoExternalSolver);

        assert_eq!(
            coordinator.determine_mode(),
            OptimizationMode::SchedulingOnly
        );
    }

    #[test]
    fn test_mode_stays_integrated_with_full_data() {
        let snapshot = snapshot_with(
            vec![test_vehicle(1, 200.0, 1.0)],
            vec![test_route("R1", "2026-02-16T08:00:00Z", 60, 30.0)],
        );
        let params = parameters_from(&[]);
        let coordinator =
            Coordinator::new(&snapshot, &params, UnifiedConfig::default(), &NoExternalSolver);

        assert_eq!(coordinator.determine_mode(), OptimizationMode::Integrated);
    }

    #[test]
    fn test_explicit_mode_wins() {
        let snapshot = snapshot_with(vec![test_vehicle(1, 200.0, 1.0)], vec![]);
        let params = parameters_from(&[]);
        let config = UnifiedConfig {
            mode: OptimizationMode::AllocationOnly,
            ..UnifiedConfig::default()
        };
        let coordinator = Coordinator::new(&snapshot, &params, config, &NoExternalSolver);

        assert_eq!(coordinator.determine_mode(), OptimizationMode::AllocationOnly);
    }

    #[test]
    fn test_swap_lookback_default() {
        let params = parameters_from(&[("constraint_swap_minimization_enabled", "true")]);
        assert_eq!(swap_lookback(&params), SignedDuration::from_hours(24));
    }

    #[test]
    fn test_window_too_short_with_thin_price_feed() {
        use crate::problem::price_point::PriceSample;

        let mut snapshot = snapshot_with(vec![test_vehicle(1, 200.0, 1.0)], vec![]);
        // Feed ends two hours in: below the four-hour minimum.
        snapshot.prices.push(PriceSample {
            at: test_now() + SignedDuration::from_hours(2),
            energy_price: 0.1,
            triad: false,
            load_forecast_kw: 0.0,
        });

        let params = parameters_from(&[]);
        let coordinator =
            Coordinator::new(&snapshot, &params, UnifiedConfig::default(), &NoExternalSolver);

        let error = coordinator.scheduling_slots(test_now()).unwrap_err();
        assert!(matches!(error, RunError::WindowTooShort { .. }));
    }
}
