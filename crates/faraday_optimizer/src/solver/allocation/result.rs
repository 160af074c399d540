use fxhash::FxHashSet;
use jiff::Timestamp;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::info;

use crate::{
    problem::{
        route::{Route, RouteId},
        snapshot::DomainSnapshot,
        vehicle::VehicleId,
        window::AllocationProblem,
    },
    solver::allocation::model::{AllocationModel, AllocationSolution, SolveStatus},
};

#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Allocated,
    Failed,
}

/// One route-to-vehicle assignment with its projected arrival state.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteAssignment {
    pub route_id: RouteId,
    pub vehicle_id: VehicleId,
    pub estimated_arrival: Timestamp,
    pub estimated_arrival_soc: f64,
}

/// Immutable allocation outcome, emitted once the stage completes.
#[derive(Serialize, Debug, Clone)]
pub struct AllocationResult {
    pub allocation_id: i64,
    pub total_score: f64,
    pub assignments: Vec<RouteAssignment>,
    pub unallocated_routes: Vec<RouteId>,
    pub routes_in_window: usize,
    pub routes_allocated: usize,
    pub routes_overlapping_count: usize,
    pub status: AllocationStatus,
    pub solve_status: SolveStatus,
    pub fallback: bool,
    pub tags: Vec<String>,
}

/// Staged construction of an [`AllocationResult`]; the record itself never
/// mutates after `finish`.
#[derive(Default)]
pub struct AllocationResultBuilder {
    allocation_id: i64,
    sequence_scores: f64,
    assignments: Vec<RouteAssignment>,
    unallocated_routes: Vec<RouteId>,
    routes_in_window: usize,
    routes_overlapping_count: usize,
    solve_status: Option<SolveStatus>,
    fallback: bool,
    tags: Vec<String>,
}

impl AllocationResultBuilder {
    pub fn new(allocation_id: i64) -> AllocationResultBuilder {
        AllocationResultBuilder {
            allocation_id,
            ..AllocationResultBuilder::default()
        }
    }

    pub fn set_routes_in_window(&mut self, count: usize) -> &mut Self {
        self.routes_in_window = count;
        self
    }

    pub fn set_routes_overlapping_count(&mut self, count: usize) -> &mut Self {
        self.routes_overlapping_count = count;
        self
    }

    pub fn set_solve_status(&mut self, status: SolveStatus) -> &mut Self {
        self.solve_status = Some(status);
        self.fallback = status == SolveStatus::GreedyFallback;
        self
    }

    pub fn add_sequence_score(&mut self, score: f64) -> &mut Self {
        self.sequence_scores += score;
        self
    }

    pub fn push_assignment(&mut self, assignment: RouteAssignment) -> &mut Self {
        self.assignments.push(assignment);
        self
    }

    pub fn mark_unallocated(&mut self, route_id: RouteId) -> &mut Self {
        self.unallocated_routes.push(route_id);
        self
    }

    pub fn push_tag(&mut self, tag: String) -> &mut Self {
        self.tags.push(tag);
        self
    }

    /// Seal the result. The aggregate score is coverage-weighted; the
    /// quality gate marks low-scoring or empty-but-demanded allocations
    /// failed without discarding them.
    pub fn finish(self, route_count_weight: f64, min_score: f64) -> AllocationResult {
        let routes_allocated = self.assignments.len();
        let total_score = route_count_weight * routes_allocated as f64 + self.sequence_scores;

        let demanded_but_empty = self.routes_in_window > 0 && routes_allocated == 0;
        let status = if demanded_but_empty || total_score < min_score {
            AllocationStatus::Failed
        } else {
            AllocationStatus::Allocated
        };

        AllocationResult {
            allocation_id: self.allocation_id,
            total_score,
            assignments: self.assignments,
            unallocated_routes: self.unallocated_routes,
            routes_in_window: self.routes_in_window,
            routes_allocated,
            routes_overlapping_count: self.routes_overlapping_count,
            status,
            solve_status: self.solve_status.unwrap_or(SolveStatus::GreedyFallback),
            fallback: self.fallback,
            tags: self.tags,
        }
    }
}

/// Turn a solved model into the allocation result, projecting arrival SOC by
/// cascading each sequence's energy balance.
pub fn assemble_allocation_result(
    allocation_id: i64,
    model: &AllocationModel,
    solution: &AllocationSolution,
    problem: &AllocationProblem,
    snapshot: &DomainSnapshot,
    dc_recovery: bool,
    min_score: f64,
) -> AllocationResult {
    let mut builder = AllocationResultBuilder::new(allocation_id);
    builder.set_routes_in_window(problem.routes.len());
    builder.set_routes_overlapping_count(problem.overlapping_route_count);
    builder.set_solve_status(solution.status);

    let mut selected = solution.selected.clone();
    selected.sort_by_key(|&index| model.sequences[index].vehicle_id);

    let mut covered: FxHashSet<usize> = FxHashSet::default();

    for &sequence_index in &selected {
        let candidate = &model.sequences[sequence_index];
        builder.add_sequence_score(candidate.score.soft_score);

        let Some(vehicle) = snapshot.vehicle(candidate.vehicle_id) else {
            continue;
        };

        let mut energy = problem
            .availability
            .get(&candidate.vehicle_id)
            .map(|availability| availability.available_energy_kwh)
            .unwrap_or_else(|| vehicle.battery_capacity_kwh());

        let mut previous: Option<&Route> = None;
        for &route_index in &candidate.route_indices {
            let route = &problem.routes[route_index];
            covered.insert(route_index);

            if let Some(previous) = previous {
                let gap = route.plan_start().duration_since(previous.plan_end());
                if gap.is_positive() {
                    let recovered = gap.as_secs_f64() / 3600.0 * vehicle.charge_rate_kw(dc_recovery);
                    energy = (energy + recovered).min(vehicle.battery_capacity_kwh());
                }
            }

            energy -= vehicle.energy_required_kwh(route.mileage());
            let arrival_soc = (energy / vehicle.battery_capacity_kwh() * 100.0).max(0.0);

            builder.push_assignment(RouteAssignment {
                route_id: route.route_id().clone(),
                vehicle_id: candidate.vehicle_id,
                estimated_arrival: route.plan_end(),
                estimated_arrival_soc: arrival_soc,
            });

            previous = Some(route);
        }
    }

    for (route_index, route_id) in model.route_ids.iter().enumerate() {
        if !covered.contains(&route_index) {
            builder.mark_unallocated(route_id.clone());
        }
    }

    for tag in &snapshot.dropped {
        builder.push_tag(tag.clone());
    }
    for route_id in &problem.unfeasible_routes {
        builder.push_tag(format!("route:{route_id}:unfeasible"));
    }

    let result = builder.finish(model.route_count_weight, min_score);

    info!(
        allocation_id,
        routes_allocated = result.routes_allocated,
        routes_in_window = result.routes_in_window,
        total_score = result.total_score,
        status = ?result.status,
        fallback = result.fallback,
        "allocation result assembled"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_gate_marks_low_score_failed() {
        let mut builder = AllocationResultBuilder::new(1);
        builder.set_routes_in_window(2);
        builder.set_solve_status(SolveStatus::Feasible);
        builder.add_sequence_score(-250.0);
        builder.push_assignment(RouteAssignment {
            route_id: RouteId::new("R1"),
            vehicle_id: VehicleId::new(1),
            estimated_arrival: "2026-02-16T09:00:00Z".parse().unwrap(),
            estimated_arrival_soc: 80.0,
        });

        // 100·1 - 250 = -150 < -4.
        let result = builder.finish(100.0, -4.0);
        assert_eq!(result.status, AllocationStatus::Failed);
        assert_eq!(result.total_score, -150.0);
    }

    #[test]
    fn test_no_assignment_with_demand_is_failed() {
        let mut builder = AllocationResultBuilder::new(1);
        builder.set_routes_in_window(3);
        builder.set_solve_status(SolveStatus::GreedyFallback);

        let result = builder.finish(100.0, -4.0);
        assert_eq!(result.status, AllocationStatus::Failed);
        assert!(result.fallback);
    }

    #[test]
    fn test_empty_window_is_allocated() {
        let mut builder = AllocationResultBuilder::new(1);
        builder.set_solve_status(SolveStatus::Optimal);

        let result = builder.finish(100.0, -4.0);
        assert_eq!(result.status, AllocationStatus::Allocated);
        assert_eq!(result.total_score, 0.0);
    }
}
