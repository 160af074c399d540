use fxhash::FxHashMap;
use schemars::JsonSchema;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    problem::{
        route::{Route, RouteId},
        vehicle::VehicleId,
    },
    solver::sequences::SequenceCandidate,
};

/// Weight on route coverage in the allocation objective. One extra covered
/// route dominates any plausible sequence-score spread.
pub const ROUTE_COUNT_WEIGHT: f64 = 100.0;

/// Solver status of an optimization stage.
#[derive(Serialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Feasible,
    GreedyFallback,
}

/// The set-covering structure over enumerated sequences.
///
/// Decision shape for an external backend: a binary per sequence and a
/// binary per route, maximizing `W·Σ routes_covered + Σ cost·selected`
/// subject to one sequence per vehicle and at most one covering sequence per
/// route; the coverage and vehicle lists here are exactly those constraint
/// rows.
#[derive(Debug, Clone)]
pub struct AllocationModel {
    pub sequences: Vec<SequenceCandidate>,
    /// Eligible routes in window order.
    pub route_ids: Vec<RouteId>,
    /// Per route (by position in `route_ids`), the sequences covering it.
    pub route_coverage: Vec<Vec<usize>>,
    /// Per vehicle, ascending id, the sequences belonging to it.
    pub vehicle_sequences: Vec<(VehicleId, Vec<usize>)>,
    pub route_count_weight: f64,
}

impl AllocationModel {
    pub fn build(sequences: Vec<SequenceCandidate>, routes: &[Route]) -> AllocationModel {
        let route_ids: Vec<RouteId> = routes.iter().map(|route| route.route_id().clone()).collect();

        let mut route_coverage = vec![Vec::new(); route_ids.len()];
        let mut by_vehicle: FxHashMap<VehicleId, Vec<usize>> = FxHashMap::default();

        for (sequence_index, candidate) in sequences.iter().enumerate() {
            by_vehicle
                .entry(candidate.vehicle_id)
                .or_default()
                .push(sequence_index);
            for &route_index in &candidate.route_indices {
                route_coverage[route_index].push(sequence_index);
            }
        }

        let uncoverable = route_coverage.iter().filter(|covering| covering.is_empty()).count();
        if uncoverable > 0 {
            warn!(uncoverable, "routes with no feasible covering sequence");
        }

        let mut vehicle_sequences: Vec<(VehicleId, Vec<usize>)> = by_vehicle.into_iter().collect();
        vehicle_sequences.sort_by_key(|(vehicle_id, _)| *vehicle_id);

        debug!(
            sequences = sequences.len(),
            routes = route_ids.len(),
            vehicles = vehicle_sequences.len(),
            "allocation model built"
        );

        AllocationModel {
            sequences,
            route_ids,
            route_coverage,
            vehicle_sequences,
            route_count_weight: ROUTE_COUNT_WEIGHT,
        }
    }

    /// Objective contribution of one sequence: its soft score.
    pub fn sequence_cost(&self, index: usize) -> f64 {
        self.sequences[index].score.soft_score
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Selected sequences of a solved allocation stage.
#[derive(Debug, Clone)]
pub struct AllocationSolution {
    pub selected: Vec<usize>,
    pub status: SolveStatus,
}

impl AllocationSolution {
    pub fn empty(status: SolveStatus) -> AllocationSolution {
        AllocationSolution {
            selected: Vec::new(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        solver::score::Score,
        test_utils::{test_route, test_vehicle},
    };
    use smallvec::smallvec;

    #[test]
    fn test_build_coverage_and_vehicle_lists() {
        let routes = vec![
            test_route("R1", "2026-02-16T08:00:00Z", 60, 10.0),
            test_route("R2", "2026-02-16T12:00:00Z", 60, 10.0),
        ];
        let v1 = test_vehicle(1, 200.0, 1.0);
        let v2 = test_vehicle(2, 200.0, 1.0);

        let sequences = vec![
            SequenceCandidate {
                vehicle_id: v1.vehicle_id(),
                route_indices: smallvec![0],
                score: Score::ZERO,
            },
            SequenceCandidate {
                vehicle_id: v1.vehicle_id(),
                route_indices: smallvec![0, 1],
                score: Score::soft(-2.0),
            },
            SequenceCandidate {
                vehicle_id: v2.vehicle_id(),
                route_indices: smallvec![1],
                score: Score::ZERO,
            },
        ];

        let model = AllocationModel::build(sequences, &routes);

        assert_eq!(model.route_coverage[0], vec![0, 1]);
        assert_eq!(model.route_coverage[1], vec![1, 2]);
        assert_eq!(model.vehicle_sequences.len(), 2);
        assert_eq!(model.vehicle_sequences[0].1, vec![0, 1]);
        assert_eq!(model.sequence_cost(1), -2.0);
    }
}
