use fxhash::FxHashSet;
use tracing::info;

use super::model::{AllocationModel, AllocationSolution, SolveStatus};

/// Greedy set-covering fallback: scan sequences best-cost first and select
/// any whose vehicle is unused and whose routes are all uncovered.
///
/// Tie-breaks are deterministic: at equal cost longer sequences win, then
/// the lower vehicle id, then enumeration order.
pub fn solve_greedy(model: &AllocationModel) -> AllocationSolution {
    let mut order: Vec<usize> = (0..model.sequences.len()).collect();
    order.sort_by(|&a, &b| {
        let left = &model.sequences[a];
        let right = &model.sequences[b];
        right
            .score
            .soft_score
            .total_cmp(&left.score.soft_score)
            .then_with(|| right.len().cmp(&left.len()))
            .then_with(|| left.vehicle_id.cmp(&right.vehicle_id))
            .then_with(|| a.cmp(&b))
    });

    let mut selected = Vec::new();
    let mut used_vehicles = FxHashSet::default();
    let mut covered_routes: FxHashSet<usize> = FxHashSet::default();

    for index in order {
        let candidate = &model.sequences[index];

        if used_vehicles.contains(&candidate.vehicle_id) {
            continue;
        }
        if candidate
            .route_indices
            .iter()
            .any(|route_index| covered_routes.contains(route_index))
        {
            continue;
        }

        used_vehicles.insert(candidate.vehicle_id);
        covered_routes.extend(candidate.route_indices.iter().copied());
        selected.push(index);

        if covered_routes.len() == model.route_ids.len() {
            break;
        }
    }

    info!(
        sequences = selected.len(),
        routes_covered = covered_routes.len(),
        routes_total = model.route_ids.len(),
        "greedy allocation complete"
    );

    AllocationSolution {
        selected,
        status: SolveStatus::GreedyFallback,
    }
}
