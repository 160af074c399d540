use jiff::SignedDuration;

use crate::solver::{
    allocation::model::{AllocationModel, AllocationSolution},
    charge::model::{ChargeModel, ChargeSolution},
    unified::model::{UnifiedModel, UnifiedSolution},
};

/// Result of one external solver stage. The coordinator selects the greedy
/// fallback on anything but `Solved`; a timeout may still carry the best
/// feasible solution found so far.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Solved(T),
    Timeout(Option<T>),
    Unavailable,
}

/// Seam for an external mathematical solver. Implementations receive the
/// fully built model structures and the stage time limit; the core never
/// depends on any concrete solver.
///
/// All methods default to [`StageOutcome::Unavailable`], which routes every
/// stage to the built-in greedy solvers.
pub trait SolverBackend {
    fn solve_allocation(
        &self,
        model: &AllocationModel,
        time_limit: SignedDuration,
    ) -> StageOutcome<AllocationSolution> {
        let _ = (model, time_limit);
        StageOutcome::Unavailable
    }

    fn solve_charge(
        &self,
        model: &ChargeModel,
        time_limit: SignedDuration,
    ) -> StageOutcome<ChargeSolution> {
        let _ = (model, time_limit);
        StageOutcome::Unavailable
    }

    fn solve_unified(
        &self,
        model: &UnifiedModel,
        time_limit: SignedDuration,
    ) -> StageOutcome<UnifiedSolution> {
        let _ = (model, time_limit);
        StageOutcome::Unavailable
    }
}

/// The shipped default: no external solver configured.
pub struct NoExternalSolver;

impl SolverBackend for NoExternalSolver {}
