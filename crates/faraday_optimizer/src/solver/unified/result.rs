use jiff::SignedDuration;
use serde::Serialize;

use crate::solver::{
    allocation::{model::SolveStatus, result::AllocationResult},
    charge::plan::ChargePlan,
    unified::config::OptimizationMode,
};

/// Outcome of one unified run: the weighted objective plus whichever stage
/// outputs the mode produced.
#[derive(Serialize, Debug, Clone)]
pub struct UnifiedResult {
    pub mode: OptimizationMode,
    pub objective_value: f64,
    pub allocation: Option<AllocationResult>,
    pub charge_plan: Option<ChargePlan>,
    pub solver_status: SolveStatus,
    pub solve_time: SignedDuration,
    pub fallback: bool,
}

impl UnifiedResult {
    /// Whether any stage produced a usable outcome.
    pub fn has_output(&self) -> bool {
        self.allocation.is_some() || self.charge_plan.is_some()
    }
}
