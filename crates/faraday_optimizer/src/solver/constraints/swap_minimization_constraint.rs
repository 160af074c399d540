use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

/// Rewards keeping a route on the vehicle it was last allocated to, so
/// re-planning disturbs as few crews as possible.
#[derive(Clone, Debug)]
pub struct SwapMinimizationConstraint {
    bonus_weight: f64,
}

impl SwapMinimizationConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        SwapMinimizationConstraint {
            bonus_weight: config.float_or("bonus_weight", 0.5),
        }
    }

    /// Lookback used when loading prior allocations into the context.
    pub fn lookback_hours(config: &ConstraintConfig) -> f64 {
        config.float_or("lookback_hours", 24.0)
    }
}

impl SequenceConstraint for SwapMinimizationConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Soft
    }

    fn evaluate(&self, vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score {
        let mut total = 0.0;

        for route in sequence {
            if ctx.previous_allocations.get(route.route_id()) == Some(&vehicle.vehicle_id()) {
                total += self.bonus_weight;
            }
        }

        Score::soft(total)
    }
}
