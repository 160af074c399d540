use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

/// Rejects sequences containing routes departing too soon after the run
/// instant for the assignment to be actionable.
#[derive(Clone, Debug)]
pub struct MinimumSoonnessConstraint {
    penalty: f64,
    hours: f64,
}

impl MinimumSoonnessConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        MinimumSoonnessConstraint {
            penalty: config.penalty,
            hours: config.float_or("hours", 0.75),
        }
    }
}

impl SequenceConstraint for MinimumSoonnessConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Hard
    }

    fn evaluate(&self, _vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score {
        for route in sequence {
            let lead_hours = route.plan_start().duration_since(ctx.now).as_secs_f64() / 3600.0;
            if lead_hours < self.hours {
                return Score::violation(self.penalty);
            }
        }

        Score::ZERO
    }
}
