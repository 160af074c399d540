use jiff::SignedDuration;

use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

/// Enforces the minimum turnaround between sequential routes.
#[derive(Clone, Debug)]
pub struct TurnaroundStrictConstraint {
    penalty: f64,
    minimum: SignedDuration,
}

impl TurnaroundStrictConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        TurnaroundStrictConstraint {
            penalty: config.penalty,
            minimum: SignedDuration::from_mins(config.int_or("minimum_minutes", 45)),
        }
    }

    pub fn minimum(&self) -> SignedDuration {
        self.minimum
    }
}

impl SequenceConstraint for TurnaroundStrictConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Hard
    }

    fn evaluate(&self, _vehicle: &Vehicle, sequence: &[&Route], _ctx: &EvaluationContext) -> Score {
        for pair in sequence.windows(2) {
            let gap = pair[1].plan_start().duration_since(pair[0].plan_end());
            if gap < self.minimum {
                return Score::violation(self.penalty);
            }
        }

        Score::ZERO
    }
}

/// Soft preference for comfortable turnarounds, tiered below the standard
/// and optimal thresholds.
#[derive(Clone, Debug)]
pub struct TurnaroundPreferredConstraint {
    standard: SignedDuration,
    optimal: SignedDuration,
    penalty_standard: f64,
    penalty_optimal: f64,
}

impl TurnaroundPreferredConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        TurnaroundPreferredConstraint {
            standard: SignedDuration::from_mins(config.int_or("standard_minutes", 75)),
            optimal: SignedDuration::from_mins(config.int_or("optimal_minutes", 90)),
            penalty_standard: config.float_or("penalty_standard", -2.0),
            penalty_optimal: config.float_or("penalty_optimal", -1.0),
        }
    }
}

impl SequenceConstraint for TurnaroundPreferredConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Soft
    }

    fn evaluate(&self, _vehicle: &Vehicle, sequence: &[&Route], _ctx: &EvaluationContext) -> Score {
        let mut total = 0.0;

        for pair in sequence.windows(2) {
            let gap = pair[1].plan_start().duration_since(pair[0].plan_end());
            if gap < self.standard {
                total += self.penalty_standard;
            } else if gap < self.optimal {
                total += self.penalty_optimal;
            }
        }

        Score::soft(total)
    }
}
