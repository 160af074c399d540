use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShiftCalculation {
    /// First route departure to last route arrival.
    FirstToLast,
    /// Sum of route durations only.
    Cumulative,
}

/// Caps total driver time per sequence for working-time compliance.
#[derive(Clone, Debug)]
pub struct ShiftHoursConstraint {
    penalty: f64,
    max_hours: f64,
    calculation: ShiftCalculation,
    pre_shift_buffer_hours: f64,
    post_shift_buffer_hours: f64,
}

impl ShiftHoursConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        let calculation = match config.text_or("calculation_method", "first_to_last") {
            "cumulative" => ShiftCalculation::Cumulative,
            _ => ShiftCalculation::FirstToLast,
        };

        ShiftHoursConstraint {
            penalty: config.penalty,
            max_hours: config.float_or("max_hours", 7.5),
            calculation,
            pre_shift_buffer_hours: config.float_or("pre_shift_buffer_hours", 0.5),
            post_shift_buffer_hours: config.float_or("post_shift_buffer_hours", 0.5),
        }
    }
}

impl SequenceConstraint for ShiftHoursConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Hard
    }

    fn evaluate(&self, _vehicle: &Vehicle, sequence: &[&Route], _ctx: &EvaluationContext) -> Score {
        let (Some(first), Some(last)) = (sequence.first(), sequence.last()) else {
            return Score::ZERO;
        };

        let driving_hours = match self.calculation {
            ShiftCalculation::FirstToLast => last
                .plan_end()
                .duration_since(first.plan_start())
                .as_secs_f64()
                / 3600.0,
            ShiftCalculation::Cumulative => {
                sequence.iter().map(|route| route.duration_hours()).sum()
            }
        };

        let total_hours = driving_hours + self.pre_shift_buffer_hours + self.post_shift_buffer_hours;
        if total_hours > self.max_hours {
            return Score::violation(self.penalty);
        }

        Score::ZERO
    }
}
