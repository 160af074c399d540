use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

/// Rewards sequences that leave a healthy energy margin at the end of the
/// day: the highest cleared margin threshold awards its configured score.
#[derive(Clone, Debug)]
pub struct EnergyOptimizationConstraint {
    /// Ascending margin fractions with their scores, paired at construction.
    tiers: Vec<(f64, f64)>,
}

impl EnergyOptimizationConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        let thresholds = config.float_array("margin_thresholds");
        let scores = config.float_array("scores");

        let mut tiers: Vec<(f64, f64)> = thresholds.into_iter().zip(scores).collect();
        tiers.sort_by(|a, b| a.0.total_cmp(&b.0));

        EnergyOptimizationConstraint { tiers }
    }
}

impl SequenceConstraint for EnergyOptimizationConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Soft
    }

    fn evaluate(&self, vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score {
        if self.tiers.is_empty() || sequence.is_empty() {
            return Score::ZERO;
        }

        let consumed: f64 = sequence
            .iter()
            .map(|route| vehicle.energy_required_kwh(route.mileage()))
            .sum();
        let remaining = ctx.starting_energy_kwh(vehicle) - consumed;
        let margin_fraction = remaining / vehicle.battery_capacity_kwh();

        let cleared = self
            .tiers
            .iter()
            .rev()
            .find(|(threshold, _)| margin_fraction >= *threshold);

        match cleared {
            Some((_, score)) => Score::soft(*score),
            None => Score::ZERO,
        }
    }
}
