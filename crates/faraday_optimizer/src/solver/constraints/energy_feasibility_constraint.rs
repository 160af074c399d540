use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

const SCORE_LEVEL: ScoreLevel = ScoreLevel::Hard;

/// Ensures the vehicle carries enough energy through every route of the
/// sequence, crediting opportunistic charging in the idle gaps between
/// routes.
#[derive(Clone, Debug)]
pub struct EnergyFeasibilityConstraint {
    penalty: f64,
    safety_margin_kwh: f64,
    allow_dc_charging: bool,
}

impl EnergyFeasibilityConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        EnergyFeasibilityConstraint {
            penalty: config.penalty,
            safety_margin_kwh: config.float_or("safety_margin_kwh", 5.0),
            allow_dc_charging: config.bool_or("allow_dc_charging", true),
        }
    }

    pub fn safety_margin_kwh(&self) -> f64 {
        self.safety_margin_kwh
    }

    pub fn allow_dc_charging(&self) -> bool {
        self.allow_dc_charging
    }
}

impl SequenceConstraint for EnergyFeasibilityConstraint {
    fn score_level(&self) -> ScoreLevel {
        SCORE_LEVEL
    }

    fn evaluate(&self, vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score {
        let mut energy = ctx.starting_energy_kwh(vehicle);

        for (index, route) in sequence.iter().enumerate() {
            let required = vehicle.energy_required_kwh(route.mileage());
            if energy < required + self.safety_margin_kwh {
                return Score::violation(self.penalty);
            }
            energy -= required;

            if let Some(next) = sequence.get(index + 1) {
                let gap = next.plan_start().duration_since(route.plan_end());
                if gap.is_positive() {
                    let rate = vehicle.charge_rate_kw(self.allow_dc_charging);
                    let recovered = gap.as_secs_f64() / 3600.0 * rate;
                    energy = (energy + recovered).min(vehicle.battery_capacity_kwh());
                }
            }
        }

        Score::ZERO
    }
}
