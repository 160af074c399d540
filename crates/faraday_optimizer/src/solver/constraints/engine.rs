use fxhash::FxHashMap;
use tracing::{debug, warn};

use crate::{
    maf::parameters::MafParameters,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{
    charger_preference_constraint::ChargerPreferenceConstraint,
    constraint::{ConstraintKind, SequenceConstraint},
    energy_feasibility_constraint::EnergyFeasibilityConstraint,
    energy_optimization_constraint::EnergyOptimizationConstraint,
    evaluation_context::EvaluationContext,
    minimum_soonness_constraint::MinimumSoonnessConstraint,
    route_overlap_constraint::RouteOverlapConstraint,
    shift_hours_constraint::ShiftHoursConstraint,
    swap_minimization_constraint::SwapMinimizationConstraint,
    turnaround_time_constraint::{TurnaroundPreferredConstraint, TurnaroundStrictConstraint},
};

/// Outcome of evaluating every enabled constraint over one (vehicle,
/// sequence) pair.
#[derive(Debug, Clone)]
pub struct SequenceEvaluation {
    pub score: Score,
    pub breakdown: FxHashMap<&'static str, Score>,
    pub feasible: bool,
}

/// Composes the enabled constraint set. Hard constraints sit first so
/// evaluation can short-circuit on the first violation.
pub struct ConstraintEngine {
    constraints: Vec<ConstraintKind>,
}

impl ConstraintEngine {
    pub fn from_parameters(params: &MafParameters) -> ConstraintEngine {
        let mut constraints = Vec::new();

        let config = params.constraint_config("energy_feasibility");
        if config.enabled {
            constraints.push(ConstraintKind::EnergyFeasibility(
                EnergyFeasibilityConstraint::from_config(&config),
            ));
        }

        let config = params.constraint_config("turnaround_time_strict");
        if config.enabled {
            constraints.push(ConstraintKind::TurnaroundStrict(
                TurnaroundStrictConstraint::from_config(&config),
            ));
        }

        let config = params.constraint_config("shift_hours_strict");
        if config.enabled {
            constraints.push(ConstraintKind::ShiftHours(ShiftHoursConstraint::from_config(
                &config,
            )));
        }

        let config = params.constraint_config("minimum_soonness");
        if config.enabled {
            constraints.push(ConstraintKind::MinimumSoonness(
                MinimumSoonnessConstraint::from_config(&config),
            ));
        }

        // Mandatory: a disabled configuration is overridden.
        let config = params.constraint_config("route_overlap");
        let overlap = if config.enabled {
            RouteOverlapConstraint::from_config(&config)
        } else {
            warn!("route_overlap cannot be disabled, keeping it enabled");
            RouteOverlapConstraint::mandatory()
        };
        constraints.push(ConstraintKind::RouteOverlap(overlap));

        let config = params.constraint_config("turnaround_time_preferred");
        if config.enabled {
            constraints.push(ConstraintKind::TurnaroundPreferred(
                TurnaroundPreferredConstraint::from_config(&config),
            ));
        }

        let config = params.constraint_config("charger_preference");
        if config.enabled {
            constraints.push(ConstraintKind::ChargerPreference(
                ChargerPreferenceConstraint::from_config(&config),
            ));
        }

        let config = params.constraint_config("swap_minimization");
        if config.enabled {
            constraints.push(ConstraintKind::SwapMinimization(
                SwapMinimizationConstraint::from_config(&config),
            ));
        }

        let config = params.constraint_config("energy_optimization");
        if config.enabled {
            constraints.push(ConstraintKind::EnergyOptimization(
                EnergyOptimizationConstraint::from_config(&config),
            ));
        }

        debug!(
            enabled = constraints.len(),
            hard = constraints
                .iter()
                .filter(|constraint| constraint.score_level() == ScoreLevel::Hard)
                .count(),
            "constraint engine built"
        );

        ConstraintEngine { constraints }
    }

    pub fn constraints(&self) -> &[ConstraintKind] {
        &self.constraints
    }

    /// The strict turnaround minimum when the strict constraint is enabled.
    pub fn strict_turnaround(&self) -> Option<jiff::SignedDuration> {
        self.constraints.iter().find_map(|constraint| match constraint {
            ConstraintKind::TurnaroundStrict(strict) => Some(strict.minimum()),
            _ => None,
        })
    }

    /// Enumeration pruning parameters when energy feasibility is enabled.
    pub fn energy_feasibility(&self) -> Option<&EnergyFeasibilityConstraint> {
        self.constraints.iter().find_map(|constraint| match constraint {
            ConstraintKind::EnergyFeasibility(energy) => Some(energy),
            _ => None,
        })
    }

    pub fn evaluate(
        &self,
        vehicle: &Vehicle,
        sequence: &[&Route],
        ctx: &EvaluationContext,
    ) -> SequenceEvaluation {
        let mut total = Score::ZERO;
        let mut breakdown = FxHashMap::default();

        for constraint in &self.constraints {
            let score = constraint.evaluate(vehicle, sequence, ctx);
            breakdown.insert(constraint.constraint_name(), score);
            total += score;

            if constraint.score_level() == ScoreLevel::Hard && score.is_violation() {
                debug!(
                    vehicle_id = %vehicle.vehicle_id(),
                    constraint = constraint.constraint_name(),
                    "hard constraint violated"
                );
                return SequenceEvaluation {
                    score: total,
                    breakdown,
                    feasible: false,
                };
            }
        }

        SequenceEvaluation {
            score: total,
            breakdown,
            feasible: true,
        }
    }
}
