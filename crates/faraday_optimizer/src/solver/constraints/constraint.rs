use crate::{
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{
    charger_preference_constraint::ChargerPreferenceConstraint,
    energy_feasibility_constraint::EnergyFeasibilityConstraint,
    energy_optimization_constraint::EnergyOptimizationConstraint,
    evaluation_context::EvaluationContext,
    minimum_soonness_constraint::MinimumSoonnessConstraint,
    route_overlap_constraint::RouteOverlapConstraint,
    shift_hours_constraint::ShiftHoursConstraint,
    swap_minimization_constraint::SwapMinimizationConstraint,
    turnaround_time_constraint::{TurnaroundPreferredConstraint, TurnaroundStrictConstraint},
};

/// A pluggable allocation constraint evaluated over one (vehicle, sequence)
/// pair.
pub trait SequenceConstraint {
    fn score_level(&self) -> ScoreLevel;

    fn evaluate(&self, vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score;
}

/// The closed constraint set. New constraints are added by extending this
/// variant, not by subclassing.
#[derive(Clone)]
pub enum ConstraintKind {
    EnergyFeasibility(EnergyFeasibilityConstraint),
    TurnaroundStrict(TurnaroundStrictConstraint),
    TurnaroundPreferred(TurnaroundPreferredConstraint),
    ShiftHours(ShiftHoursConstraint),
    MinimumSoonness(MinimumSoonnessConstraint),
    RouteOverlap(RouteOverlapConstraint),
    ChargerPreference(ChargerPreferenceConstraint),
    SwapMinimization(SwapMinimizationConstraint),
    EnergyOptimization(EnergyOptimizationConstraint),
}

impl ConstraintKind {
    pub fn constraint_name(&self) -> &'static str {
        match self {
            ConstraintKind::EnergyFeasibility(_) => "energy_feasibility",
            ConstraintKind::TurnaroundStrict(_) => "turnaround_time_strict",
            ConstraintKind::TurnaroundPreferred(_) => "turnaround_time_preferred",
            ConstraintKind::ShiftHours(_) => "shift_hours_strict",
            ConstraintKind::MinimumSoonness(_) => "minimum_soonness",
            ConstraintKind::RouteOverlap(_) => "route_overlap",
            ConstraintKind::ChargerPreference(_) => "charger_preference",
            ConstraintKind::SwapMinimization(_) => "swap_minimization",
            ConstraintKind::EnergyOptimization(_) => "energy_optimization",
        }
    }
}

impl SequenceConstraint for ConstraintKind {
    fn score_level(&self) -> ScoreLevel {
        match self {
            ConstraintKind::EnergyFeasibility(c) => c.score_level(),
            ConstraintKind::TurnaroundStrict(c) => c.score_level(),
            ConstraintKind::TurnaroundPreferred(c) => c.score_level(),
            ConstraintKind::ShiftHours(c) => c.score_level(),
            ConstraintKind::MinimumSoonness(c) => c.score_level(),
            ConstraintKind::RouteOverlap(c) => c.score_level(),
            ConstraintKind::ChargerPreference(c) => c.score_level(),
            ConstraintKind::SwapMinimization(c) => c.score_level(),
            ConstraintKind::EnergyOptimization(c) => c.score_level(),
        }
    }

    fn evaluate(&self, vehicle: &Vehicle, sequence: &[&Route], ctx: &EvaluationContext) -> Score {
        match self {
            ConstraintKind::EnergyFeasibility(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::TurnaroundStrict(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::TurnaroundPreferred(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::ShiftHours(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::MinimumSoonness(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::RouteOverlap(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::ChargerPreference(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::SwapMinimization(c) => c.evaluate(vehicle, sequence, ctx),
            ConstraintKind::EnergyOptimization(c) => c.evaluate(vehicle, sequence, ctx),
        }
    }
}
