use jiff::SignedDuration;

use crate::{
    maf::parameters::ConstraintConfig,
    problem::{route::Route, vehicle::Vehicle},
    solver::score::{Score, ScoreLevel},
};

use super::{constraint::SequenceConstraint, evaluation_context::EvaluationContext};

/// Rejects sequences with temporally colliding routes. A vehicle cannot be
/// in two places at once, so this constraint cannot be disabled.
#[derive(Clone, Debug)]
pub struct RouteOverlapConstraint {
    penalty: f64,
}

impl RouteOverlapConstraint {
    pub fn from_config(config: &ConstraintConfig) -> Self {
        RouteOverlapConstraint {
            penalty: config.penalty,
        }
    }

    /// Construction for sites that attempt to disable the constraint.
    pub fn mandatory() -> Self {
        RouteOverlapConstraint { penalty: -20.0 }
    }
}

impl SequenceConstraint for RouteOverlapConstraint {
    fn score_level(&self) -> ScoreLevel {
        ScoreLevel::Hard
    }

    fn evaluate(&self, _vehicle: &Vehicle, sequence: &[&Route], _ctx: &EvaluationContext) -> Score {
        for (index, route) in sequence.iter().enumerate() {
            for other in &sequence[index + 1..] {
                if route.overlaps_with(other, SignedDuration::ZERO) {
                    return Score::violation(self.penalty);
                }
            }
        }

        Score::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{evaluation_fixture, test_route, test_vehicle};

    #[test]
    fn test_overlapping_routes_rejected() {
        let constraint = RouteOverlapConstraint::mandatory();
        let vehicle = test_vehicle(1, 200.0, 1.0);
        let first = test_route("R1", "2026-02-16T08:00:00Z", 120, 10.0);
        let second = test_route("R2", "2026-02-16T09:00:00Z", 60, 10.0);

        let fixture = evaluation_fixture(vec![vehicle.clone()], vec![first.clone(), second.clone()]);
        let score = constraint.evaluate(&vehicle, &[&first, &second], &fixture.context());
        assert!(score.is_violation());
    }

    #[test]
    fn test_disjoint_routes_pass() {
        let constraint = RouteOverlapConstraint::mandatory();
        let vehicle = test_vehicle(1, 200.0, 1.0);
        let first = test_route("R1", "2026-02-16T08:00:00Z", 60, 10.0);
        let second = test_route("R2", "2026-02-16T10:00:00Z", 60, 10.0);

        let fixture = evaluation_fixture(vec![vehicle.clone()], vec![first.clone(), second.clone()]);
        let score = constraint.evaluate(&vehicle, &[&first, &second], &fixture.context());
        assert_eq!(score, Score::ZERO);
    }
}
