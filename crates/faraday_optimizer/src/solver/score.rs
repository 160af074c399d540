use std::{cmp::Ordering, iter, ops::{Add, AddAssign, Mul}};

use schemars::JsonSchema;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, JsonSchema)]
pub enum ScoreLevel {
    Hard,
    Soft,
}

/// Two-level constraint score. The hard level carries violation magnitude
/// (any positive hard score means the sequence is infeasible); the soft
/// level carries the signed penalty/bonus sum that feeds the optimizer
/// objective.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Score {
    pub hard_score: f64,
    pub soft_score: f64,
}

impl Score {
    pub const ZERO: Score = Score {
        hard_score: 0.0,
        soft_score: 0.0,
    };

    pub fn soft(soft_score: f64) -> Self {
        Score {
            hard_score: 0.0,
            soft_score,
        }
    }

    /// A hard violation carrying the configured penalty: the magnitude marks
    /// infeasibility, the signed value keeps the penalty visible in score
    /// breakdowns.
    pub fn violation(penalty: f64) -> Self {
        Score {
            hard_score: penalty.abs().max(f64::MIN_POSITIVE),
            soft_score: penalty,
        }
    }

    pub fn is_violation(&self) -> bool {
        self.hard_score > 0.0
    }
}

impl Eq for Score {}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard_score
            .total_cmp(&other.hard_score)
            .then_with(|| self.soft_score.total_cmp(&other.soft_score))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl iter::Sum for Score {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, score| acc + score)
    }
}

impl Add<Score> for Score {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Score {
            hard_score: self.hard_score + other.hard_score,
            soft_score: self.soft_score + other.soft_score,
        }
    }
}

impl AddAssign<Score> for Score {
    fn add_assign(&mut self, other: Score) {
        self.hard_score += other.hard_score;
        self.soft_score += other.soft_score;
    }
}

impl Mul<f64> for Score {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Score {
            hard_score: self.hard_score * scalar,
            soft_score: self.soft_score * scalar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_is_infeasible() {
        let score = Score::violation(-22.0);
        assert!(score.is_violation());
        assert_eq!(score.soft_score, -22.0);

        assert!(!Score::soft(-22.0).is_violation());
        assert!(!Score::ZERO.is_violation());
    }

    #[test]
    fn test_sum_accumulates_both_levels() {
        let total: Score = vec![
            Score::soft(-2.0),
            Score::soft(0.5),
            Score::violation(-20.0),
        ]
        .into_iter()
        .sum();

        assert!(total.is_violation());
        assert_eq!(total.soft_score, -21.5);
    }

    #[test]
    fn test_ordering_prefers_feasible() {
        let feasible = Score::soft(-100.0);
        let infeasible = Score::violation(-1.0);
        assert!(feasible < infeasible);

        let better = Score::soft(3.0);
        let worse = Score::soft(-2.0);
        assert!(better > worse);
    }
}
