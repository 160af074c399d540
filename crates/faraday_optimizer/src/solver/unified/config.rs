use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationMode {
    AllocationOnly,
    SchedulingOnly,
    Integrated,
}

impl OptimizationMode {
    pub fn parse(label: &str) -> Option<OptimizationMode> {
        match label {
            "allocation_only" | "allocation" => Some(OptimizationMode::AllocationOnly),
            "scheduling_only" | "scheduling" => Some(OptimizationMode::SchedulingOnly),
            "integrated" | "both" => Some(OptimizationMode::Integrated),
            _ => None,
        }
    }

    pub fn runs_allocation(&self) -> bool {
        matches!(
            self,
            OptimizationMode::AllocationOnly | OptimizationMode::Integrated
        )
    }

    pub fn runs_scheduling(&self) -> bool {
        matches!(
            self,
            OptimizationMode::SchedulingOnly | OptimizationMode::Integrated
        )
    }
}

/// Caller-side knobs for a unified run: mode, stage time limits and the
/// weighted-sum coefficients.
#[derive(Debug, Clone)]
pub struct UnifiedConfig {
    pub mode: OptimizationMode,

    pub allocation_time_limit: SignedDuration,
    pub scheduling_time_limit: SignedDuration,
    pub integrated_time_limit: SignedDuration,

    /// α: weight of the allocation term.
    pub allocation_weight: f64,
    /// β: weight of the charging cost term.
    pub scheduling_weight: f64,
}

impl Default for UnifiedConfig {
    fn default() -> Self {
        UnifiedConfig {
            mode: OptimizationMode::Integrated,
            allocation_time_limit: SignedDuration::from_secs(30),
            scheduling_time_limit: SignedDuration::from_secs(300),
            integrated_time_limit: SignedDuration::from_secs(330),
            allocation_weight: 1.0,
            scheduling_weight: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_accepts_aliases() {
        assert_eq!(
            OptimizationMode::parse("allocation_only"),
            Some(OptimizationMode::AllocationOnly)
        );
        assert_eq!(
            OptimizationMode::parse("scheduling"),
            Some(OptimizationMode::SchedulingOnly)
        );
        assert_eq!(
            OptimizationMode::parse("both"),
            Some(OptimizationMode::Integrated)
        );
        assert_eq!(OptimizationMode::parse("bogus"), None);
    }
}
