use crate::maf::parameters::MafParameters;

/// Typed view of the recognized site-level MAF keys with their defaults.
///
/// Constraint-scoped keys (`constraint_*`) are not part of this enumeration;
/// they are collected per constraint via
/// [`MafParameters::constraint_config`].
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Rolling window H in hours, bounded 4..=24.
    pub allocation_window_hours: i64,
    /// Sequence length cap K.
    pub max_routes_per_vehicle_in_window: usize,
    /// Extra gap between sequential routes, combined with the strict
    /// turnaround minimum.
    pub route_sequence_buffer_minutes: i64,
    /// Vehicles withheld from allocation.
    pub reserve_vehicle_count: usize,
    pub enable_dynamic_reallocation: bool,
    pub reallocation_trigger_variance_minutes: i64,
    /// Routes below this order count are tagged unfeasible and dropped.
    pub min_stops: i64,
    /// Allocation quality gate: below this score the allocation is kept but
    /// marked failed.
    pub min_allocation_score: f64,

    pub target_soc_percent: f64,
    pub site_capacity_kw: f64,
    pub synthetic_time_price_factor: f64,
    pub triad_penalty_factor: f64,
    pub target_soc_shortfall_penalty: f64,
    pub route_energy_safety_factor: f64,
    pub min_departure_buffer_minutes: i64,
    pub back_to_back_threshold_minutes: i64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            allocation_window_hours: 18,
            max_routes_per_vehicle_in_window: 5,
            route_sequence_buffer_minutes: 15,
            reserve_vehicle_count: 2,
            enable_dynamic_reallocation: true,
            reallocation_trigger_variance_minutes: 30,
            min_stops: 0,
            min_allocation_score: -4.0,

            target_soc_percent: 95.0,
            site_capacity_kw: 200.0,
            synthetic_time_price_factor: 0.01,
            triad_penalty_factor: 100.0,
            target_soc_shortfall_penalty: 1000.0,
            route_energy_safety_factor: 1.15,
            min_departure_buffer_minutes: 60,
            back_to_back_threshold_minutes: 90,
        }
    }
}

pub const MIN_WINDOW_HOURS: i64 = 4;
pub const MAX_WINDOW_HOURS: i64 = 24;

impl SiteConfig {
    pub fn from_parameters(params: &MafParameters) -> Self {
        let defaults = SiteConfig::default();

        SiteConfig {
            allocation_window_hours: params
                .int_or("allocation_window_hours", defaults.allocation_window_hours)
                .clamp(MIN_WINDOW_HOURS, MAX_WINDOW_HOURS),
            max_routes_per_vehicle_in_window: params.int_or(
                "max_routes_per_vehicle_in_window",
                defaults.max_routes_per_vehicle_in_window as i64,
            ) as usize,
            route_sequence_buffer_minutes: params.int_or(
                "route_sequence_buffer_minutes",
                defaults.route_sequence_buffer_minutes,
            ),
            reserve_vehicle_count: params
                .int_or("reserve_vehicle_count", defaults.reserve_vehicle_count as i64)
                .max(0) as usize,
            enable_dynamic_reallocation: params.bool_or(
                "enable_dynamic_reallocation",
                defaults.enable_dynamic_reallocation,
            ),
            reallocation_trigger_variance_minutes: params.int_or(
                "reallocation_trigger_variance_minutes",
                defaults.reallocation_trigger_variance_minutes,
            ),
            min_stops: params.int_or("min_stops", defaults.min_stops),
            min_allocation_score: params
                .float_or("min_allocation_score", defaults.min_allocation_score),

            target_soc_percent: params.float_or("target_soc_percent", defaults.target_soc_percent),
            site_capacity_kw: params.float_or("site_capacity_kw", defaults.site_capacity_kw),
            synthetic_time_price_factor: params.float_or(
                "synthetic_time_price_factor",
                defaults.synthetic_time_price_factor,
            ),
            triad_penalty_factor: params
                .float_or("triad_penalty_factor", defaults.triad_penalty_factor),
            target_soc_shortfall_penalty: params.float_or(
                "target_soc_shortfall_penalty",
                defaults.target_soc_shortfall_penalty,
            ),
            route_energy_safety_factor: params.float_or(
                "route_energy_safety_factor",
                defaults.route_energy_safety_factor,
            ),
            min_departure_buffer_minutes: params.int_or(
                "min_departure_buffer_minutes",
                defaults.min_departure_buffer_minutes,
            ),
            back_to_back_threshold_minutes: params.int_or(
                "back_to_back_threshold_minutes",
                defaults.back_to_back_threshold_minutes,
            ),
        }
    }
}

/// Default enablement per constraint when the `_enabled` key is absent.
pub fn default_constraint_enabled(name: &str) -> bool {
    !matches!(
        name,
        "charger_preference" | "swap_minimization" | "energy_optimization"
    )
}

/// Default penalty (or bonus) per constraint when the `penalty` key is
/// absent.
pub fn default_constraint_penalty(name: &str) -> f64 {
    match name {
        "turnaround_time_strict" => -22.0,
        "turnaround_time_preferred" => -2.0,
        "charger_preference" => 3.0,
        "swap_minimization" => 0.5,
        "energy_optimization" => 0.5,
        _ => -20.0,
    }
}
