pub mod charger_preference_constraint;
pub mod constraint;
pub mod energy_feasibility_constraint;
pub mod energy_optimization_constraint;
pub mod engine;
pub mod evaluation_context;
pub mod minimum_soonness_constraint;
pub mod route_overlap_constraint;
pub mod shift_hours_constraint;
pub mod swap_minimization_constraint;
pub mod turnaround_time_constraint;
