use std::path::PathBuf;

use clap::Args;
use jiff::{SignedDuration, Timestamp, civil, tz::TimeZone};
use tracing::error;

use faraday_optimizer::{
    error::RunError,
    json::JsonSiteSnapshot,
    maf::parameters::MafParameters,
    problem::snapshot::DomainSnapshot,
    solver::{
        backend::NoExternalSolver,
        unified::{
            config::{OptimizationMode, UnifiedConfig},
            coordinator::{Coordinator, swap_lookback},
            result::UnifiedResult,
        },
    },
    sources::DomainSource,
};

pub enum Command {
    Allocation,
    Scheduling,
    Unified,
}

#[derive(Args)]
pub struct RunArgs {
    /// Site identifier.
    #[arg(long)]
    pub site_id: i64,

    /// Site snapshot file to optimize over.
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Run instant (ISO timestamp, or `YYYY-MM-DD HH:MM:SS` read as UTC).
    /// Defaults to now.
    #[arg(long)]
    pub start_time: Option<String>,

    /// Rolling window length; overrides the site configuration.
    #[arg(long)]
    pub window_hours: Option<i64>,

    /// Optimization mode; only meaningful for the `unified` command.
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<OptimizationMode>,

    /// α: weight of the allocation term.
    #[arg(long)]
    pub allocation_weight: Option<f64>,

    /// β: weight of the charging cost term.
    #[arg(long)]
    pub scheduling_weight: Option<f64>,

    /// Target state of charge in percent.
    #[arg(long)]
    pub target_soc: Option<f64>,

    /// Maximum concurrent site draw in kW.
    #[arg(long)]
    pub site_capacity: Option<f64>,

    #[arg(long)]
    pub allocation_time_limit: Option<u64>,

    #[arg(long)]
    pub scheduling_time_limit: Option<u64>,

    #[arg(long)]
    pub integrated_time_limit: Option<u64>,

    /// Emit the full result as JSON instead of the summary.
    #[arg(long)]
    pub json: bool,
}

fn parse_mode(raw: &str) -> Result<OptimizationMode, String> {
    OptimizationMode::parse(raw).ok_or_else(|| format!("unknown mode `{raw}`"))
}

fn parse_start_time(raw: &str) -> Result<Timestamp, String> {
    if let Ok(timestamp) = raw.parse::<Timestamp>() {
        return Ok(timestamp);
    }

    let datetime: civil::DateTime = raw
        .replace(' ', "T")
        .parse()
        .map_err(|err| format!("invalid start time `{raw}`: {err}"))?;
    datetime
        .to_zoned(TimeZone::UTC)
        .map(|zoned| zoned.timestamp())
        .map_err(|err| format!("invalid start time `{raw}`: {err}"))
}

/// Exit codes: 0 success (fallback included), 1 invalid arguments, 2 no
/// feasible result, 3 external dependency failure.
pub fn run(args: RunArgs, command: Command) -> u8 {
    let now = match &args.start_time {
        Some(raw) => match parse_start_time(raw) {
            Ok(timestamp) => timestamp,
            Err(message) => {
                eprintln!("error: {message}");
                return 1;
            }
        },
        None => Timestamp::now(),
    };

    let mode = match command {
        Command::Allocation => OptimizationMode::AllocationOnly,
        Command::Scheduling => OptimizationMode::SchedulingOnly,
        Command::Unified => args.mode.unwrap_or(OptimizationMode::Integrated),
    };

    match execute(&args, mode, now) {
        Ok(result) => {
            if args.json {
                match serde_json::to_string_pretty(&result) {
                    Ok(rendered) => println!("{rendered}"),
                    Err(err) => {
                        error!("failed to render result: {err}");
                        return 2;
                    }
                }
            } else {
                print_summary(&args, &result);
            }
            if result.has_output() { 0 } else { 2 }
        }
        Err(RunError::Source(err)) => {
            error!("domain input failed: {err}");
            3
        }
        Err(RunError::MissingParameter(key)) => {
            error!("required parameter `{key}` is missing");
            1
        }
        Err(err) => {
            error!("run failed: {err}");
            2
        }
    }
}

fn execute(args: &RunArgs, mode: OptimizationMode, now: Timestamp) -> Result<UnifiedResult, RunError> {
    let source = JsonSiteSnapshot::from_file(&args.input)?;

    let raw_parameters = source.load_site_parameters(args.site_id)?;
    let parameters = MafParameters::decode(
        raw_parameters
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str())),
    );

    let mut config = UnifiedConfig {
        mode,
        ..UnifiedConfig::default()
    };
    if let Some(seconds) = args.allocation_time_limit {
        config.allocation_time_limit = SignedDuration::from_secs(seconds as i64);
    }
    if let Some(seconds) = args.scheduling_time_limit {
        config.scheduling_time_limit = SignedDuration::from_secs(seconds as i64);
    }
    if let Some(seconds) = args.integrated_time_limit {
        config.integrated_time_limit = SignedDuration::from_secs(seconds as i64);
    }
    if let Some(alpha) = args.allocation_weight {
        config.allocation_weight = alpha;
    }
    if let Some(beta) = args.scheduling_weight {
        config.scheduling_weight = beta;
    }

    // The snapshot window must cover the widest horizon the run may use.
    let window_hours = args.window_hours.unwrap_or(24).clamp(4, 24);
    let snapshot = DomainSnapshot::load(
        &source,
        args.site_id,
        now,
        now + SignedDuration::from_hours(window_hours),
        swap_lookback(&parameters),
    )?;

    let coordinator = Coordinator::new(&snapshot, &parameters, config, &NoExternalSolver)
        .with_site_overrides(|site| {
            if let Some(hours) = args.window_hours {
                site.allocation_window_hours = hours.clamp(4, 24);
            }
            if let Some(target_soc) = args.target_soc {
                site.target_soc_percent = target_soc;
            }
            if let Some(capacity) = args.site_capacity {
                site.site_capacity_kw = capacity;
            }
        });

    coordinator.run(now, now.as_second())
}

fn print_summary(args: &RunArgs, result: &UnifiedResult) {
    println!("{:=<70}", "");
    println!("OPTIMIZATION COMPLETED");
    println!("{:=<70}", "");
    println!("Site ID:          {}", args.site_id);
    println!("Mode:             {:?}", result.mode);
    println!("Solver status:    {:?}", result.solver_status);
    println!("Objective value:  {:.2}", result.objective_value);
    println!(
        "Solve time:       {:.2}s",
        result.solve_time.as_secs_f64()
    );
    if result.fallback {
        println!("Fallback:         greedy solver used");
    }

    if let Some(allocation) = &result.allocation {
        println!();
        println!("ALLOCATION:");
        println!(
            "  Routes allocated: {}/{}",
            allocation.routes_allocated, allocation.routes_in_window
        );
        println!("  Total score:      {:.2}", allocation.total_score);
        println!("  Status:           {:?}", allocation.status);
        for assignment in &allocation.assignments {
            println!(
                "    route {} -> vehicle {} (arrival {}, soc {:.1}%)",
                assignment.route_id,
                assignment.vehicle_id,
                assignment.estimated_arrival,
                assignment.estimated_arrival_soc
            );
        }
    }

    if let Some(plan) = &result.charge_plan {
        println!();
        println!("CHARGE SCHEDULING:");
        println!("  Total energy:     {:.2} kWh", plan.total_energy_kwh);
        println!("  Total cost:       {:.2}", plan.total_cost);
        let average = if plan.total_energy_kwh > 0.0 {
            plan.total_cost / plan.total_energy_kwh
        } else {
            0.0
        };
        println!("  Avg cost/kWh:     {average:.4}");
        println!("  Shortfall:        {:.2} kWh", plan.total_shortfall_kwh());
        if !plan.meets_all_checkpoints() {
            println!(
                "  Missed departures: {}",
                plan.checkpoint_misses.len()
            );
        }
    }

    println!("{:=<70}", "");
}
