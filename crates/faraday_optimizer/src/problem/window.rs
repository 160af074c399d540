use fxhash::{FxHashMap, FxHashSet};
use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    maf::site_config::SiteConfig,
    problem::{
        route::{Route, RouteId, RouteStatus},
        snapshot::DomainSnapshot,
        vehicle::VehicleId,
        vehicle_state::VehicleState,
    },
};

/// The rolling `[now, now + H)` horizon of one run.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanningWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl PlanningWindow {
    /// Horizon hours are expected pre-clamped to 4..=24 by the site config.
    pub fn build(now: Timestamp, horizon_hours: i64) -> PlanningWindow {
        PlanningWindow {
            start: now,
            end: now + SignedDuration::from_hours(horizon_hours),
        }
    }

    pub fn contains(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant < self.end
    }

    pub fn hours(&self) -> f64 {
        self.end.duration_since(self.start).as_secs_f64() / 3600.0
    }
}

/// When a vehicle can next take work and with how much energy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleAvailability {
    pub available_from: Timestamp,
    pub available_energy_kwh: f64,
}

/// Inputs to sequence enumeration: the eligible route set, per-vehicle
/// availability, and the allocation candidate vehicles.
#[derive(Debug, Clone)]
pub struct AllocationProblem {
    pub window: PlanningWindow,
    /// Eligible routes, sorted by start then id.
    pub routes: Vec<Route>,
    pub availability: FxHashMap<VehicleId, VehicleAvailability>,
    /// Vehicles that may receive sequences, ascending id, reserve withheld.
    pub allocatable: Vec<VehicleId>,
    /// Routes tagged unfeasible because they carry too few orders.
    pub unfeasible_routes: Vec<RouteId>,
    /// Eligible routes that temporally collide with another eligible route.
    pub overlapping_route_count: usize,
}

/// Build the allocation inputs from a snapshot: filter eligible routes,
/// derive availability and cascade committed work through it.
pub fn build_allocation_problem(
    snapshot: &DomainSnapshot,
    config: &SiteConfig,
    now: Timestamp,
    turnaround: SignedDuration,
) -> AllocationProblem {
    let window = PlanningWindow::build(now, config.allocation_window_hours);

    let committed_ids: FxHashSet<&RouteId> =
        snapshot.committed.iter().map(|(route_id, _)| route_id).collect();

    let mut routes = Vec::new();
    let mut unfeasible_routes = Vec::new();

    for route in &snapshot.routes {
        if route.site_id() != snapshot.site_id
            || route.status() != RouteStatus::New
            || !window.contains(route.plan_start())
            || committed_ids.contains(route.route_id())
        {
            continue;
        }

        if config.min_stops > 0 && route.n_orders() < config.min_stops {
            debug!(
                route_id = %route.route_id(),
                n_orders = route.n_orders(),
                min_stops = config.min_stops,
                "route tagged unfeasible: too few orders"
            );
            unfeasible_routes.push(route.route_id().clone());
            continue;
        }

        routes.push(route.clone());
    }

    let availability = build_availability(snapshot, now, turnaround);

    let mut allocatable: Vec<VehicleId> = snapshot
        .vehicles
        .iter()
        .filter(|vehicle| vehicle.is_allocatable())
        .map(|vehicle| vehicle.vehicle_id())
        .collect();
    allocatable.sort();

    // Reserve vehicles are withheld from allocation only; they still take
    // part in charge scheduling. Highest ids are withheld first.
    let reserve = config.reserve_vehicle_count.min(allocatable.len());
    if reserve > 0 {
        let withheld = allocatable.split_off(allocatable.len() - reserve);
        debug!(?withheld, "withholding reserve vehicles from allocation");
    }

    let overlapping_route_count = count_overlapping(&routes);

    info!(
        window_start = %window.start,
        window_end = %window.end,
        eligible_routes = routes.len(),
        unfeasible = unfeasible_routes.len(),
        allocatable_vehicles = allocatable.len(),
        overlapping = overlapping_route_count,
        "allocation window built"
    );

    AllocationProblem {
        window,
        routes,
        availability,
        allocatable,
        unfeasible_routes,
        overlapping_route_count,
    }
}

fn build_availability(
    snapshot: &DomainSnapshot,
    now: Timestamp,
    turnaround: SignedDuration,
) -> FxHashMap<VehicleId, VehicleAvailability> {
    let default_state = VehicleState::default();
    let mut availability = FxHashMap::default();

    for vehicle in &snapshot.vehicles {
        let state = snapshot
            .states
            .get(&vehicle.vehicle_id())
            .unwrap_or(&default_state);

        let mut entry = VehicleAvailability {
            available_from: state.available_from(now),
            available_energy_kwh: state.available_energy_kwh(vehicle),
        };

        // Work already committed inside the window pushes availability out
        // and consumes energy, route by route.
        let mut committed: Vec<&Route> = snapshot
            .committed
            .iter()
            .filter(|(_, vehicle_id)| *vehicle_id == vehicle.vehicle_id())
            .filter_map(|(route_id, _)| snapshot.route(route_id))
            .collect();
        committed.sort_by_key(|route| route.plan_start());

        for route in committed {
            let required = vehicle.energy_required_kwh(route.mileage());
            entry.available_energy_kwh = (entry.available_energy_kwh - required).max(0.0);
            let freed = route.plan_end() + turnaround;
            if freed > entry.available_from {
                entry.available_from = freed;
            }
        }

        if entry.available_from > state.available_from(now) {
            debug!(
                vehicle_id = %vehicle.vehicle_id(),
                available_from = %entry.available_from,
                available_energy_kwh = entry.available_energy_kwh,
                "availability adjusted for committed routes"
            );
        }

        availability.insert(vehicle.vehicle_id(), entry);
    }

    if availability.is_empty() {
        warn!("no vehicles available for site");
    }

    availability
}

fn count_overlapping(routes: &[Route]) -> usize {
    routes
        .iter()
        .filter(|route| {
            routes.iter().any(|other| {
                other.route_id() != route.route_id()
                    && route.overlaps_with(other, SignedDuration::ZERO)
            })
        })
        .count()
}
