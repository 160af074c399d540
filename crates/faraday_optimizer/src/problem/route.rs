use jiff::{SignedDuration, Timestamp};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::problem::vehicle::VehicleId;

#[derive(
    Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn new(id: impl Into<String>) -> Self {
        RouteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RouteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    New,
    Active,
    Complete,
    Cancelled,
    Error,
    Unfeasible,
}

impl RouteStatus {
    /// Map the upstream status labels (single-letter codes or full words)
    /// onto the closed status set.
    pub fn parse(label: &str) -> Option<RouteStatus> {
        match label.to_lowercase().as_str() {
            "n" | "new" => Some(RouteStatus::New),
            "a" | "active" => Some(RouteStatus::Active),
            "c" | "complete" | "completed" => Some(RouteStatus::Complete),
            "x" | "cancelled" | "canceled" => Some(RouteStatus::Cancelled),
            "e" | "error" => Some(RouteStatus::Error),
            "u" | "unfeasible" => Some(RouteStatus::Unfeasible),
            _ => None,
        }
    }
}

/// A planned delivery route.
#[derive(Serialize, Debug, Clone)]
pub struct Route {
    route_id: RouteId,
    site_id: i64,
    plan_start: Timestamp,
    plan_end: Timestamp,
    mileage: f64,
    n_orders: i64,
    status: RouteStatus,
    preassigned_vehicle: Option<VehicleId>,
}

impl Route {
    pub fn route_id(&self) -> &RouteId {
        &self.route_id
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn plan_start(&self) -> Timestamp {
        self.plan_start
    }

    pub fn plan_end(&self) -> Timestamp {
        self.plan_end
    }

    pub fn mileage(&self) -> f64 {
        self.mileage
    }

    pub fn n_orders(&self) -> i64 {
        self.n_orders
    }

    pub fn status(&self) -> RouteStatus {
        self.status
    }

    pub fn preassigned_vehicle(&self) -> Option<VehicleId> {
        self.preassigned_vehicle
    }

    pub fn set_status(&mut self, status: RouteStatus) {
        self.status = status;
    }

    pub fn duration(&self) -> SignedDuration {
        self.plan_end.duration_since(self.plan_start)
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration().as_secs_f64() / 3600.0
    }

    /// Whether the two routes collide in time, requiring `turnaround` of
    /// separation in either direction.
    pub fn overlaps_with(&self, other: &Route, turnaround: SignedDuration) -> bool {
        if self.plan_end + turnaround <= other.plan_start {
            return false;
        }
        if other.plan_end + turnaround <= self.plan_start {
            return false;
        }
        true
    }

    /// Whether `next` can follow this route on the same vehicle with at
    /// least `turnaround` between arrival and the next departure.
    pub fn can_precede(&self, next: &Route, turnaround: SignedDuration) -> bool {
        self.plan_end + turnaround <= next.plan_start
    }
}

/// Canonicalize the upstream pre-assignment field. The source systems use
/// `0`, `-1`, `X` and null interchangeably for "no pre-assignment"; all of
/// them map to `None` here.
pub fn preassigned_from_id(raw: i64) -> Option<VehicleId> {
    if raw <= 0 { None } else { Some(VehicleId::new(raw)) }
}

/// Text variant of [`preassigned_from_id`] for sources that store the field
/// as a string.
pub fn preassigned_from_label(raw: &str) -> Option<VehicleId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("x") {
        return None;
    }
    trimmed.parse::<i64>().ok().and_then(preassigned_from_id)
}

#[derive(Default)]
pub struct RouteBuilder {
    route_id: Option<RouteId>,
    site_id: Option<i64>,
    plan_start: Option<Timestamp>,
    plan_end: Option<Timestamp>,
    mileage: Option<f64>,
    n_orders: Option<i64>,
    status: Option<RouteStatus>,
    preassigned_vehicle: Option<VehicleId>,
}

impl RouteBuilder {
    pub fn set_route_id(&mut self, route_id: impl Into<String>) -> &mut RouteBuilder {
        self.route_id = Some(RouteId::new(route_id));
        self
    }

    pub fn set_site_id(&mut self, site_id: i64) -> &mut RouteBuilder {
        self.site_id = Some(site_id);
        self
    }

    pub fn set_plan_start(&mut self, plan_start: Timestamp) -> &mut RouteBuilder {
        self.plan_start = Some(plan_start);
        self
    }

    pub fn set_plan_end(&mut self, plan_end: Timestamp) -> &mut RouteBuilder {
        self.plan_end = Some(plan_end);
        self
    }

    pub fn set_mileage(&mut self, mileage: f64) -> &mut RouteBuilder {
        self.mileage = Some(mileage);
        self
    }

    pub fn set_n_orders(&mut self, n_orders: i64) -> &mut RouteBuilder {
        self.n_orders = Some(n_orders);
        self
    }

    pub fn set_status(&mut self, status: RouteStatus) -> &mut RouteBuilder {
        self.status = Some(status);
        self
    }

    pub fn set_preassigned_vehicle(&mut self, vehicle_id: VehicleId) -> &mut RouteBuilder {
        self.preassigned_vehicle = Some(vehicle_id);
        self
    }

    pub fn build(self) -> Route {
        Route {
            route_id: self.route_id.expect("Route ID is required"),
            site_id: self.site_id.unwrap_or(0),
            plan_start: self.plan_start.expect("Plan start is required"),
            plan_end: self.plan_end.expect("Plan end is required"),
            mileage: self.mileage.unwrap_or(0.0),
            n_orders: self.n_orders.unwrap_or(0),
            status: self.status.unwrap_or(RouteStatus::New),
            preassigned_vehicle: self.preassigned_vehicle,
        }
    }
}
