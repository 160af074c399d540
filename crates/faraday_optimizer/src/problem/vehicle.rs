use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stable vehicle identifier.
#[derive(
    Serialize,
    Deserialize,
    JsonSchema,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
)]
#[serde(transparent)]
pub struct VehicleId(i64);

impl VehicleId {
    pub const fn new(id: i64) -> Self {
        VehicleId(id)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery vehicle, loaded once at the start of a run and immutable for
/// the run.
#[derive(Serialize, Debug, Clone)]
pub struct Vehicle {
    vehicle_id: VehicleId,
    site_id: i64,
    active: bool,
    out_of_service: bool,
    battery_capacity_kwh: f64,
    efficiency_kwh_per_mile: f64,
    ac_charge_rate_kw: f64,
    dc_charge_rate_kw: f64,
    enabled: bool,
}

impl Vehicle {
    pub fn vehicle_id(&self) -> VehicleId {
        self.vehicle_id
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn battery_capacity_kwh(&self) -> f64 {
        self.battery_capacity_kwh
    }

    pub fn efficiency_kwh_per_mile(&self) -> f64 {
        self.efficiency_kwh_per_mile
    }

    pub fn ac_charge_rate_kw(&self) -> f64 {
        self.ac_charge_rate_kw
    }

    pub fn dc_charge_rate_kw(&self) -> f64 {
        self.dc_charge_rate_kw
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_allocatable(&self) -> bool {
        self.active && !self.out_of_service && self.enabled
    }

    pub fn is_out_of_service(&self) -> bool {
        self.out_of_service
    }

    /// Energy in kWh needed to drive the given distance.
    pub fn energy_required_kwh(&self, distance_miles: f64) -> f64 {
        distance_miles * self.efficiency_kwh_per_mile
    }

    /// Effective charge rate in kW for the selected connector type.
    pub fn charge_rate_kw(&self, use_dc: bool) -> f64 {
        if use_dc {
            self.dc_charge_rate_kw
        } else {
            self.ac_charge_rate_kw
        }
    }
}

#[derive(Default)]
pub struct VehicleBuilder {
    vehicle_id: Option<i64>,
    site_id: Option<i64>,
    active: Option<bool>,
    out_of_service: Option<bool>,
    battery_capacity_kwh: Option<f64>,
    efficiency_kwh_per_mile: Option<f64>,
    ac_charge_rate_kw: Option<f64>,
    dc_charge_rate_kw: Option<f64>,
    enabled: Option<bool>,
}

impl VehicleBuilder {
    pub fn set_vehicle_id(&mut self, vehicle_id: i64) -> &mut VehicleBuilder {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    pub fn set_site_id(&mut self, site_id: i64) -> &mut VehicleBuilder {
        self.site_id = Some(site_id);
        self
    }

    pub fn set_active(&mut self, active: bool) -> &mut VehicleBuilder {
        self.active = Some(active);
        self
    }

    pub fn set_out_of_service(&mut self, out_of_service: bool) -> &mut VehicleBuilder {
        self.out_of_service = Some(out_of_service);
        self
    }

    pub fn set_battery_capacity_kwh(&mut self, battery_capacity_kwh: f64) -> &mut VehicleBuilder {
        self.battery_capacity_kwh = Some(battery_capacity_kwh);
        self
    }

    pub fn set_efficiency_kwh_per_mile(&mut self, efficiency: f64) -> &mut VehicleBuilder {
        self.efficiency_kwh_per_mile = Some(efficiency);
        self
    }

    pub fn set_ac_charge_rate_kw(&mut self, rate: f64) -> &mut VehicleBuilder {
        self.ac_charge_rate_kw = Some(rate);
        self
    }

    pub fn set_dc_charge_rate_kw(&mut self, rate: f64) -> &mut VehicleBuilder {
        self.dc_charge_rate_kw = Some(rate);
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) -> &mut VehicleBuilder {
        self.enabled = Some(enabled);
        self
    }

    pub fn build(self) -> Vehicle {
        Vehicle {
            vehicle_id: VehicleId::new(self.vehicle_id.expect("Vehicle ID is required")),
            site_id: self.site_id.unwrap_or(0),
            active: self.active.unwrap_or(true),
            out_of_service: self.out_of_service.unwrap_or(false),
            battery_capacity_kwh: self.battery_capacity_kwh.unwrap_or(80.0),
            efficiency_kwh_per_mile: self.efficiency_kwh_per_mile.unwrap_or(0.35),
            ac_charge_rate_kw: self.ac_charge_rate_kw.unwrap_or(11.0),
            dc_charge_rate_kw: self.dc_charge_rate_kw.unwrap_or(50.0),
            enabled: self.enabled.unwrap_or(true),
        }
    }
}
