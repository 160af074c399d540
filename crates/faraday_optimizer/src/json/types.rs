use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use jiff::Timestamp;
use serde::Deserialize;

use crate::{
    error::SourceError,
    problem::{
        price_point::PriceSample,
        route::{self, Route, RouteBuilder, RouteId, RouteStatus},
        vehicle::{Vehicle, VehicleBuilder, VehicleId},
        vehicle_state::{VehicleState, VehicleStatus},
    },
    sources::DomainSource,
};

/// A complete site snapshot in file form: everything a run needs from the
/// fleet database, telematics store and price feed. This is the input the
/// CLI consumes; production deployments implement [`DomainSource`] against
/// their own stores instead.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename = "SiteSnapshot")]
pub struct JsonSiteSnapshot {
    pub site_id: i64,
    /// Raw MAF parameters, string to string.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub vehicles: Vec<JsonVehicle>,
    #[serde(default)]
    pub vehicle_states: Vec<JsonVehicleState>,
    #[serde(default)]
    pub routes: Vec<JsonRoute>,
    #[serde(default)]
    pub committed_allocations: Vec<JsonCommittedAllocation>,
    #[serde(default)]
    pub previous_allocations: Vec<JsonPreviousAllocation>,
    #[serde(default)]
    pub prices: Vec<JsonPricePoint>,
    #[serde(default)]
    pub vehicle_chargers: Vec<JsonVehicleCharger>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename = "Vehicle")]
pub struct JsonVehicle {
    pub vehicle_id: i64,
    pub site_id: i64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub out_of_service: bool,
    pub battery_capacity_kwh: Option<f64>,
    pub efficiency_kwh_per_mile: Option<f64>,
    pub ac_charge_rate_kw: Option<f64>,
    pub dc_charge_rate_kw: Option<f64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename = "VehicleState")]
pub struct JsonVehicleState {
    pub vehicle_id: i64,
    pub status: Option<String>,
    pub estimated_soc_percent: Option<f64>,
    pub return_eta: Option<Timestamp>,
    pub return_soc_percent: Option<f64>,
    pub current_route_id: Option<String>,
}

/// Pre-assignments arrive as integers or legacy text sentinels.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum JsonVehicleRef {
    Id(i64),
    Label(String),
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename = "Route")]
pub struct JsonRoute {
    pub route_id: String,
    pub site_id: i64,
    pub plan_start: Timestamp,
    pub plan_end: Timestamp,
    pub mileage: f64,
    #[serde(default)]
    pub n_orders: i64,
    pub status: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<JsonVehicleRef>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct JsonCommittedAllocation {
    pub route_id: String,
    pub vehicle_id: i64,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct JsonPreviousAllocation {
    pub route_id: String,
    pub vehicle_id: i64,
    pub recorded_at: Timestamp,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename = "PricePoint")]
pub struct JsonPricePoint {
    pub at: Timestamp,
    pub energy_price: f64,
    #[serde(default)]
    pub triad: bool,
    #[serde(default)]
    pub load_forecast_kw: f64,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct JsonVehicleCharger {
    pub vehicle_id: i64,
    pub charger_id: Option<i64>,
}

fn default_true() -> bool {
    true
}

impl JsonSiteSnapshot {
    pub fn from_file(path: &Path) -> Result<JsonSiteSnapshot, SourceError> {
        let file = File::open(path)?;
        let snapshot = serde_json::from_reader(BufReader::new(file))?;
        Ok(snapshot)
    }

    fn build_vehicle(&self, json: &JsonVehicle) -> Vehicle {
        let mut builder = VehicleBuilder::default();
        builder.set_vehicle_id(json.vehicle_id);
        builder.set_site_id(json.site_id);
        builder.set_active(json.active);
        builder.set_out_of_service(json.out_of_service);
        builder.set_enabled(json.enabled);
        if let Some(battery) = json.battery_capacity_kwh {
            builder.set_battery_capacity_kwh(battery);
        }
        if let Some(efficiency) = json.efficiency_kwh_per_mile {
            builder.set_efficiency_kwh_per_mile(efficiency);
        }
        if let Some(rate) = json.ac_charge_rate_kw {
            builder.set_ac_charge_rate_kw(rate);
        }
        if let Some(rate) = json.dc_charge_rate_kw {
            builder.set_dc_charge_rate_kw(rate);
        }
        builder.build()
    }

    fn build_route(&self, json: &JsonRoute) -> Route {
        let mut builder = RouteBuilder::default();
        builder.set_route_id(json.route_id.clone());
        builder.set_site_id(json.site_id);
        builder.set_plan_start(json.plan_start);
        builder.set_plan_end(json.plan_end);
        builder.set_mileage(json.mileage);
        builder.set_n_orders(json.n_orders);

        let status = json
            .status
            .as_deref()
            .and_then(RouteStatus::parse)
            .unwrap_or(RouteStatus::New);
        builder.set_status(status);

        let preassigned = match &json.vehicle_id {
            Some(JsonVehicleRef::Id(id)) => route::preassigned_from_id(*id),
            Some(JsonVehicleRef::Label(label)) => route::preassigned_from_label(label),
            None => None,
        };
        if let Some(vehicle_id) = preassigned {
            builder.set_preassigned_vehicle(vehicle_id);
        }

        builder.build()
    }
}

impl DomainSource for JsonSiteSnapshot {
    fn load_site_parameters(&self, site_id: i64) -> Result<Vec<(String, String)>, SourceError> {
        if site_id != self.site_id {
            return Err(SourceError::SiteMismatch {
                requested: site_id,
                found: self.site_id,
            });
        }
        Ok(self
            .parameters
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn list_vehicles(&self, site_id: i64) -> Result<Vec<Vehicle>, SourceError> {
        Ok(self
            .vehicles
            .iter()
            .filter(|vehicle| vehicle.site_id == site_id)
            .map(|vehicle| self.build_vehicle(vehicle))
            .collect())
    }

    fn latest_vehicle_states(&self, _site_id: i64) -> Result<Vec<VehicleState>, SourceError> {
        Ok(self
            .vehicle_states
            .iter()
            .map(|state| VehicleState {
                vehicle_id: VehicleId::new(state.vehicle_id),
                status: state
                    .status
                    .as_deref()
                    .map(VehicleStatus::parse)
                    .unwrap_or_default(),
                estimated_soc_percent: state.estimated_soc_percent,
                return_eta: state.return_eta,
                return_soc_percent: state.return_soc_percent,
                current_route_id: state.current_route_id.clone().map(RouteId::new),
            })
            .collect())
    }

    fn list_routes_in_window(
        &self,
        site_id: i64,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<Route>, SourceError> {
        Ok(self
            .routes
            .iter()
            .filter(|route| route.site_id == site_id)
            .filter(|route| window_start <= route.plan_start && route.plan_start < window_end)
            .map(|route| self.build_route(route))
            .collect())
    }

    fn list_committed_allocations(
        &self,
        _site_id: i64,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<(RouteId, VehicleId)>, SourceError> {
        Ok(self
            .committed_allocations
            .iter()
            .filter(|committed| {
                self.routes.iter().any(|route| {
                    route.route_id == committed.route_id
                        && window_start <= route.plan_start
                        && route.plan_start < window_end
                })
            })
            .map(|committed| {
                (
                    RouteId::new(committed.route_id.clone()),
                    VehicleId::new(committed.vehicle_id),
                )
            })
            .collect())
    }

    fn previous_allocation(
        &self,
        route_id: &RouteId,
        since: Timestamp,
    ) -> Result<Option<VehicleId>, SourceError> {
        // Latest record wins.
        Ok(self
            .previous_allocations
            .iter()
            .filter(|previous| previous.route_id == route_id.as_str())
            .filter(|previous| previous.recorded_at >= since)
            .max_by_key(|previous| previous.recorded_at)
            .map(|previous| VehicleId::new(previous.vehicle_id)))
    }

    fn prices_and_forecast(
        &self,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<PriceSample>, SourceError> {
        Ok(self
            .prices
            .iter()
            .filter(|price| window_start <= price.at && price.at < window_end)
            .map(|price| PriceSample {
                at: price.at,
                energy_price: price.energy_price,
                triad: price.triad,
                load_forecast_kw: price.load_forecast_kw,
            })
            .collect())
    }

    fn vehicle_chargers(
        &self,
        _site_id: i64,
        _at: Timestamp,
    ) -> Result<Vec<(VehicleId, Option<i64>)>, SourceError> {
        Ok(self
            .vehicle_chargers
            .iter()
            .map(|entry| (VehicleId::new(entry.vehicle_id), entry.charger_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_snapshot_parses() {
        let raw = r#"{
            "site_id": 10,
            "vehicles": [
                {"vehicle_id": 1, "site_id": 10, "battery_capacity_kwh": 200.0,
                 "efficiency_kwh_per_mile": 1.0, "ac_charge_rate_kw": 22.0,
                 "dc_charge_rate_kw": 50.0}
            ],
            "routes": [
                {"route_id": "R1", "site_id": 10,
                 "plan_start": "2026-02-16T08:00:00Z",
                 "plan_end": "2026-02-16T09:00:00Z",
                 "mileage": 30.0, "n_orders": 12, "status": "N",
                 "vehicle_id": "X"}
            ]
        }"#;

        let snapshot: JsonSiteSnapshot = serde_json::from_str(raw).unwrap();
        let routes = snapshot
            .list_routes_in_window(
                10,
                "2026-02-16T04:00:00Z".parse().unwrap(),
                "2026-02-16T22:00:00Z".parse().unwrap(),
            )
            .unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].status(), RouteStatus::New);
        // "X" is a no-pre-assignment sentinel.
        assert_eq!(routes[0].preassigned_vehicle(), None);
    }

    #[test]
    fn test_previous_allocation_latest_wins() {
        let raw = r#"{
            "site_id": 10,
            "vehicles": [],
            "previous_allocations": [
                {"route_id": "R1", "vehicle_id": 4, "recorded_at": "2026-02-15T10:00:00Z"},
                {"route_id": "R1", "vehicle_id": 7, "recorded_at": "2026-02-15T20:00:00Z"}
            ]
        }"#;

        let snapshot: JsonSiteSnapshot = serde_json::from_str(raw).unwrap();
        let since: Timestamp = "2026-02-15T00:00:00Z".parse().unwrap();

        assert_eq!(
            snapshot
                .previous_allocation(&RouteId::new("R1"), since)
                .unwrap(),
            Some(VehicleId::new(7))
        );

        // Outside the lookback nothing is returned.
        let since: Timestamp = "2026-02-16T00:00:00Z".parse().unwrap();
        assert_eq!(
            snapshot
                .previous_allocation(&RouteId::new("R1"), since)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_site_mismatch_rejected() {
        let raw = r#"{"site_id": 10, "vehicles": []}"#;
        let snapshot: JsonSiteSnapshot = serde_json::from_str(raw).unwrap();

        assert!(snapshot.load_site_parameters(11).is_err());
    }
}
