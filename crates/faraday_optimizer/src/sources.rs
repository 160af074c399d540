use jiff::Timestamp;

use crate::{
    error::SourceError,
    problem::{
        price_point::PriceSample,
        route::{Route, RouteId},
        vehicle::{Vehicle, VehicleId},
        vehicle_state::VehicleState,
    },
};

/// The domain inputs the core consumes. Persistence (fleet database,
/// telematics store, price feed) lives behind this seam; the core only ever
/// sees an implementation of it.
///
/// The crate ships a JSON-snapshot implementation
/// ([`crate::json::JsonSiteSnapshot`]); production deployments wire the same
/// trait to their stores.
pub trait DomainSource {
    /// Raw site parameters as the string pairs returned by
    /// `sp_get_module_params`; typing is owned by the parameter decoder.
    fn load_site_parameters(&self, site_id: i64) -> Result<Vec<(String, String)>, SourceError>;

    fn list_vehicles(&self, site_id: i64) -> Result<Vec<Vehicle>, SourceError>;

    fn latest_vehicle_states(&self, site_id: i64) -> Result<Vec<VehicleState>, SourceError>;

    fn list_routes_in_window(
        &self,
        site_id: i64,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<Route>, SourceError>;

    fn list_committed_allocations(
        &self,
        site_id: i64,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<(RouteId, VehicleId)>, SourceError>;

    /// The vehicle most recently recorded against the route at or after
    /// `since`. Latest record wins when several exist.
    fn previous_allocation(
        &self,
        route_id: &RouteId,
        since: Timestamp,
    ) -> Result<Option<VehicleId>, SourceError>;

    fn prices_and_forecast(
        &self,
        window_start: Timestamp,
        window_end: Timestamp,
    ) -> Result<Vec<PriceSample>, SourceError>;

    /// Which charger each vehicle currently occupies, if any. At most one
    /// vehicle per charger.
    fn vehicle_chargers(
        &self,
        site_id: i64,
        at: Timestamp,
    ) -> Result<Vec<(VehicleId, Option<i64>)>, SourceError>;
}
