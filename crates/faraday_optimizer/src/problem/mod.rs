pub mod price_point;
pub mod route;
pub mod snapshot;
pub mod time_slot;
pub mod vehicle;
pub mod vehicle_state;
pub mod window;
