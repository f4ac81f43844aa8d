//! Feature derivation
//!
//! Adds three groups of columns to a cleaned table:
//! - `fuel_efficiency_per_trip`: distance over fuel, per row
//! - `idle_time`: per-vehicle count of stationary rows, on every row of the vehicle
//! - `high_engine_load` / `high_speed_driving`: threshold flags, per row

mod config;
mod deriver;

pub use config::{FeatureConfig, ZeroFuelPolicy};
pub use deriver::{
    FeatureDeriver, FUEL_EFFICIENCY_PER_TRIP, HIGH_ENGINE_LOAD, HIGH_SPEED_DRIVING, IDLE_TIME,
};
