//! Core library for the weather gateway.
//!
//! This crate defines:
//! - Configuration of upstream base URLs and the outbound client
//! - The resource client and per-upstream gateways
//! - Concurrent per-day fan-out over a date range
//! - Shared domain models (temperatures, wind speeds, merged weather)
//!
//! It is used by `weather-gateway`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod date;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod model;
pub mod service;
pub mod validate;

pub use config::{ClientSettings, Config, ConfigError};
pub use date::{DateRange, Day};
pub use error::FetchError;
pub use gateway::{HttpGateway, ResourceGateway, Upstream};
pub use model::{Resource, Temperature, Weather, WindSpeed};
pub use service::WeatherService;
pub use validate::parse_range;
