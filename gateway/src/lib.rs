pub mod app_settings;
pub mod error;
pub mod routes;
pub mod startup;
pub mod telemetry;
