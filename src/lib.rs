pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod db;
pub mod shutdown;
pub mod telemetry;
pub mod triage;
