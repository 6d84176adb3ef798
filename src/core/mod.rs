pub mod config;
pub mod debounce;
pub mod errors;
pub mod telemetry;
