pub mod configuration;
pub mod helpers;
pub mod mcp;
pub mod routes;
pub mod startup;
pub mod sync;
pub mod telemetry;
