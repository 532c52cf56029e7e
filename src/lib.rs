// The binary is the host; the library surface exists for integration tests and embedders.
pub mod cli;
pub mod config;
pub mod host;
pub mod logging;
pub mod scheduler;
pub mod telemetry;
