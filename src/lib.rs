pub mod cadence_config;
pub mod config;
pub mod errors;
pub mod logging;
pub mod orchestrator;
pub mod report;
pub mod roster;
pub mod scheduler;
pub mod store;
pub mod worker;
