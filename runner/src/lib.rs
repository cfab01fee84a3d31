pub mod advisor;
pub mod coalescer;
pub mod configs;
pub mod engine;
pub mod error;
pub mod history;
pub mod logging;
pub mod orchestrator;
pub mod plot;
pub mod settings;
pub mod state;
pub mod storage;
pub mod validatable;
