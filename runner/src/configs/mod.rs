pub mod config_provider;
pub mod defaults;
pub mod displays;
pub mod runner;
pub mod validators;
