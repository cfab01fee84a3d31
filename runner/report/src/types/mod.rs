pub mod config;
pub mod hardware;
pub mod history_entry;
pub mod progress;
pub mod result;
