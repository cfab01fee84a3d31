use serde::{Deserialize, Serialize};

/// Point-in-time counters of an in-flight run. Each snapshot supersedes the
/// previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, derive_new::new)]
pub struct ProgressSnapshot {
    pub completed: u32,
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
    pub current_rps: f64,
    pub elapsed_secs: f64,
    pub latest_response_time_ms: f64,
}

impl ProgressSnapshot {
    /// The terminal snapshot of a run reports every request as completed.
    pub fn is_terminal(&self) -> bool {
        self.completed == self.total
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}
