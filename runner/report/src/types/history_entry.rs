use super::config::TestConfig;
use super::result::{success_rate, RunResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of a past run. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Configuration the run was started with, enough to refill the form.
    pub config: TestConfig,
    pub total_time_secs: f64,
    pub requests_per_second: f64,
    pub avg_response_ms: f64,
    pub successful_requests: u32,
    pub failed_requests: u32,
    /// Compacted result, per-request outcomes are always empty.
    pub result: RunResult,
}

impl HistoryEntry {
    pub fn new(result: &RunResult, config: &TestConfig) -> Self {
        Self::recorded_at(result, config, Utc::now())
    }

    pub fn recorded_at(result: &RunResult, config: &TestConfig, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            config: config.normalized(),
            total_time_secs: result.total_time_secs,
            requests_per_second: result.requests_per_second,
            avg_response_ms: result.avg_response_time_ms,
            successful_requests: result.successful_requests,
            failed_requests: result.failed_requests,
            result: result.compacted(),
        }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn success_rate(&self) -> Option<f64> {
        success_rate(self.successful_requests, self.failed_requests)
    }
}
