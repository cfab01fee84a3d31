use derive_more::derive::Display;
use serde::{Deserialize, Serialize};

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize, Default)]
pub enum ErrorKind {
    #[default]
    None,
    /// Server too slow to answer within the timeout.
    Timeout,
    /// DNS, TCP connect or TLS handshake failure.
    Connection,
    Request,
    /// 4xx or 5xx response.
    Response,
    /// Too many redirects or a redirect loop.
    Redirect,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub status: u16,
    pub duration_ms: f64,
    pub success: bool,
    pub error: Option<String>,
    #[serde(default, rename = "error_type")]
    pub error_kind: ErrorKind,
    /// Milliseconds since the run started.
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct HistogramBucket {
    pub min_ms: f64,
    pub max_ms: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LatencyPercentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyPercentiles {
    pub fn labeled(&self) -> [(&'static str, f64); 7] {
        [
            ("p10", self.p10),
            ("p25", self.p25),
            ("p50", self.p50),
            ("p75", self.p75),
            ("p90", self.p90),
            ("p95", self.p95),
            ("p99", self.p99),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct StatusCodeCount {
    pub code: u16,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct ThroughputPoint {
    pub time_secs: f64,
    pub requests_completed: u32,
    pub rps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct LatencyPoint {
    pub request_num: u32,
    pub latency_ms: f64,
    pub timestamp_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct ConcurrencyPoint {
    pub time_secs: f64,
    pub concurrent_requests: u32,
}

/// When a request started, relative to the run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct TimelinePoint {
    pub time_secs: f64,
    pub request_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub timestamp_ms: f64,
    pub status: u16,
    pub error: String,
    #[serde(rename = "error_type")]
    pub error_kind: ErrorKind,
    pub duration_ms: f64,
}

/// Terminal payload of a completed run, produced once by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunResult {
    pub total_requests: u32,
    pub successful_requests: u32,
    pub failed_requests: u32,
    pub total_time_secs: f64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub requests_per_second: f64,
    #[serde(default)]
    pub histogram: Vec<HistogramBucket>,
    #[serde(default)]
    pub percentiles: LatencyPercentiles,
    #[serde(default)]
    pub status_codes: Vec<StatusCodeCount>,
    /// Per-request outcomes. Can hold tens of thousands of entries.
    #[serde(default)]
    pub results: Vec<RequestOutcome>,
    #[serde(default)]
    pub throughput_over_time: Vec<ThroughputPoint>,
    #[serde(default)]
    pub latency_over_time: Vec<LatencyPoint>,
    #[serde(default)]
    pub error_logs: Vec<ErrorLogEntry>,
    #[serde(default)]
    pub concurrency_over_time: Vec<ConcurrencyPoint>,
    #[serde(default)]
    pub request_timeline: Vec<TimelinePoint>,
}

impl RunResult {
    /// Copy suitable for long-term storage: per-request outcomes are dropped,
    /// aggregates, time series and the error log are kept verbatim.
    pub fn compacted(&self) -> RunResult {
        RunResult {
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            total_time_secs: self.total_time_secs,
            avg_response_time_ms: self.avg_response_time_ms,
            min_response_time_ms: self.min_response_time_ms,
            max_response_time_ms: self.max_response_time_ms,
            requests_per_second: self.requests_per_second,
            histogram: self.histogram.clone(),
            percentiles: self.percentiles.clone(),
            status_codes: self.status_codes.clone(),
            results: Vec::new(),
            throughput_over_time: self.throughput_over_time.clone(),
            latency_over_time: self.latency_over_time.clone(),
            error_logs: self.error_logs.clone(),
            concurrency_over_time: self.concurrency_over_time.clone(),
            request_timeline: self.request_timeline.clone(),
        }
    }

    /// Percentage of finished requests that succeeded, `None` when nothing finished.
    pub fn success_rate(&self) -> Option<f64> {
        success_rate(self.successful_requests, self.failed_requests)
    }

    pub fn has_errors(&self) -> bool {
        !self.error_logs.is_empty()
    }
}

pub(crate) fn success_rate(successful: u32, failed: u32) -> Option<f64> {
    let total = successful as u64 + failed as u64;
    if total == 0 {
        return None;
    }
    Some(successful as f64 / total as f64 * 100.0)
}
