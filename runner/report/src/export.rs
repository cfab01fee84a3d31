use crate::types::config::{HttpMethod, TestConfig};
use crate::types::result::{
    ErrorLogEntry, HistogramBucket, LatencyPercentiles, LatencyPoint, RequestOutcome, RunResult,
    StatusCodeCount, ThroughputPoint,
};
use chrono::{DateTime, SecondsFormat, Utc};
use csv::{IntoInnerError, Terminator, WriterBuilder};
use serde::Serialize;
use std::fmt::Write;
use thiserror::Error;

const CSV_COLUMNS: [&str; 6] = [
    "request_num",
    "status",
    "duration_ms",
    "success",
    "timestamp_ms",
    "error",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV export failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedConfig<'a> {
    pub url: &'a str,
    pub method: HttpMethod,
    pub num_requests: u32,
    pub use_http2: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSummary {
    pub total_requests: u32,
    pub successful_requests: u32,
    pub failed_requests: u32,
    pub total_time_secs: f64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub requests_per_second: f64,
}

/// Self-contained JSON export of one run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument<'a> {
    pub exported_at: String,
    pub config: ExportedConfig<'a>,
    pub summary: ExportedSummary,
    pub percentiles: &'a LatencyPercentiles,
    pub status_codes: &'a [StatusCodeCount],
    pub histogram: &'a [HistogramBucket],
    pub throughput_over_time: &'a [ThroughputPoint],
    pub latency_over_time: &'a [LatencyPoint],
    pub error_logs: &'a [ErrorLogEntry],
    pub results: &'a [RequestOutcome],
}

impl<'a> ExportDocument<'a> {
    pub fn new(result: &'a RunResult, config: &'a TestConfig, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            config: ExportedConfig {
                url: &config.url,
                method: config.method,
                num_requests: config.num_requests,
                use_http2: config.use_http2,
            },
            summary: ExportedSummary {
                total_requests: result.total_requests,
                successful_requests: result.successful_requests,
                failed_requests: result.failed_requests,
                total_time_secs: result.total_time_secs,
                avg_response_time_ms: result.avg_response_time_ms,
                min_response_time_ms: result.min_response_time_ms,
                max_response_time_ms: result.max_response_time_ms,
                requests_per_second: result.requests_per_second,
            },
            percentiles: &result.percentiles,
            status_codes: &result.status_codes,
            histogram: &result.histogram,
            throughput_over_time: &result.throughput_over_time,
            latency_over_time: &result.latency_over_time,
            error_logs: &result.error_logs,
            results: &result.results,
        }
    }
}

pub fn to_json(
    result: &RunResult,
    config: &TestConfig,
    exported_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&ExportDocument::new(
        result,
        config,
        exported_at,
    ))?)
}

/// CSV with a `#`-prefixed summary header followed by one row per request.
pub fn to_csv(
    result: &RunResult,
    config: &TestConfig,
    exported_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    let mut csv = String::new();
    let _ = writeln!(csv, "# Zoyla Test Results");
    let _ = writeln!(
        csv,
        "# Exported: {}",
        exported_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    let _ = writeln!(csv, "# URL: {}", config.url);
    let _ = writeln!(csv, "# Method: {}", config.method);
    let _ = writeln!(csv, "# Total Requests: {}", result.total_requests);
    let _ = writeln!(csv, "# Successful: {}", result.successful_requests);
    let _ = writeln!(csv, "# Failed: {}", result.failed_requests);
    let _ = writeln!(csv, "# Total Time: {:.4}s", result.total_time_secs);
    let _ = writeln!(csv, "# Requests/sec: {:.2}", result.requests_per_second);
    let _ = writeln!(csv, "# Avg Response: {:.2}ms", result.avg_response_time_ms);
    let _ = writeln!(csv, "# Min Response: {:.2}ms", result.min_response_time_ms);
    let _ = writeln!(csv, "# Max Response: {:.2}ms", result.max_response_time_ms);
    csv.push('\n');

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for (index, outcome) in result.results.iter().enumerate() {
        writer.write_record([
            (index + 1).to_string(),
            outcome.status.to_string(),
            format!("{:.2}", outcome.duration_ms),
            outcome.success.to_string(),
            format!("{:.2}", outcome.timestamp_ms),
            outcome.error.clone().unwrap_or_default(),
        ])?;
    }
    let rows = writer.into_inner().map_err(IntoInnerError::into_error)?;
    csv.push_str(&String::from_utf8_lossy(&rows));

    Ok(csv)
}
