use crate::types::history_entry::HistoryEntry;
use crate::types::progress::ProgressSnapshot;
use crate::types::result::RunResult;
use colored::{Color, ColoredString, Colorize};
use human_repr::{HumanCount, HumanDuration};
use tracing::info;

impl HistoryEntry {
    pub fn print_summary(&self) {
        let config = &self.config;
        let params_print = format!(
            "Run {}: {} {}, {} requests, concurrency {}, {}{}",
            self.id,
            config.method,
            config.url,
            config.num_requests.human_count_bare(),
            config.concurrency,
            if config.use_http2 { "HTTP/2" } else { "HTTP/1.1" },
            if config.disable_keep_alive {
                ", keep-alive off"
            } else {
                ""
            },
        )
        .blue();

        info!("{}", params_print);
        info!("{}\n", self.result.formatted_string());
    }

    /// Single line used by history listings.
    pub fn list_row(&self) -> String {
        let rate = self
            .success_rate()
            .map(|rate| format!("{rate:.1}%"))
            .unwrap_or_else(|| "-".to_owned());
        format!(
            "{}  {}  {:<7} {}  {:.1} req/s  {} ok  {} failed  ({} success, {})",
            self.id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.config.method.to_string(),
            self.config.url,
            self.requests_per_second,
            self.successful_requests.human_count_bare(),
            self.failed_requests.human_count_bare(),
            rate,
            self.total_time_secs.human_duration(),
        )
    }
}

impl RunResult {
    pub fn formatted_string(&self) -> ColoredString {
        let color = if self.failed_requests == 0 {
            Color::Green
        } else if self.successful_requests == 0 {
            Color::Red
        } else {
            Color::Yellow
        };

        let percentiles = self
            .percentiles
            .labeled()
            .iter()
            .map(|(label, value)| format!("{label}: {value:.2} ms"))
            .collect::<Vec<_>>()
            .join(", ");
        let status_codes = self
            .status_codes
            .iter()
            .map(|status| format!("{}×{}", status.code, status.count))
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "Results: {} requests in {} ({:.2} req/s), {} successful, {} failed, \
            average latency: {:.2} ms, min: {:.2} ms, max: {:.2} ms, {}, status codes: {}, \
            {} logged errors",
            self.total_requests.human_count_bare(),
            self.total_time_secs.human_duration(),
            self.requests_per_second,
            self.successful_requests,
            self.failed_requests,
            self.avg_response_time_ms,
            self.min_response_time_ms,
            self.max_response_time_ms,
            percentiles,
            status_codes,
            self.error_logs.len(),
        )
        .color(color)
    }
}

impl ProgressSnapshot {
    pub fn formatted_string(&self) -> String {
        format!(
            "{}/{} ({:.0}%), {} ok, {} failed, {:.1} req/s, last latency {:.2} ms, elapsed {:.1} s",
            self.completed,
            self.total,
            self.percent(),
            self.successful,
            self.failed,
            self.current_rps,
            self.latest_response_time_ms,
            self.elapsed_secs,
        )
    }
}
