use crate::types::history_entry::HistoryEntry;
use human_repr::HumanCount;

impl HistoryEntry {
    pub fn subtext(&self) -> String {
        format!("{}\n{}", self.format_params(), self.format_stats())
    }

    fn format_params(&self) -> String {
        let config = &self.config;
        let protocol = if config.use_http2 { "HTTP/2" } else { "HTTP/1.1" };
        let keep_alive = if config.disable_keep_alive {
            "keep-alive off"
        } else {
            "keep-alive on"
        };
        let rate_limit = if config.rate_limit > 0.0 {
            format!(", {:.0} req/s per worker limit", config.rate_limit)
        } else {
            String::new()
        };

        format!(
            "{} requests, concurrency {}, {protocol}, {keep_alive}{rate_limit}, recorded {}",
            config.num_requests.human_count_bare(),
            config.concurrency,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }

    fn format_stats(&self) -> String {
        let percentiles = &self.result.percentiles;
        format!(
            "Throughput: {:.2} req/s, Avg: {:.2} ms, p50: {:.2} ms, p90: {:.2} ms, p99: {:.2} ms, Failed: {}",
            self.requests_per_second,
            self.avg_response_ms,
            percentiles.p50,
            percentiles.p90,
            percentiles.p99,
            self.failed_requests.human_count_bare(),
        )
    }
}
