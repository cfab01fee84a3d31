use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Suggested in-flight requests per CPU core before multipliers.
pub const BASE_PER_CORE: usize = 15;
/// Upper bound of in-flight requests per CPU core.
pub const MAX_PER_CORE: usize = 50;
/// Ceiling for public targets, DNS and connection churn limit them first.
pub const EXTERNAL_RECOMMENDED_MAX: usize = 200;
pub const LOCAL_RECOMMENDED_MAX: usize = 1000;
/// Past success rates below this percentage reduce the suggestion.
pub const HISTORY_SUCCESS_THRESHOLD: f64 = 90.0;
const MIN_SUGGESTED: usize = 10;

const HTTP2_MULTIPLIER: f64 = 2.0;
const KEEP_ALIVE_ON_MULTIPLIER: f64 = 1.5;
const KEEP_ALIVE_OFF_MULTIPLIER: f64 = 0.5;
const LOCAL_MULTIPLIER: f64 = 2.0;
const HISTORY_MULTIPLIER: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrencyFactors {
    pub cpu_cores: usize,
    pub use_http2: bool,
    pub disable_keep_alive: bool,
    pub url: String,
    /// Percentage in `0..=100` taken from the latest run against the same URL.
    pub past_success_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFactors {
    pub base: usize,
    pub http2_multiplier: f64,
    pub keep_alive_multiplier: f64,
    pub local_multiplier: f64,
    pub history_adjustment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcurrencyRecommendation {
    pub suggested: usize,
    pub max: usize,
    pub local_target: bool,
    pub factors: AppliedFactors,
    pub warnings: Vec<String>,
    /// Human readable steps in the order they were applied.
    pub breakdown: Vec<String>,
}

/// Computes a concurrency suggestion from host and target characteristics.
///
/// Deterministic: identical factors always yield an identical recommendation,
/// breakdown strings included. A core count of zero is treated as one.
pub fn recommend(factors: &ConcurrencyFactors) -> ConcurrencyRecommendation {
    let cpu_cores = factors.cpu_cores.max(1);
    let mut warnings = Vec::new();
    let mut breakdown = Vec::new();

    let base = cpu_cores * BASE_PER_CORE;
    breakdown.push(format!(
        "Base: {cpu_cores} cores × {BASE_PER_CORE} = {base}"
    ));
    let mut suggested = base as f64;

    let http2_multiplier = if factors.use_http2 {
        HTTP2_MULTIPLIER
    } else {
        1.0
    };
    if factors.use_http2 {
        suggested *= http2_multiplier;
        breakdown.push("HTTP/2: ×2.0 (multiplexed connections)".to_owned());
    }

    let keep_alive_multiplier = if factors.disable_keep_alive {
        breakdown.push("Keep-alive OFF: ×0.5 (new connection per request)".to_owned());
        KEEP_ALIVE_OFF_MULTIPLIER
    } else {
        breakdown.push("Keep-alive ON: ×1.5 (connection reuse)".to_owned());
        KEEP_ALIVE_ON_MULTIPLIER
    };
    suggested *= keep_alive_multiplier;

    let local_target = is_local_target(&factors.url);
    let local_multiplier = if local_target { LOCAL_MULTIPLIER } else { 1.0 };
    if local_target {
        suggested *= local_multiplier;
        breakdown.push("Local target: ×2.0 (minimal latency)".to_owned());
    }

    let mut history_adjustment = 1.0;
    if let Some(rate) = factors
        .past_success_rate
        .filter(|rate| *rate < HISTORY_SUCCESS_THRESHOLD)
    {
        history_adjustment = HISTORY_MULTIPLIER;
        suggested *= history_adjustment;
        breakdown.push(format!("Past success rate {rate:.0}%: ×0.75"));
        warnings.push(format!(
            "Previous tests had {:.0}% failure rate",
            100.0 - rate
        ));
    }

    let ceiling = if local_target {
        LOCAL_RECOMMENDED_MAX
    } else {
        EXTERNAL_RECOMMENDED_MAX
    };
    let max = (cpu_cores * MAX_PER_CORE).min(ceiling);

    let rounded = ((suggested / 10.0).round() * 10.0) as usize;
    let suggested = rounded.min(max).max(MIN_SUGGESTED);

    breakdown.push(format!(
        "Recommended max: {max} ({} target)",
        if local_target { "local" } else { "external" }
    ));

    ConcurrencyRecommendation {
        suggested,
        max,
        local_target,
        factors: AppliedFactors {
            base,
            http2_multiplier,
            keep_alive_multiplier,
            local_multiplier,
            history_adjustment,
        },
        warnings,
        breakdown,
    }
}

/// Advisory messages for a concurrency value the user picked, following the
/// recommendation's own warnings.
pub fn warnings_for(current: u32, recommendation: &ConcurrencyRecommendation) -> Vec<String> {
    let current = current as usize;
    let mut warnings = recommendation.warnings.clone();

    if current > recommendation.max {
        warnings.push(format!(
            "Values above {} may cause DNS/connection errors - test incrementally",
            recommendation.max
        ));
    } else if current > recommendation.suggested * 2 {
        warnings.push(format!(
            "Higher than recommended ({}) - monitor for errors",
            recommendation.suggested
        ));
    }

    if current < MIN_SUGGESTED {
        warnings.push("Very low concurrency may result in slow test completion".to_owned());
    }

    warnings
}

/// Loopback, unspecified, private-network and `.local` hosts.
/// Anything that fails to parse counts as remote.
pub fn is_local_target(url: &str) -> bool {
    let Ok(url) = Url::parse(url.trim()) else {
        return false;
    };

    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".local")
        }
        Some(Host::Ipv4(address)) => is_local_ipv4(address),
        Some(Host::Ipv6(address)) => is_local_ipv6(address),
        None => false,
    }
}

fn is_local_ipv4(address: Ipv4Addr) -> bool {
    address.is_loopback() || address.is_unspecified() || address.is_private()
}

fn is_local_ipv6(address: Ipv6Addr) -> bool {
    address.is_loopback() || address.is_unspecified()
}
