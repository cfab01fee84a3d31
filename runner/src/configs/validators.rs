use crate::configs::runner::RunnerConfig;
use crate::error::{RunnerError, ValidationError};
use crate::validatable::Validatable;
use tracing::error;
use url::Url;
use zoyla_report::config::TestConfig;

pub const MIN_REQUESTS: u32 = 1;
pub const MAX_REQUESTS: u32 = 100_000;
pub const MIN_CONCURRENCY: u32 = 1;
pub const MAX_CONCURRENCY: u32 = 1_000;

impl Validatable<RunnerError> for RunnerConfig {
    fn validate(&self) -> Result<(), RunnerError> {
        if self.progress.update_interval.is_zero() {
            error!("Progress update interval cannot be zero.");
            return Err(RunnerError::InvalidConfiguration(
                "progress.update_interval must be greater than zero".to_owned(),
            ));
        }

        if self.history.max_entries == 0 {
            error!("History must retain at least one entry.");
            return Err(RunnerError::InvalidConfiguration(
                "history.max_entries must be at least 1".to_owned(),
            ));
        }

        if self.charts.max_points < 2 {
            error!("Charts need at least two points.");
            return Err(RunnerError::InvalidConfiguration(
                "charts.max_points must be at least 2".to_owned(),
            ));
        }

        Ok(())
    }
}

impl Validatable<ValidationError> for TestConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        let raw_url = self.url.trim();
        if raw_url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let url = Url::parse(raw_url)
            .map_err(|error| ValidationError::InvalidUrl(raw_url.to_owned(), error.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(url.scheme().to_owned()));
        }
        if url.host().is_none() {
            return Err(ValidationError::InvalidUrl(
                raw_url.to_owned(),
                "missing host".to_owned(),
            ));
        }

        if !(MIN_REQUESTS..=MAX_REQUESTS).contains(&self.num_requests) {
            return Err(ValidationError::RequestCountOutOfRange {
                value: self.num_requests,
                min: MIN_REQUESTS,
                max: MAX_REQUESTS,
            });
        }

        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ValidationError::ConcurrencyOutOfRange {
                value: self.concurrency,
                min: MIN_CONCURRENCY,
                max: MAX_CONCURRENCY,
            });
        }

        Ok(())
    }
}
