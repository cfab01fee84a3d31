use crate::configs::runner::LoggingConfig;
use crate::error::RunnerError;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

const LOG_FILE_PREFIX: &str = "zoyla.log";

/// Keeps the non-blocking writers flushing until dropped.
pub struct Logging {
    _stderr_guard: WorkerGuard,
    file_guard: Option<WorkerGuard>,
}

impl Logging {
    pub fn init(config: &LoggingConfig) -> Result<Self, RunnerError> {
        let mut layers = vec![];

        let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(stderr_writer)
                .with_filter(env_filter(&config.level)?)
                .boxed(),
        );

        let file_guard = match &config.directory {
            Some(directory) => {
                let file_appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
                let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
                layers.push(
                    fmt::layer()
                        .with_ansi(false)
                        .with_writer(file_writer)
                        .with_filter(env_filter(&config.level)?)
                        .boxed(),
                );
                Some(file_guard)
            }
            None => None,
        };

        Registry::default()
            .with(layers)
            .try_init()
            .map_err(|error| RunnerError::LoggingInitFailure(error.to_string()))?;

        Ok(Self {
            _stderr_guard: stderr_guard,
            file_guard,
        })
    }

    pub fn has_file_output(&self) -> bool {
        self.file_guard.is_some()
    }
}

/// `RUST_LOG` wins over the configured level.
fn env_filter(level: &str) -> Result<EnvFilter, RunnerError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|error| RunnerError::LoggingInitFailure(error.to_string())),
    }
}
