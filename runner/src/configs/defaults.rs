use crate::configs::runner::{
    ChartsConfig, EngineConfig, HistoryConfig, LoggingConfig, ProgressConfig, RunnerConfig,
};
use std::path::PathBuf;
use std::time::Duration;
use zoyla_report::downsample::MAX_CHART_POINTS;

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_HISTORY_ENTRIES: usize = 50;
pub const DEFAULT_LOG_LEVEL: &str = "info";
const STORAGE_DIRECTORY: &str = "zoyla";
const STORAGE_FILE_NAME: &str = "settings.json";

impl Default for RunnerConfig {
    fn default() -> RunnerConfig {
        RunnerConfig {
            progress: ProgressConfig::default(),
            history: HistoryConfig::default(),
            charts: ChartsConfig::default(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> ProgressConfig {
        ProgressConfig {
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> HistoryConfig {
        let storage_path = dirs::data_dir()
            .map(|dir| dir.join(STORAGE_DIRECTORY).join(STORAGE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(STORAGE_FILE_NAME));
        HistoryConfig {
            max_entries: DEFAULT_MAX_HISTORY_ENTRIES,
            storage_path,
        }
    }
}

impl Default for ChartsConfig {
    fn default() -> ChartsConfig {
        ChartsConfig {
            max_points: MAX_CHART_POINTS,
            dark: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> LoggingConfig {
        LoggingConfig {
            level: DEFAULT_LOG_LEVEL.to_owned(),
            directory: None,
        }
    }
}
