use crate::configs::runner::{
    ChartsConfig, EngineConfig, HistoryConfig, LoggingConfig, ProgressConfig, RunnerConfig,
};
use std::fmt::{Display, Formatter};

impl Display for RunnerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ progress: {}, history: {}, charts: {}, engine: {}, logging: {} }}",
            self.progress, self.history, self.charts, self.engine, self.logging
        )
    }
}

impl Display for ProgressConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ update_interval: {:?} }}", self.update_interval)
    }
}

impl Display for HistoryConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ max_entries: {}, storage_path: {} }}",
            self.max_entries,
            self.storage_path.display()
        )
    }
}

impl Display for ChartsConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ max_points: {}, dark: {} }}",
            self.max_points, self.dark
        )
    }
}

impl Display for EngineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let executable = self
            .executable
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "none".to_owned());
        write!(
            f,
            "{{ executable: {}, args: {:?} }}",
            executable, self.args
        )
    }
}

impl Display for LoggingConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let directory = self
            .directory
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "none".to_owned());
        write!(f, "{{ level: {}, directory: {} }}", self.level, directory)
    }
}
