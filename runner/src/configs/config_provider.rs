use crate::configs::runner::RunnerConfig;
use crate::error::RunnerError;
use crate::validatable::Validatable;
use async_trait::async_trait;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "zoyla.toml";
pub const ENV_PREFIX: &str = "ZOYLA_";
const ENV_SEPARATOR: &str = "__";

#[async_trait]
pub trait ConfigProvider {
    async fn load_config(&self) -> Result<RunnerConfig, RunnerError>;
}

/// Defaults, then the TOML file, then `ZOYLA_` environment variables.
#[derive(Debug)]
pub struct FileConfigProvider {
    path: Option<PathBuf>,
    use_env: bool,
}

impl FileConfigProvider {
    /// An explicit `path` must exist, the default path is optional.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            use_env: true,
        }
    }

    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    fn figment(&self) -> Result<Figment, RunnerError> {
        let mut figment = Figment::from(Serialized::defaults(RunnerConfig::default()));

        match &self.path {
            Some(path) => {
                if !path.is_file() {
                    return Err(RunnerError::CannotLoadConfiguration(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                info!("Loading config from path: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                info!("Loading config from path: {DEFAULT_CONFIG_PATH}");
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_PATH));
            }
            None => debug!("No config file found, using defaults."),
        }

        if self.use_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR));
        }

        Ok(figment)
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load_config(&self) -> Result<RunnerConfig, RunnerError> {
        let config: RunnerConfig = self
            .figment()?
            .extract()
            .map_err(|error| RunnerError::CannotLoadConfiguration(error.to_string()))?;
        config.validate()?;
        debug!("Loaded config: {config}");
        Ok(config)
    }
}
