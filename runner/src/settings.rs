use crate::storage::{KeyValueStore, LAYOUT_SETTINGS_KEY, THEME_KEY};
use clap::ValueEnum;
use derive_more::derive::Display;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Which result panels are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    pub show_throughput_chart: bool,
    pub show_latency_chart: bool,
    pub show_histogram: bool,
    pub show_percentiles: bool,
    pub show_correlation_chart: bool,
    pub show_error_logs: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            show_throughput_chart: true,
            show_latency_chart: true,
            show_histogram: true,
            show_percentiles: true,
            show_correlation_chart: true,
            show_error_logs: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, ValueEnum)]
pub enum Panel {
    #[display("throughput chart")]
    Throughput,
    #[display("latency chart")]
    Latency,
    #[display("histogram")]
    Histogram,
    #[display("percentiles")]
    Percentiles,
    #[display("correlation chart")]
    Correlation,
    #[display("error logs")]
    ErrorLogs,
}

impl LayoutSettings {
    pub fn with_panel(mut self, panel: Panel, visible: bool) -> Self {
        let flag = match panel {
            Panel::Throughput => &mut self.show_throughput_chart,
            Panel::Latency => &mut self.show_latency_chart,
            Panel::Histogram => &mut self.show_histogram,
            Panel::Percentiles => &mut self.show_percentiles,
            Panel::Correlation => &mut self.show_correlation_chart,
            Panel::ErrorLogs => &mut self.show_error_logs,
        };
        *flag = visible;
        self
    }

    pub fn panels(&self) -> [(Panel, bool); 6] {
        [
            (Panel::Throughput, self.show_throughput_chart),
            (Panel::Latency, self.show_latency_chart),
            (Panel::Histogram, self.show_histogram),
            (Panel::Percentiles, self.show_percentiles),
            (Panel::Correlation, self.show_correlation_chart),
            (Panel::ErrorLogs, self.show_error_logs),
        ]
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    #[display("dark")]
    Dark,
    #[display("light")]
    Light,
}

impl ThemeMode {
    pub fn is_dark(&self) -> bool {
        matches!(self, ThemeMode::Dark)
    }
}

/// Layout and theme preferences, stored next to the history.
/// Reads fall back to defaults and writes never fail the caller.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn layout(&self) -> LayoutSettings {
        self.load_or_default(LAYOUT_SETTINGS_KEY).await
    }

    pub async fn save_layout(&self, layout: LayoutSettings) {
        self.save(LAYOUT_SETTINGS_KEY, &layout).await;
    }

    pub async fn theme(&self) -> ThemeMode {
        self.load_or_default(THEME_KEY).await
    }

    pub async fn save_theme(&self, theme: ThemeMode) {
        self.save(THEME_KEY, &theme).await;
    }

    async fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.load(key).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|error| {
                warn!("Ignoring unreadable {key}: {error}");
                T::default()
            }),
            Ok(None) => T::default(),
            Err(error) => {
                warn!("Cannot load {key}: {error}");
                T::default()
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(error) => {
                warn!("Cannot serialize {key}: {error}");
                return;
            }
        };
        if let Err(error) = self.store.save(key, value).await {
            warn!("Cannot save {key}: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn should_default_when_nothing_is_stored() {
        let preferences = Preferences::new(Arc::new(MemoryStore::new()));
        assert_eq!(preferences.layout().await, LayoutSettings::default());
        assert_eq!(preferences.theme().await, ThemeMode::Dark);
    }

    #[tokio::test]
    async fn should_persist_in_camel_case_under_shared_keys() {
        let store = Arc::new(MemoryStore::new());
        let preferences = Preferences::new(store.clone());

        preferences
            .save_layout(LayoutSettings::default().with_panel(Panel::Histogram, false))
            .await;
        preferences.save_theme(ThemeMode::Light).await;

        let layout = store.load(LAYOUT_SETTINGS_KEY).await.unwrap().unwrap();
        assert_eq!(layout["showHistogram"], json!(false));
        assert_eq!(layout["showErrorLogs"], json!(true));
        assert_eq!(store.load(THEME_KEY).await.unwrap(), Some(json!("light")));
        assert_eq!(preferences.theme().await, ThemeMode::Light);
    }

    #[tokio::test]
    async fn should_fall_back_to_defaults_on_failures() {
        let store = Arc::new(MemoryStore::new());
        store.save(THEME_KEY, json!("sepia")).await.unwrap();
        let preferences = Preferences::new(store.clone());
        assert_eq!(preferences.theme().await, ThemeMode::Dark);

        store.set_failing(true);
        preferences.save_theme(ThemeMode::Light).await;
        assert_eq!(preferences.layout().await, LayoutSettings::default());
    }
}
