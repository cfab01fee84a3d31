use crate::{plotting::chart_kind::ChartKind, types::history_entry::HistoryEntry};

/// Returns a title for a run chart
impl HistoryEntry {
    pub fn title(&self, kind: ChartKind) -> String {
        format!("{} - {} {}", kind, self.config.method, self.config.url)
    }
}
