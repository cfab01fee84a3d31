use crate::storage::{KeyValueStore, HISTORY_KEY};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zoyla_report::config::TestConfig;
use zoyla_report::history_entry::HistoryEntry;
use zoyla_report::result::RunResult;

/// Observable state of the ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryView {
    /// Newest first.
    pub entries: Vec<HistoryEntry>,
    /// Entry currently loaded into the configuration and results view.
    pub selected: Option<Uuid>,
}

/// Bounded, newest-first record of past runs.
///
/// Every mutation is persisted through the [`KeyValueStore`]. Storage
/// failures are logged and otherwise ignored, the in-memory sequence stays
/// authoritative for the session.
pub struct HistoryLedger {
    store: Arc<dyn KeyValueStore>,
    max_entries: usize,
    view: watch::Sender<HistoryView>,
    write_lock: Mutex<()>,
}

impl HistoryLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, max_entries: usize) -> Self {
        let (view, _) = watch::channel(HistoryView::default());
        Self {
            store,
            max_entries: max_entries.max(1),
            view,
            write_lock: Mutex::new(()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn subscribe(&self) -> watch::Receiver<HistoryView> {
        self.view.subscribe()
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.view.borrow().entries.clone()
    }

    /// The most recently recorded entry.
    pub fn latest(&self) -> Option<HistoryEntry> {
        self.view.borrow().entries.first().cloned()
    }

    pub fn len(&self) -> usize {
        self.view.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: Uuid) -> Option<HistoryEntry> {
        self.view
            .borrow()
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }

    /// Accepts a full id or an unambiguous prefix of one.
    pub fn find(&self, id_or_prefix: &str) -> Option<HistoryEntry> {
        let needle = id_or_prefix.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }
        let view = self.view.borrow();
        let mut matches = view
            .entries
            .iter()
            .filter(|entry| entry.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry.clone()),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.view.borrow().selected
    }

    /// Success rate of the most recent run against `url`, in percent.
    pub fn past_success_rate(&self, url: &str) -> Option<f64> {
        let url = url.trim();
        self.view
            .borrow()
            .entries
            .iter()
            .find(|entry| entry.url() == url)
            .and_then(HistoryEntry::success_rate)
    }

    /// Replaces the in-memory sequence with the persisted one. Read or
    /// decode failures leave the ledger empty.
    pub async fn load_from_storage(&self) -> usize {
        let _guard = self.write_lock.lock().await;
        let mut entries = match self.store.load(HISTORY_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<Vec<HistoryEntry>>(value) {
                Ok(entries) => entries,
                Err(error) => {
                    warn!("Ignoring unreadable history: {error}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!("Cannot load history: {error}");
                Vec::new()
            }
        };
        entries.truncate(self.max_entries);
        let count = entries.len();

        self.view.send_modify(|view| {
            if view
                .selected
                .is_some_and(|id| !entries.iter().any(|entry| entry.id == id))
            {
                view.selected = None;
            }
            view.entries = entries;
        });
        info!("Loaded {count} history entries.");
        count
    }

    /// Prepends a compacted entry for `result` and evicts the oldest ones
    /// beyond the retained maximum.
    pub async fn record(&self, result: &RunResult, config: &TestConfig) -> HistoryEntry {
        let entry = HistoryEntry::new(result, config);
        let _guard = self.write_lock.lock().await;
        let mut evicted = 0;
        self.view.send_modify(|view| {
            view.entries.insert(0, entry.clone());
            if view.entries.len() > self.max_entries {
                evicted = view.entries.len() - self.max_entries;
                view.entries.truncate(self.max_entries);
            }
            if view
                .selected
                .is_some_and(|id| !view.entries.iter().any(|entry| entry.id == id))
            {
                view.selected = None;
            }
        });
        debug!(
            "Recorded history entry {} for {}, evicted {evicted}.",
            entry.id,
            entry.url()
        );
        self.persist().await;
        entry
    }

    pub async fn delete(&self, id: Uuid) -> bool {
        let _guard = self.write_lock.lock().await;
        let removed = self.view.send_if_modified(|view| {
            let before = view.entries.len();
            view.entries.retain(|entry| entry.id != id);
            if view.selected == Some(id) {
                view.selected = None;
            }
            view.entries.len() != before
        });
        if removed {
            self.persist().await;
        }
        removed
    }

    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.view.send_modify(|view| {
            view.entries.clear();
            view.selected = None;
        });
        self.persist().await;
    }

    /// Moves the selection cursor. Unknown ids are ignored.
    pub fn select(&self, id: Option<Uuid>) -> bool {
        self.view.send_if_modified(|view| match id {
            Some(id) if !view.entries.iter().any(|entry| entry.id == id) => false,
            _ if view.selected == id => false,
            _ => {
                view.selected = id;
                true
            }
        })
    }

    async fn persist(&self) {
        let value = {
            let view = self.view.borrow();
            serde_json::to_value(&view.entries)
        };
        let value = match value {
            Ok(value) => value,
            Err(error) => {
                warn!("Cannot serialize history: {error}");
                return;
            }
        };
        if let Err(error) = self.store.save(HISTORY_KEY, value).await {
            warn!("Cannot save history: {error}");
        }
    }
}
