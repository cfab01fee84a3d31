#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use zoyla_report::config::TestConfig;
use zoyla_report::progress::ProgressSnapshot;
use zoyla_report::result::{ErrorKind, ErrorLogEntry, RunResult};
use zoyla_runner::engine::{EngineError, EngineEvent, EventBroadcaster, LoadTestEngine};
use zoyla_runner::history::HistoryLedger;
use zoyla_runner::orchestrator::TestRunOrchestrator;
use zoyla_runner::state::{RunId, RunPhase, RunSnapshot};
use zoyla_runner::storage::MemoryStore;

pub const UPDATE_INTERVAL: Duration = Duration::from_millis(200);

/// What the fake engine does for one `execute_run` call.
pub enum Step {
    Complete {
        progress: Vec<ProgressSnapshot>,
        spacing: Duration,
        result: RunResult,
    },
    Fail(String),
    /// Resolves with whatever is sent through the channel.
    Hold(oneshot::Receiver<Result<RunResult, EngineError>>),
    /// Runs until `request_cancel`, then acknowledges.
    UntilCancelled,
    /// Emits `progress` and a cancel acknowledgement, then resolves as
    /// cancelled without yielding.
    AcknowledgeCancel { progress: ProgressSnapshot },
}

#[derive(Default)]
pub struct ScriptedEngine {
    events: EventBroadcaster,
    steps: Mutex<VecDeque<Step>>,
    cancel_signal: Notify,
    current_run: Mutex<Option<RunId>>,
    received: Mutex<Vec<TestConfig>>,
    pub executions: AtomicUsize,
    pub cancel_requests: AtomicUsize,
    reject_cancel: bool,
    parallelism: Option<usize>,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub fn rejecting_cancel(mut self) -> Self {
        self.reject_cancel = true;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = Some(parallelism);
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Configs passed to `execute_run`, oldest first.
    pub fn received(&self) -> Vec<TestConfig> {
        self.received.lock().unwrap().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// Emits progress on behalf of the run currently executing.
    pub fn emit_progress(&self, snapshot: ProgressSnapshot) {
        let run = self.current_run.lock().unwrap().unwrap_or(RunId::new(0));
        self.events.emit(EngineEvent::Progress(run, snapshot));
    }
}

#[async_trait]
impl LoadTestEngine for ScriptedEngine {
    async fn execute_run(
        &self,
        run: RunId,
        config: &TestConfig,
    ) -> Result<RunResult, EngineError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(config.clone());
        *self.current_run.lock().unwrap() = Some(run);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Complete {
                progress,
                spacing,
                result,
            }) => {
                for (index, snapshot) in progress.into_iter().enumerate() {
                    if index > 0 {
                        tokio::time::sleep(spacing).await;
                    }
                    self.events.emit(EngineEvent::Progress(run, snapshot));
                }
                // Lets the listener drain events before the run settles.
                tokio::time::sleep(spacing).await;
                Ok(result)
            }
            Some(Step::Fail(message)) => Err(EngineError::Failed(message)),
            Some(Step::Hold(receiver)) => receiver
                .await
                .unwrap_or_else(|_| Err(EngineError::Failed("released".to_owned()))),
            Some(Step::UntilCancelled) => {
                self.cancel_signal.notified().await;
                self.events.emit(EngineEvent::Cancelled(run));
                Err(EngineError::Cancelled)
            }
            Some(Step::AcknowledgeCancel { progress }) => {
                self.events.emit(EngineEvent::Progress(run, progress));
                self.events.emit(EngineEvent::Cancelled(run));
                Err(EngineError::Cancelled)
            }
            None => Err(EngineError::Failed("no scripted step".to_owned())),
        }
    }

    async fn request_cancel(&self) -> Result<(), EngineError> {
        self.cancel_requests.fetch_add(1, Ordering::SeqCst);
        if self.reject_cancel {
            return Err(EngineError::NotRunning);
        }
        self.cancel_signal.notify_one();
        Ok(())
    }

    async fn available_parallelism(&self) -> Result<usize, EngineError> {
        self.parallelism.ok_or(EngineError::NotRunning)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        self.events.subscribe()
    }
}

pub struct Harness {
    pub engine: Arc<ScriptedEngine>,
    pub store: Arc<MemoryStore>,
    pub history: Arc<HistoryLedger>,
    pub orchestrator: Arc<TestRunOrchestrator>,
}

impl Harness {
    pub fn new(engine: ScriptedEngine) -> Self {
        let engine = Arc::new(engine);
        let store = Arc::new(MemoryStore::new());
        let history = Arc::new(HistoryLedger::new(store.clone(), 50));
        let orchestrator = Arc::new(
            TestRunOrchestrator::new(engine.clone(), history.clone(), UPDATE_INTERVAL)
                .with_cpu_cores(8),
        );
        Self {
            engine,
            store,
            history,
            orchestrator,
        }
    }

    pub async fn wait_for_phase(&self, phase: RunPhase) -> RunSnapshot {
        let mut receiver = self.orchestrator.state().subscribe();
        let snapshot = receiver
            .wait_for(|snapshot| snapshot.phase == phase)
            .await
            .unwrap()
            .clone();
        snapshot
    }
}

pub fn progress(completed: u32, total: u32) -> ProgressSnapshot {
    ProgressSnapshot::new(completed, total, completed, 0, 100.0, completed as f64 / 100.0, 5.0)
}

pub fn result(successful: u32, failed: u32) -> RunResult {
    RunResult {
        total_requests: successful + failed,
        successful_requests: successful,
        failed_requests: failed,
        total_time_secs: 1.0,
        requests_per_second: (successful + failed) as f64,
        ..RunResult::default()
    }
}

pub fn result_with_errors(failed: u32) -> RunResult {
    let mut result = result(10, failed);
    result.error_logs = (0..failed)
        .map(|index| ErrorLogEntry {
            timestamp_ms: index as f64,
            status: 503,
            error: "Service Unavailable".to_owned(),
            error_kind: ErrorKind::Response,
            duration_ms: 12.0,
        })
        .collect();
    result
}

pub fn config() -> TestConfig {
    TestConfig::for_url("https://example.com/health")
}
