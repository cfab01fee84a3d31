use crate::advisor::{self, ConcurrencyFactors, ConcurrencyRecommendation};
use crate::coalescer::{Admission, ProgressCoalescer};
use crate::engine::{EngineError, EngineEvent, LoadTestEngine};
use crate::history::HistoryLedger;
use crate::state::{RunId, RunPhase, RunStateMachine};
use crate::validatable::Validatable;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};
use zoyla_report::config::TestConfig;
use zoyla_report::hardware::HostHardware;
use zoyla_report::result::RunResult;

/// Used when neither the host nor the engine report a core count.
pub const DEFAULT_CPU_CORES: usize = 4;

/// How a call to [`TestRunOrchestrator::start`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The configuration failed validation, the engine was not called.
    Rejected(String),
    /// Another run is active, nothing changed.
    AlreadyRunning,
    Completed(Arc<RunResult>),
    Cancelled,
    Failed(String),
}

struct Listener {
    handle: JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

/// Composition root of a test run.
///
/// Owns the engine, the run state machine and the history ledger and keeps
/// the cross-cutting rules in one place: at most one active run, progress is
/// rate limited through the coalescer, only completed runs reach history.
/// The engine event stream is subscribed once, for the orchestrator's
/// lifetime.
pub struct TestRunOrchestrator {
    engine: Arc<dyn LoadTestEngine>,
    state: Arc<RunStateMachine>,
    history: Arc<HistoryLedger>,
    coalescer: Arc<Mutex<ProgressCoalescer>>,
    error_panel: watch::Sender<bool>,
    cpu_cores: OnceCell<usize>,
    listener: Mutex<Option<Listener>>,
}

impl TestRunOrchestrator {
    /// Must be called from within a tokio runtime.
    pub fn new(
        engine: Arc<dyn LoadTestEngine>,
        history: Arc<HistoryLedger>,
        update_interval: Duration,
    ) -> Self {
        let state = Arc::new(RunStateMachine::new());
        let coalescer = Arc::new(Mutex::new(ProgressCoalescer::new(update_interval)));
        let (shutdown, shutdown_receiver) = oneshot::channel();
        let handle = tokio::spawn(listen(
            engine.subscribe(),
            state.clone(),
            coalescer.clone(),
            shutdown_receiver,
        ));
        let (error_panel, _) = watch::channel(false);

        Self {
            engine,
            state,
            history,
            coalescer,
            error_panel,
            cpu_cores: OnceCell::new(),
            listener: Mutex::new(Some(Listener { handle, shutdown })),
        }
    }

    /// Skips hardware detection for concurrency recommendations.
    pub fn with_cpu_cores(mut self, cpu_cores: usize) -> Self {
        self.cpu_cores = OnceCell::new_with(Some(cpu_cores));
        self
    }

    pub fn state(&self) -> &Arc<RunStateMachine> {
        &self.state
    }

    pub fn history(&self) -> &Arc<HistoryLedger> {
        &self.history
    }

    /// Flips to `true` when a completed run logged request errors.
    pub fn subscribe_error_panel(&self) -> watch::Receiver<bool> {
        self.error_panel.subscribe()
    }

    pub fn dismiss_error_panel(&self) {
        self.error_panel.send_replace(false);
    }

    /// Validates `config`, runs it to completion and records the outcome.
    pub async fn start(&self, config: &TestConfig) -> RunOutcome {
        if let Err(error) = config.validate() {
            let message = error.to_string();
            warn!("Rejected test configuration: {message}");
            self.state.report_error(message.clone());
            return RunOutcome::Rejected(message);
        }

        let Some(run) = self.state.try_begin(Utc::now()) else {
            debug!("Start requested while a run is active, ignoring.");
            return RunOutcome::AlreadyRunning;
        };

        let config = config.normalized();
        self.history.select(None);
        lock(&self.coalescer).reset();
        info!(
            "Starting load test {run}: {} {}, {} requests, concurrency {}",
            config.method, config.url, config.num_requests, config.concurrency
        );

        let outcome = self.engine.execute_run(run, &config).await;
        lock(&self.coalescer).reset();

        match outcome {
            Ok(result) => {
                let result = Arc::new(result);
                if !self.state.complete(run, result.clone()) {
                    debug!("Run {run} already settled, discarding engine result.");
                    return self.settled_outcome(run);
                }
                self.history.record(&result, &config).await;
                if result.has_errors() {
                    self.error_panel.send_replace(true);
                }
                info!(
                    "Load test completed: {} requests, {} failed, {:.2} req/s",
                    result.total_requests, result.failed_requests, result.requests_per_second
                );
                RunOutcome::Completed(result)
            }
            Err(EngineError::Cancelled) => {
                if self.state.cancel(run) {
                    info!("Load test {run} cancelled.");
                }
                self.settled_outcome(run)
            }
            Err(engine_error) => {
                let message = engine_error.to_string();
                if self.state.fail(run, message.clone()) {
                    error!("Load test {run} failed: {message}");
                }
                self.settled_outcome(run)
            }
        }
    }

    /// Asks the engine to stop. The acknowledgement drives the state change,
    /// delivery failures are ignored since the run may be over already.
    pub async fn cancel(&self) {
        if let Err(error) = self.engine.request_cancel().await {
            debug!("Cancel request not delivered: {error}");
        }
    }

    pub async fn recommendation(&self, config: &TestConfig) -> ConcurrencyRecommendation {
        let cpu_cores = *self
            .cpu_cores
            .get_or_init(|| async {
                let detected = tokio::task::spawn_blocking(|| HostHardware::detect().cpu_cores)
                    .await
                    .unwrap_or_default();
                resolve_cpu_cores(detected, self.engine.as_ref()).await
            })
            .await;

        advisor::recommend(&ConcurrencyFactors {
            cpu_cores,
            use_http2: config.use_http2,
            disable_keep_alive: config.disable_keep_alive,
            url: config.url.clone(),
            past_success_rate: self.history.past_success_rate(&config.url),
        })
    }

    /// Stops listening to engine events and drops any pending progress.
    pub async fn shutdown(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            let _ = listener.shutdown.send(());
            if let Err(error) = listener.handle.await {
                warn!("Engine event listener ended abnormally: {error}");
            }
        }
        lock(&self.coalescer).reset();
    }

    fn settled_outcome(&self, run: RunId) -> RunOutcome {
        let snapshot = self.state.snapshot();
        if snapshot.run != Some(run) {
            // A newer run started after the listener acknowledged a cancel
            // for this one.
            return RunOutcome::Cancelled;
        }
        match snapshot.phase {
            RunPhase::Completed => match snapshot.result {
                Some(result) => RunOutcome::Completed(result),
                None => RunOutcome::Failed("Run completed without a result".to_owned()),
            },
            RunPhase::Cancelled => RunOutcome::Cancelled,
            RunPhase::Errored => RunOutcome::Failed(snapshot.error.unwrap_or_default()),
            phase => RunOutcome::Failed(format!("Run ended in unexpected phase {phase}")),
        }
    }
}

impl Drop for TestRunOrchestrator {
    fn drop(&mut self) {
        if let Some(listener) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            listener.handle.abort();
        }
    }
}

/// Host core count, then the engine's view, then [`DEFAULT_CPU_CORES`].
pub async fn resolve_cpu_cores(detected: usize, engine: &dyn LoadTestEngine) -> usize {
    if detected > 0 {
        return detected;
    }
    match engine.available_parallelism().await {
        Ok(cores) if cores > 0 => cores,
        Ok(_) => DEFAULT_CPU_CORES,
        Err(error) => {
            debug!("Engine cannot report parallelism: {error}");
            DEFAULT_CPU_CORES
        }
    }
}

async fn listen(
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    state: Arc<RunStateMachine>,
    coalescer: Arc<Mutex<ProgressCoalescer>>,
    mut shutdown: oneshot::Receiver<()>,
) {
    // Run that owns the snapshot pending in the coalescer.
    let mut pending_run = None;
    loop {
        let deadline = lock(&coalescer).deadline();
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(event) if !state.is_active(event.run()) => {
                    debug!("Dropping engine event of inactive run {}.", event.run());
                }
                Some(EngineEvent::Progress(run, snapshot)) => {
                    let admission = lock(&coalescer).offer(snapshot, Instant::now());
                    match admission {
                        Admission::Deliver(snapshot) => {
                            state.set_progress(run, snapshot);
                        }
                        Admission::Deferred { .. } | Admission::Coalesced => {
                            pending_run = Some(run);
                        }
                        Admission::Dropped => {}
                    }
                }
                Some(EngineEvent::Cancelled(run)) => {
                    lock(&coalescer).reset();
                    if state.cancel(run) {
                        info!("Load test {run} cancelled.");
                    }
                }
                None => {
                    debug!("Engine event stream closed.");
                    break;
                }
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                let fired = lock(&coalescer).fire(Instant::now());
                if let (Some(snapshot), Some(run)) = (fired, pending_run) {
                    state.set_progress(run, snapshot);
                }
            }
        }
    }
    lock(&coalescer).reset();
    debug!("Engine event listener stopped.");
}

fn lock(coalescer: &Mutex<ProgressCoalescer>) -> MutexGuard<'_, ProgressCoalescer> {
    coalescer.lock().unwrap_or_else(PoisonError::into_inner)
}
