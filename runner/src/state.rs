use chrono::{DateTime, Utc};
use derive_more::derive::Display;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use zoyla_report::progress::ProgressSnapshot;
use zoyla_report::result::RunResult;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    #[display("idle")]
    Idle,
    #[display("running")]
    Running,
    #[display("completed")]
    Completed,
    #[display("cancelled")]
    Cancelled,
    #[display("errored")]
    Errored,
}

impl RunPhase {
    /// A new run may start from every phase except `Running`.
    pub fn can_start(&self) -> bool {
        !matches!(self, RunPhase::Running)
    }
}

/// Identifies one accepted run, increasing with every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("#{_0}")]
pub struct RunId(u64);

impl RunId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Everything observers need to render the current run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSnapshot {
    pub phase: RunPhase,
    /// The latest accepted run, kept after it settles.
    pub run: Option<RunId>,
    /// Only set while running.
    pub progress: Option<ProgressSnapshot>,
    /// Only set once completed.
    pub result: Option<Arc<RunResult>>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Single source of truth for whether a run is active.
///
/// Backed by a watch channel so any number of observers can follow
/// transitions. Every transition out of `Running` clears the progress
/// snapshot, entering `Running` clears progress, result and error together.
/// Run scoped updates name their [`RunId`] and are ignored once that run is
/// no longer the active one.
#[derive(Debug)]
pub struct RunStateMachine {
    state: watch::Sender<RunSnapshot>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RunSnapshot::default());
        Self { state }
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> RunPhase {
        self.state.borrow().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == RunPhase::Running
    }

    /// Atomically enters `Running` unless a run is already active and
    /// returns the id of the new run.
    pub fn try_begin(&self, started_at: DateTime<Utc>) -> Option<RunId> {
        let mut started = None;
        self.state.send_if_modified(|state| {
            if !state.phase.can_start() {
                debug!("Run already in progress, ignoring start.");
                return false;
            }
            let run = state.run.map_or(RunId(1), RunId::next);
            *state = RunSnapshot {
                phase: RunPhase::Running,
                run: Some(run),
                progress: None,
                result: None,
                error: None,
                started_at: Some(started_at),
            };
            started = Some(run);
            true
        });
        started
    }

    /// Whether `run` is the one currently running.
    pub fn is_active(&self, run: RunId) -> bool {
        let state = self.state.borrow();
        state.phase == RunPhase::Running && state.run == Some(run)
    }

    pub fn set_progress(&self, run: RunId, progress: ProgressSnapshot) -> bool {
        self.state.send_if_modified(|state| {
            if state.phase != RunPhase::Running || state.run != Some(run) {
                return false;
            }
            state.progress = Some(progress);
            true
        })
    }

    pub fn complete(&self, run: RunId, result: Arc<RunResult>) -> bool {
        self.finish(run, RunPhase::Completed, |state| {
            state.result = Some(result);
        })
    }

    pub fn cancel(&self, run: RunId) -> bool {
        self.finish(run, RunPhase::Cancelled, |_| {})
    }

    pub fn fail(&self, run: RunId, message: impl Into<String>) -> bool {
        let message = message.into();
        self.finish(run, RunPhase::Errored, |state| {
            state.error = Some(message);
        })
    }

    /// Shows an error without a run, e.g. a rejected configuration.
    /// Ignored while a run is active.
    pub fn report_error(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.state.send_if_modified(|state| {
            if state.phase == RunPhase::Running {
                return false;
            }
            state.error = Some(message);
            true
        })
    }

    /// Back to `Idle` with nothing displayed. Ignored while a run is active.
    /// Run ids keep increasing across clears.
    pub fn clear(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.phase == RunPhase::Running {
                return false;
            }
            *state = RunSnapshot {
                run: state.run,
                ..RunSnapshot::default()
            };
            true
        })
    }

    /// Only the first terminal transition of the active run takes effect.
    fn finish(&self, run: RunId, phase: RunPhase, apply: impl FnOnce(&mut RunSnapshot)) -> bool {
        self.state.send_if_modified(|state| {
            if state.phase != RunPhase::Running || state.run != Some(run) {
                debug!("Run {run} is not active, ignoring transition to {phase}.");
                return false;
            }
            state.phase = phase;
            state.progress = None;
            apply(state);
            true
        })
    }
}
