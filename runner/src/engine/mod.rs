pub mod process;

use async_trait::async_trait;
use thiserror::Error;
use crate::state::RunId;
use tokio::sync::mpsc;
use zoyla_report::config::TestConfig;
use zoyla_report::progress::ProgressSnapshot;
use zoyla_report::result::RunResult;

/// Pushed by the engine while a run is in flight, tagged with the run that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Progress(RunId, ProgressSnapshot),
    /// A cancellation request took effect.
    Cancelled(RunId),
}

impl EngineEvent {
    pub fn run(&self) -> RunId {
        match self {
            EngineEvent::Progress(run, _) | EngineEvent::Cancelled(run) => *run,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Test cancelled by user")]
    Cancelled,
    #[error("No test is running")]
    NotRunning,
    #[error("{0}")]
    Failed(String),
    #[error("Engine protocol error: {0}")]
    Protocol(String),
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The component that actually dispatches HTTP requests.
#[async_trait]
pub trait LoadTestEngine: Send + Sync {
    /// Runs the whole test, resolving once every request finished or the
    /// run was cancelled. Events emitted meanwhile carry `run`.
    async fn execute_run(
        &self,
        run: RunId,
        config: &TestConfig,
    ) -> Result<RunResult, EngineError>;

    /// Best effort, the acknowledgement arrives as [`EngineEvent::Cancelled`].
    async fn request_cancel(&self) -> Result<(), EngineError>;

    async fn available_parallelism(&self) -> Result<usize, EngineError>;

    /// Every receiver gets every event emitted after subscribing.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent>;
}

/// Fan-out of engine events to every live subscriber.
#[derive(Debug, Default)]
pub struct EventBroadcaster {
    subscribers: std::sync::Mutex<Vec<mpsc::UnboundedSender<EngineEvent>>>,
}

impl EventBroadcaster {
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(sender);
        receiver
    }

    pub fn emit(&self, event: EngineEvent) {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_fan_out_and_prune_closed_subscribers() {
        let broadcaster = EventBroadcaster::default();
        let mut first = broadcaster.subscribe();
        let second = broadcaster.subscribe();
        drop(second);

        broadcaster.emit(EngineEvent::Cancelled(RunId::new(3)));

        let event = first.recv().await.unwrap();
        assert_eq!(event, EngineEvent::Cancelled(RunId::new(3)));
        assert_eq!(event.run(), RunId::new(3));
        assert_eq!(broadcaster.subscriber_count(), 1);
    }
}
