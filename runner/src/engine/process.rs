use super::{EngineError, EngineEvent, EventBroadcaster, LoadTestEngine};
use crate::state::RunId;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use zoyla_report::config::TestConfig;
use zoyla_report::progress::ProgressSnapshot;
use zoyla_report::result::RunResult;

const CANCEL_COMMAND: &[u8] = b"cancel\n";
const CANCELLED_MESSAGE: &str = "Test cancelled by user";
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// One line of engine stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "payload")]
enum EngineMessage {
    #[serde(rename = "load-test-progress")]
    Progress(ProgressSnapshot),
    #[serde(rename = "load-test-cancelled")]
    Cancelled,
    #[serde(rename = "result")]
    Finished(Box<RunResult>),
    #[serde(rename = "error")]
    Failed(String),
}

/// Runs an external engine executable per test, speaking JSON lines.
///
/// The config goes to the child's stdin as a single line, `cancel` is
/// written to the same pipe on request. Stdout carries progress and the
/// terminal result or error.
#[derive(Debug)]
pub struct ProcessEngine {
    executable: PathBuf,
    args: Vec<String>,
    stdin: Mutex<Option<ChildStdin>>,
    events: EventBroadcaster,
}

impl ProcessEngine {
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
            stdin: Mutex::new(None),
            events: EventBroadcaster::default(),
        }
    }

    async fn read_until_terminal(
        &self,
        run: RunId,
        stdout: ChildStdout,
    ) -> Result<RunResult, EngineError> {
        let mut lines = BufReader::new(stdout).lines();
        let mut cancelled = false;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<EngineMessage>(line) {
                Ok(EngineMessage::Progress(snapshot)) => {
                    self.events.emit(EngineEvent::Progress(run, snapshot));
                }
                Ok(EngineMessage::Cancelled) => {
                    cancelled = true;
                    self.events.emit(EngineEvent::Cancelled(run));
                }
                Ok(EngineMessage::Finished(result)) => return Ok(*result),
                Ok(EngineMessage::Failed(message)) if message == CANCELLED_MESSAGE => {
                    return Err(EngineError::Cancelled);
                }
                Ok(EngineMessage::Failed(message)) => return Err(EngineError::Failed(message)),
                Err(error) => warn!("Skipping malformed engine message: {error}"),
            }
        }

        if cancelled {
            return Err(EngineError::Cancelled);
        }
        Err(EngineError::Failed(
            "Engine exited without reporting a result".to_owned(),
        ))
    }
}

#[async_trait]
impl LoadTestEngine for ProcessEngine {
    async fn execute_run(
        &self,
        run: RunId,
        config: &TestConfig,
    ) -> Result<RunResult, EngineError> {
        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        info!(
            "Started engine {} for run {run}: {} {}",
            self.executable.display(),
            config.method,
            config.url
        );

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdin is not piped".to_owned()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("engine stdout is not piped".to_owned()))?;

        let mut request = serde_json::to_vec(config)?;
        request.push(b'\n');
        stdin.write_all(&request).await?;
        stdin.flush().await?;
        *self.stdin.lock().await = Some(stdin);

        let outcome = self.read_until_terminal(run, stdout).await;

        // Closing stdin tells the engine nothing else is coming.
        self.stdin.lock().await.take();
        match tokio::time::timeout(EXIT_GRACE_PERIOD, child.wait()).await {
            Ok(Ok(status)) => debug!("Engine exited with {status}"),
            Ok(Err(error)) => warn!("Cannot wait for engine exit: {error}"),
            Err(_) => {
                warn!("Engine did not exit after reporting, killing it.");
                if let Err(error) = child.kill().await {
                    warn!("Cannot kill engine: {error}");
                }
            }
        }

        outcome
    }

    async fn request_cancel(&self) -> Result<(), EngineError> {
        let mut stdin = self.stdin.lock().await;
        let Some(stdin) = stdin.as_mut() else {
            return Err(EngineError::NotRunning);
        };
        stdin.write_all(CANCEL_COMMAND).await?;
        stdin.flush().await?;
        debug!("Sent cancel request to engine.");
        Ok(())
    }

    async fn available_parallelism(&self) -> Result<usize, EngineError> {
        Ok(std::thread::available_parallelism()?.get())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<EngineEvent> {
        self.events.subscribe()
    }
}
