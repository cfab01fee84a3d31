use crate::args::{ExportFormat, HistoryCommand, RunArgs, SettingsCommand, TestArgs, ZoylaCommand};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use zoyla_report::config::TestConfig;
use zoyla_report::export;
use zoyla_report::hardware::HostHardware;
use zoyla_report::history_entry::HistoryEntry;
use zoyla_report::result::RunResult;
use zoyla_runner::advisor::{self, ConcurrencyFactors, ConcurrencyRecommendation};
use zoyla_runner::configs::runner::{ChartsConfig, RunnerConfig};
use zoyla_runner::engine::process::ProcessEngine;
use zoyla_runner::error::RunnerError;
use zoyla_runner::history::HistoryLedger;
use zoyla_runner::orchestrator::{RunOutcome, TestRunOrchestrator, DEFAULT_CPU_CORES};
use zoyla_runner::plot::{plot_chart, ALL_CHARTS};
use zoyla_runner::settings::Preferences;
use zoyla_runner::storage::{FileStore, KeyValueStore};

struct Context {
    config: RunnerConfig,
    history: Arc<HistoryLedger>,
    preferences: Preferences,
}

impl Context {
    async fn load(config: RunnerConfig) -> Self {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(config.history.storage_path.clone()));
        let history = Arc::new(HistoryLedger::new(
            store.clone(),
            config.history.max_entries,
        ));
        history.load_from_storage().await;
        Self {
            config,
            history,
            preferences: Preferences::new(store),
        }
    }

    /// Chart settings with the stored theme applied.
    async fn charts(&self) -> ChartsConfig {
        ChartsConfig {
            dark: self.preferences.theme().await.is_dark(),
            ..self.config.charts.clone()
        }
    }

    fn find_entry(&self, id: &str) -> Result<HistoryEntry, RunnerError> {
        self.history
            .find(id)
            .ok_or_else(|| RunnerError::HistoryEntryNotFound(id.to_owned()))
    }
}

pub async fn handle(command: ZoylaCommand, config: RunnerConfig) -> Result<(), RunnerError> {
    let context = Context::load(config).await;
    match command {
        ZoylaCommand::Run(args) => run(&context, args).await,
        ZoylaCommand::Recommend(args) => {
            recommend(&context, &args);
            Ok(())
        }
        ZoylaCommand::History(command) => history(&context, command).await,
        ZoylaCommand::Settings(command) => settings(&context, command).await,
    }
}

async fn run(context: &Context, args: RunArgs) -> Result<(), RunnerError> {
    let executable = context
        .config
        .engine
        .executable
        .clone()
        .ok_or(RunnerError::EngineNotConfigured)?;
    let engine = Arc::new(ProcessEngine::new(
        executable,
        context.config.engine.args.clone(),
    ));
    let orchestrator = Arc::new(TestRunOrchestrator::new(
        engine,
        context.history.clone(),
        context.config.progress.update_interval,
    ));
    let test_config = args.test.to_config();
    if !test_config.method.accepts_body()
        && (test_config.body.is_some() || test_config.uses_multipart())
    {
        warn!(
            "{} requests usually carry no body, sending the payload anyway",
            test_config.method
        );
    }

    let recommendation = orchestrator.recommendation(&test_config).await;
    for warning in advisor::warnings_for(test_config.concurrency, &recommendation) {
        warn!("{warning}");
    }

    let mut state = orchestrator.state().subscribe();
    let progress = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let progress = state.borrow_and_update().progress.clone();
            if let Some(progress) = progress {
                info!("{}", progress.formatted_string());
            }
        }
    });

    let canceller = orchestrator.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, cancelling the test...");
            canceller.cancel().await;
        }
    });

    let outcome = orchestrator.start(&test_config).await;
    ctrl_c.abort();
    orchestrator.shutdown().await;
    progress.abort();

    match outcome {
        RunOutcome::Completed(result) => {
            let entry = context.history.latest();
            if let Some(entry) = &entry {
                entry.print_summary();
            }
            write_exports(&result, &test_config.normalized(), &args).await?;
            if let (Some(directory), Some(entry)) = (&args.charts_dir, &entry) {
                write_charts(entry, directory, &context.charts().await)?;
            }
            Ok(())
        }
        RunOutcome::Cancelled => {
            warn!("Test cancelled by user.");
            Ok(())
        }
        RunOutcome::Rejected(message) => Err(RunnerError::RunRejected(message)),
        RunOutcome::AlreadyRunning => Err(RunnerError::RunRejected(
            "another test is already running".to_owned(),
        )),
        RunOutcome::Failed(message) => Err(RunnerError::RunFailed(message)),
    }
}

async fn write_exports(
    result: &RunResult,
    config: &TestConfig,
    args: &RunArgs,
) -> Result<(), RunnerError> {
    let exported_at = Utc::now();
    if let Some(path) = &args.export_json {
        let json = export::to_json(result, config, exported_at)?;
        write_file(path, json).await?;
    }
    if let Some(path) = &args.export_csv {
        write_file(path, export::to_csv(result, config, exported_at)?).await?;
    }
    Ok(())
}

async fn write_file(path: &Path, contents: String) -> Result<(), RunnerError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await?;
    info!("Exported results to {}", path.display());
    Ok(())
}

fn write_charts(
    entry: &HistoryEntry,
    directory: &Path,
    charts: &ChartsConfig,
) -> Result<(), RunnerError> {
    for kind in ALL_CHARTS {
        plot_chart(entry, directory, kind, charts)?;
    }
    Ok(())
}

fn recommend(context: &Context, args: &TestArgs) {
    let hardware = HostHardware::detect();
    let cpu_cores = if hardware.cpu_cores > 0 {
        hardware.cpu_cores
    } else {
        DEFAULT_CPU_CORES
    };
    let config = args.to_config();
    let recommendation = advisor::recommend(&ConcurrencyFactors {
        cpu_cores,
        use_http2: config.use_http2,
        disable_keep_alive: config.disable_keep_alive,
        url: config.url.clone(),
        past_success_rate: context.history.past_success_rate(&config.url),
    });

    info!(
        "Host: {} ({} cores, {} MB), {} {}",
        hardware.cpu_name,
        hardware.cpu_cores,
        hardware.total_memory_mb,
        hardware.os_name,
        hardware.os_version
    );
    print_recommendation(&recommendation);
    for warning in advisor::warnings_for(config.concurrency, &recommendation) {
        warn!("{warning}");
    }
}

fn print_recommendation(recommendation: &ConcurrencyRecommendation) {
    info!(
        "Suggested concurrency: {} (max {})",
        recommendation.suggested, recommendation.max
    );
    for step in &recommendation.breakdown {
        info!("  {step}");
    }
}

async fn history(context: &Context, command: HistoryCommand) -> Result<(), RunnerError> {
    match command {
        HistoryCommand::List => {
            let entries = context.history.entries();
            if entries.is_empty() {
                info!("No past runs recorded.");
            }
            for entry in entries {
                info!("{}", entry.list_row());
            }
        }
        HistoryCommand::Show { id } => {
            let entry = context.find_entry(&id)?;
            context.history.select(Some(entry.id));
            entry.print_summary();
        }
        HistoryCommand::Delete { id } => {
            let entry = context.find_entry(&id)?;
            context.history.delete(entry.id).await;
            info!("Deleted run {}.", entry.id);
        }
        HistoryCommand::Clear => {
            let count = context.history.len();
            context.history.clear().await;
            info!("Deleted {count} past runs.");
        }
        HistoryCommand::Export { id, format, output } => {
            let entry = context.find_entry(&id)?;
            let exported_at = Utc::now();
            let contents = match format {
                ExportFormat::Json => export::to_json(&entry.result, &entry.config, exported_at)?,
                ExportFormat::Csv => export::to_csv(&entry.result, &entry.config, exported_at)?,
            };
            write_file(&output, contents).await?;
        }
        HistoryCommand::Charts { id, output_dir } => {
            let entry = context.find_entry(&id)?;
            write_charts(&entry, &output_dir, &context.charts().await)?;
        }
    }
    Ok(())
}

async fn settings(context: &Context, command: SettingsCommand) -> Result<(), RunnerError> {
    match command {
        SettingsCommand::Show => {
            info!("Theme: {}", context.preferences.theme().await);
            for (panel, visible) in context.preferences.layout().await.panels() {
                info!("  {panel}: {}", if visible { "shown" } else { "hidden" });
            }
        }
        SettingsCommand::Theme { theme } => {
            context.preferences.save_theme(theme).await;
            info!("Theme set to {theme}.");
        }
        SettingsCommand::Panel { panel, visible } => {
            let layout = context.preferences.layout().await.with_panel(panel, visible);
            context.preferences.save_layout(layout).await;
            info!("{panel} {}.", if visible { "shown" } else { "hidden" });
        }
    }
    Ok(())
}
