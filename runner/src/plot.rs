use crate::configs::runner::ChartsConfig;
use crate::error::RunnerError;
use charming::theme::Theme;
use charming::{Chart, HtmlRenderer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use zoyla_report::history_entry::HistoryEntry;
use zoyla_report::plotting::chart_kind::ChartKind;

const CHART_WIDTH: u64 = 1600;
const CHART_HEIGHT: u64 = 1200;

pub const ALL_CHARTS: [ChartKind; 3] = [
    ChartKind::Throughput,
    ChartKind::Latency,
    ChartKind::RequestTimeline,
];

fn sample_count(kind: ChartKind, entry: &HistoryEntry) -> usize {
    match kind {
        ChartKind::Throughput => entry.result.throughput_over_time.len(),
        ChartKind::Latency => entry.result.latency_over_time.len(),
        ChartKind::RequestTimeline => entry.result.request_timeline.len(),
    }
}

/// Renders one chart of `entry` to `<output_directory>/<kind>.html`.
pub fn plot_chart(
    entry: &HistoryEntry,
    output_directory: &Path,
    kind: ChartKind,
    charts: &ChartsConfig,
) -> Result<PathBuf, RunnerError> {
    let data_processing_start = Instant::now();
    let chart = zoyla_report::create_chart(kind, entry, charts.dark, charts.max_points);
    let data_processing_time = data_processing_start.elapsed();

    let chart_render_start = Instant::now();
    let chart_path = save_chart(
        &chart,
        kind.file_stem(),
        output_directory,
        charts.dark,
    )?;
    let chart_render_time = chart_render_start.elapsed();

    info!(
        "Generated {} plot at: {} ({} samples, data processing: {:.2?}, chart render: {:.2?})",
        kind,
        chart_path.display(),
        sample_count(kind, entry),
        data_processing_time,
        chart_render_time
    );
    Ok(chart_path)
}

fn save_chart(
    chart: &Chart,
    file_name: &str,
    output_directory: &Path,
    dark: bool,
) -> Result<PathBuf, RunnerError> {
    std::fs::create_dir_all(output_directory)?;
    let full_output_path = output_directory.join(format!("{file_name}.html"));

    let mut renderer = HtmlRenderer::new(file_name, CHART_WIDTH, CHART_HEIGHT);
    if dark {
        renderer = renderer.theme(Theme::Dark);
    }
    renderer
        .save(chart, &full_output_path)
        .map_err(|error| RunnerError::CannotWriteChart(format!("Failed to save HTML plot: {error}")))?;
    Ok(full_output_path)
}
