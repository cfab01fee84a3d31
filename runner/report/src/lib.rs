pub mod downsample;
pub mod export;
pub mod plotting;
pub mod prints;
mod types;

pub use types::*;

use crate::downsample::downsample;
use crate::history_entry::HistoryEntry;
use crate::plotting::chart::{RunChart, SeriesStyle};
use crate::plotting::chart_kind::ChartKind;
use charming::Chart;

pub fn create_throughput_chart(entry: &HistoryEntry, dark: bool, max_points: usize) -> Chart {
    let points = entry
        .result
        .throughput_over_time
        .iter()
        .map(|point| vec![point.time_secs, point.rps])
        .collect::<Vec<_>>();

    RunChart::new(
        &entry.title(ChartKind::Throughput),
        &entry.subtext(),
        dark,
    )
    .axes("Requests per second")
    .series(
        "Throughput",
        "#5470c6",
        SeriesStyle::Line { filled: true },
        downsample(&points, max_points),
    )
    .build()
}

pub fn create_latency_chart(entry: &HistoryEntry, dark: bool, max_points: usize) -> Chart {
    let points = entry
        .result
        .latency_over_time
        .iter()
        .map(|point| vec![point.timestamp_ms / 1000.0, point.latency_ms])
        .collect::<Vec<_>>();

    RunChart::new(&entry.title(ChartKind::Latency), &entry.subtext(), dark)
        .axes("Latency [ms]")
        .series(
            "Latency",
            "#ee6666",
            SeriesStyle::Line { filled: false },
            downsample(&points, max_points),
        )
        .build()
}

pub fn create_request_timeline_chart(entry: &HistoryEntry, dark: bool, max_points: usize) -> Chart {
    let points = entry
        .result
        .request_timeline
        .iter()
        .map(|point| vec![point.time_secs, point.request_index as f64])
        .collect::<Vec<_>>();

    RunChart::new(
        &entry.title(ChartKind::RequestTimeline),
        &entry.subtext(),
        dark,
    )
    .axes("Request index")
    .series(
        "Request start",
        "#91cc75",
        SeriesStyle::Dots,
        downsample(&points, max_points),
    )
    .build()
}

pub fn create_chart(kind: ChartKind, entry: &HistoryEntry, dark: bool, max_points: usize) -> Chart {
    match kind {
        ChartKind::Throughput => create_throughput_chart(entry, dark, max_points),
        ChartKind::Latency => create_latency_chart(entry, dark, max_points),
        ChartKind::RequestTimeline => create_request_timeline_chart(entry, dark, max_points),
    }
}
