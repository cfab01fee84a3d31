use derive_more::derive::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ChartKind {
    #[display("Throughput")]
    Throughput,
    #[display("Latency")]
    Latency,
    #[display("Request Timeline")]
    RequestTimeline,
}

impl ChartKind {
    /// File stem used when the chart is rendered to disk.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ChartKind::Throughput => "throughput",
            ChartKind::Latency => "latency",
            ChartKind::RequestTimeline => "request_timeline",
        }
    }
}
