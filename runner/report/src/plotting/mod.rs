pub mod chart;
pub mod chart_kind;
pub mod text;
