use charming::{
    component::{
        Axis, DataZoom, DataZoomType, Feature, Grid, Legend, Restore, SaveAsImage, Title,
        Toolbox, ToolboxDataZoom,
    },
    element::{
        AreaStyle, AxisLabel, AxisPointer, AxisPointerType, AxisType, ItemStyle, LineStyle,
        NameLocation, SplitLine, TextStyle, Tooltip,
    },
    series::{Line, Scatter},
    Chart,
};

const DARK_BACKGROUND: &str = "#1e1e1e";
const DARK_TEXT: &str = "#e6e6e6";
const LIGHT_TEXT: &str = "#333333";

/// How a run metric is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    /// Continuous line, optionally filled below.
    Line { filled: bool },
    /// One dot per sample.
    Dots,
}

/// Builder for the single-run charts: one value axis of seconds since the
/// run started and one metric axis.
pub struct RunChart {
    chart: Chart,
    text_color: &'static str,
}

impl RunChart {
    pub fn new(title: &str, subtext: &str, dark: bool) -> Self {
        let text_color = if dark { DARK_TEXT } else { LIGHT_TEXT };
        let mut chart = Chart::new()
            .title(
                Title::new()
                    .text(title)
                    .subtext(subtext)
                    .left("3%")
                    .top("2%")
                    .text_style(TextStyle::new().font_size(20).color(text_color))
                    .subtext_style(TextStyle::new().font_size(13).color(text_color)),
            )
            .tooltip(Tooltip::new().axis_pointer(AxisPointer::new().type_(AxisPointerType::Line)))
            .legend(
                Legend::new()
                    .right("4%")
                    .top("3%")
                    .text_style(TextStyle::new().color(text_color)),
            )
            .grid(Grid::new().left("7%").right("4%").top("15%").bottom("14%"))
            .data_zoom(
                DataZoom::new()
                    .type_(DataZoomType::Slider)
                    .bottom("3%")
                    .start(0)
                    .end(100),
            )
            .toolbox(
                Toolbox::new().feature(
                    Feature::new()
                        .data_zoom(ToolboxDataZoom::new())
                        .restore(Restore::new())
                        .save_as_image(SaveAsImage::new()),
                ),
            );
        if dark {
            chart = chart.background_color(DARK_BACKGROUND);
        }

        Self { chart, text_color }
    }

    /// Adds the elapsed-seconds x axis and a metric y axis named `metric`.
    pub fn axes(mut self, metric: &str) -> Self {
        self.chart = self
            .chart
            .x_axis(
                Axis::new()
                    .type_(AxisType::Value)
                    .name("Elapsed")
                    .name_location(NameLocation::End)
                    .name_text_style(TextStyle::new().color(self.text_color))
                    .axis_label(AxisLabel::new().formatter("{value} s"))
                    .split_line(SplitLine::new().show(false)),
            )
            .y_axis(
                Axis::new()
                    .type_(AxisType::Value)
                    .name(metric)
                    .name_location(NameLocation::End)
                    .name_text_style(TextStyle::new().font_size(14).color(self.text_color))
                    .split_line(SplitLine::new().show(true)),
            );
        self
    }

    /// Adds a series of `[elapsed_secs, value]` pairs.
    pub fn series(
        mut self,
        name: &str,
        color: &str,
        style: SeriesStyle,
        points: Vec<Vec<f64>>,
    ) -> Self {
        self.chart = match style {
            SeriesStyle::Line { filled } => {
                let mut line = Line::new()
                    .name(name)
                    .show_symbol(false)
                    .item_style(ItemStyle::new().color(color))
                    .line_style(LineStyle::new().width(2))
                    .data(points);
                if filled {
                    line = line.area_style(AreaStyle::new().opacity(0.15));
                }
                self.chart.series(line)
            }
            SeriesStyle::Dots => self.chart.series(
                Scatter::new()
                    .name(name)
                    .symbol_size(3)
                    .item_style(ItemStyle::new().color(color))
                    .data(points),
            ),
        };
        self
    }

    pub fn build(self) -> Chart {
        self.chart
    }
}
