//! Chart generation and rendering for the lead views.
//!
//! Charts are built as ECharts options with `charming`, serialized to JSON and
//! initialized by a script in the page head:
//! - **Ranking charts**: horizontal bars for the most frequent values of a field
//! - **Timeline chart**: leads per day or week, stacked by UTM source

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, Tooltip, Trigger},
    series::bar,
};
use maud::{Markup, PreEscaped, html};

use crate::{
    analytics::{AggregationResult, Timeline},
    html::HeadElement,
};

/// The script that provides the global `echarts` object.
pub(crate) const ECHARTS_SCRIPT_URL: &str =
    "https://cdn.jsdelivr.net/npm/echarts@6.0.0/dist/echarts.min.js";

/// A chart with its HTML container ID and ECharts configuration.
#[derive(Debug, Clone)]
pub(crate) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

impl DashboardChart {
    pub(crate) fn new(id: &'static str, chart: &Chart) -> Self {
        Self {
            id,
            options: chart.to_string(),
        }
    }
}

/// Renders the HTML containers for charts, two per row on wide screens.
pub(crate) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        div class="grid grid-cols-1 xl:grid-cols-2 gap-4 w-full"
        {
            @for chart in charts {
                (chart_container(chart))
            }
        }
    )
}

/// Renders the container for a single chart.
pub(crate) fn chart_container(chart: &DashboardChart) -> Markup {
    html!(
        div
            id=(chart.id)
            class="min-h-[380px] w-full rounded dark:bg-gray-100"
            data-chart
        {}
    )
}

/// Generates JavaScript initialization code for charts.
///
/// Creates scripts that initialize ECharts instances with dark mode support
/// and responsive resizing.
pub(crate) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    if (!chartDom) {{ return; }}
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// The head elements for a page showing `charts`.
pub(crate) fn chart_head_elements(charts: &[DashboardChart]) -> Vec<HeadElement> {
    if charts.is_empty() {
        return Vec::new();
    }

    vec![
        HeadElement::ScriptLink(ECHARTS_SCRIPT_URL.to_owned()),
        charts_script(charts),
    ]
}

/// Horizontal bars for ranked keys, highest count at the top.
pub(crate) fn ranking_chart(title: &str, subtext: &str, ranking: &AggregationResult) -> Chart {
    // Category axes draw from the bottom up.
    let labels: Vec<String> = ranking.keys().into_iter().rev().collect();
    let counts: Vec<i64> = ranking.counts().into_iter().rev().collect();

    Chart::new()
        .title(Title::new().text(title).subtext(subtext))
        .tooltip(count_tooltip())
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(70)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Value))
        .y_axis(Axis::new().type_(AxisType::Category).data(labels))
        .series(bar::Bar::new().name("Leads").data(counts))
}

/// Leads per bucket, one stacked series per UTM source.
pub(crate) fn timeline_chart(timeline: &Timeline) -> Chart {
    let subtext = format!("Per {}, by UTM source", timeline.granularity.label().to_lowercase());

    let mut chart = Chart::new()
        .title(
            Title::new()
                .text("Leads over time")
                .subtext(subtext)
                .left(20)
                .top("1%"),
        )
        .tooltip(count_tooltip())
        .legend(Legend::new().left(250).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(90)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(timeline.labels()))
        .y_axis(Axis::new().type_(AxisType::Value));

    for key in &timeline.series_keys {
        chart = chart.series(
            bar::Bar::new()
                .name(key.as_str())
                .stack("Leads")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(timeline.series(key)),
        );
    }

    chart
}

fn count_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}
