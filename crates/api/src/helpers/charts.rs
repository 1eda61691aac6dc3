//! Result tables to declarative chart specifications

use api_types::{
    Axis, ChartSpec, FlowGraph, GraphEdge, GraphNode, KpiCard, Point, RankedBar,
    RankedBarChart, Series, SeriesKind, TableChart, XyChart,
};
use chrono::NaiveDate;
use feed::{DualSeries, FeedTable};
use serde_json::Value;
use warehouse::MetricView;

use super::{
    layout::{FlowMetric, edge_width, flow_graph, spring_layout},
    normalize::{
        CohortRow, FlowRow, KpiTotals, RankMetric, RankingRow, ResultTable, SeriesRow, TOP_N,
        top_n,
    },
};

/// Display title of a metric view section.
pub const fn section_title(view: MetricView) -> &'static str {
    match view {
        MetricView::Kpi => "Overview",
        MetricView::TimeSeries => "Swaps Over Time",
        MetricView::UserCohort => "Swappers Over Time",
        MetricView::ChainFlow => "Cross-Chain Flows",
        MetricView::SourceRanking => "Top Source Chains",
        MetricView::DestinationRanking => "Top Destination Chains",
    }
}

/// Charts for one normalized view.
pub fn render(view: MetricView, table: &ResultTable) -> Vec<ChartSpec> {
    match table {
        ResultTable::Kpi(totals) => kpi_cards(totals),
        ResultTable::TimeSeries(rows) => time_series_charts(rows),
        ResultTable::UserCohort(rows) => cohort_charts(rows),
        ResultTable::ChainFlow(rows) => flow_charts(rows),
        ResultTable::Ranking(rows) => ranking_charts(view, rows),
    }
}

/// Single-number card.
pub fn kpi(title: &str, value: Option<f64>, unit: &str) -> ChartSpec {
    ChartSpec::Kpi(KpiCard { title: title.to_owned(), value, unit: unit.to_owned() })
}

fn kpi_cards(totals: &KpiTotals) -> Vec<ChartSpec> {
    vec![
        kpi("Volume of Swaps", totals.volume, "$"),
        kpi("Number of Swaps", Some(totals.transfers as f64), "Txns"),
        kpi("Number of Swappers", Some(totals.users as f64), "Addresses"),
    ]
}

fn series(name: &str, kind: SeriesKind, axis: Axis, points: Vec<Point>) -> Series {
    Series { name: name.to_owned(), kind, axis, points }
}

fn point(date: NaiveDate, y: Option<f64>) -> Point {
    Point { x: date.to_string(), y }
}

fn xy(title: &str, y_title: &str, stacked: bool, series: Vec<Series>) -> ChartSpec {
    ChartSpec::Xy(XyChart {
        title: title.to_owned(),
        x_title: String::new(),
        y_title: y_title.to_owned(),
        y2_title: None,
        stacked,
        series,
    })
}

fn time_series_charts(rows: &[SeriesRow]) -> Vec<ChartSpec> {
    let volume = rows.iter().map(|r| point(r.date, r.volume)).collect();
    let count = rows.iter().map(|r| point(r.date, Some(r.transfers as f64))).collect();
    vec![
        xy(
            "Swap Volume Over Time ($USD)",
            "USD",
            false,
            vec![series("Volume of Transfers", SeriesKind::Bar, Axis::Primary, volume)],
        ),
        xy(
            "Swap Count Over Time",
            "Txns",
            false,
            vec![series("Number of Transfers", SeriesKind::Bar, Axis::Primary, count)],
        ),
    ]
}

fn cohort_charts(rows: &[CohortRow]) -> Vec<ChartSpec> {
    let pts = |f: fn(&CohortRow) -> u64| -> Vec<Point> {
        rows.iter().map(|r| point(r.date, Some(f(r) as f64))).collect()
    };
    vec![
        xy(
            "Number of Swappers Over Time",
            "User count",
            true,
            vec![
                series("Active Users", SeriesKind::Bar, Axis::Primary, pts(|r| r.active_users)),
                series("New Users", SeriesKind::Bar, Axis::Primary, pts(|r| r.new_users)),
                series("Total Users", SeriesKind::Line, Axis::Primary, pts(|r| r.total_users)),
            ],
        ),
        xy(
            "Users Growth Over Time",
            "user count",
            false,
            vec![series("User Growth", SeriesKind::Area, Axis::Primary, pts(|r| r.growth))],
        ),
    ]
}

const fn flow_labels(metric: FlowMetric) -> (&'static str, &'static str) {
    match metric {
        FlowMetric::Swappers => ("Swapper Count", "Flows by Swapper Count"),
        FlowMetric::Swaps => ("Swap Count", "Flows by Swap Count"),
        FlowMetric::Volume => ("Swap Volume", "Flows by Swap Volume"),
    }
}

fn flow_charts(rows: &[FlowRow]) -> Vec<ChartSpec> {
    FlowMetric::ALL.into_iter().map(|metric| flow_chart(rows, metric)).collect()
}

fn flow_chart(rows: &[FlowRow], metric: FlowMetric) -> ChartSpec {
    let (label, title) = flow_labels(metric);
    let graph = flow_graph(rows, metric);
    let positions = spring_layout(&graph);
    let max_weight = graph.edge_weights().copied().fold(0.0_f64, f64::max);

    let nodes = graph
        .node_indices()
        .map(|idx| {
            let [x, y] = positions[idx.index()];
            GraphNode { id: graph[idx].clone(), x, y }
        })
        .collect();
    let edges = graph
        .edge_indices()
        .filter_map(|e| {
            let (a, b) = graph.edge_endpoints(e)?;
            let weight = graph[e];
            Some(GraphEdge {
                source: graph[a].clone(),
                target: graph[b].clone(),
                weight,
                width: edge_width(weight, max_weight),
            })
        })
        .collect();

    ChartSpec::FlowGraph(FlowGraph {
        title: title.to_owned(),
        metric: label.to_owned(),
        nodes,
        edges,
    })
}

const fn ranking_labels(view: MetricView, metric: RankMetric) -> (&'static str, &'static str) {
    let source = matches!(view, MetricView::SourceRanking);
    match (source, metric) {
        (true, RankMetric::Volume) => ("USD", "Top 10 Source Chains by Swap Volume"),
        (true, RankMetric::Transfers) => ("Txns count", "Top 10 Source Chains by Swap Count"),
        (true, RankMetric::Users) => ("Address count", "Top 10 Source Chains by Swapper Count"),
        (false, RankMetric::Volume) => ("USD", "Top 10 Destination Chains by Swap Volume"),
        (false, RankMetric::Transfers) => {
            ("Txns count", "Top 10 Destination Chains by Swap Count")
        }
        (false, RankMetric::Users) => {
            ("Address count", "Top 10 Destination Chains by Swapper Count")
        }
    }
}

fn ranking_charts(view: MetricView, rows: &[RankingRow]) -> Vec<ChartSpec> {
    RankMetric::ALL
        .into_iter()
        .map(|metric| {
            let (label, title) = ranking_labels(view, metric);
            let bars = top_n(rows, metric, TOP_N)
                .into_iter()
                .map(|row| RankedBar {
                    value: match metric {
                        RankMetric::Volume => row.volume,
                        RankMetric::Transfers => Some(row.transfers as f64),
                        RankMetric::Users => Some(row.users as f64),
                    },
                    label: row.chain,
                })
                .collect();
            ChartSpec::RankedBar(RankedBarChart {
                title: title.to_owned(),
                metric: label.to_owned(),
                bars,
            })
        })
        .collect()
}

/// Bar for the daily value with the running total on a secondary axis.
pub fn dual_axis_chart(
    title: &str,
    value_name: &str,
    cumulative_name: &str,
    unit: Option<&str>,
    data: &DualSeries,
) -> ChartSpec {
    let with_unit = |name: &str| match unit {
        Some(u) => format!("{name} ({u})"),
        None => name.to_owned(),
    };
    let bars = data.points.iter().map(|p| point(p.date, p.value)).collect();
    let line = data.points.iter().map(|p| point(p.date, p.cumulative)).collect();
    ChartSpec::Xy(XyChart {
        title: title.to_owned(),
        x_title: "Date".to_owned(),
        y_title: with_unit(value_name),
        y2_title: Some(with_unit(cumulative_name)),
        stacked: false,
        series: vec![
            series(value_name, SeriesKind::Bar, Axis::Primary, bars),
            series(cumulative_name, SeriesKind::Line, Axis::Secondary, line),
        ],
    })
}

/// Table with a leading 1-based rank column.
pub fn table_chart(title: &str, table: &FeedTable) -> ChartSpec {
    let mut columns = Vec::with_capacity(table.columns.len() + 1);
    columns.push("#".to_owned());
    columns.extend(table.columns.iter().cloned());
    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(row.cells.len() + 1);
            cells.push(Value::from(row.rank));
            cells.extend(row.cells.iter().cloned());
            cells
        })
        .collect();
    ChartSpec::Table(TableChart { title: title.to_owned(), columns, rows })
}
