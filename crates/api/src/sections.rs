//! Dashboard sections: load, normalize and render one view at a time

use std::time::Instant;

use api_types::{ChartSpec, DashboardResponse, DashboardRow, RowLayout, SectionResponse};
use feed::{FeedError, NftMetrics};
use tracing::{debug, error, info};
use warehouse::{MetricView, QueryParams, QuerySpec};

use crate::{
    helpers::{
        ResultTable, SectionError, dual_axis_chart, kpi, normalize, render, section_title,
        table_chart,
    },
    state::ApiState,
    validation::filter_selection,
};

/// Dashboard rows in display order.
pub const DASHBOARD_LAYOUT: [(MetricView, RowLayout); 6] = [
    (MetricView::Kpi, RowLayout::Cards),
    (MetricView::TimeSeries, RowLayout::Columns),
    (MetricView::UserCohort, RowLayout::Columns),
    (MetricView::ChainFlow, RowLayout::Tabs),
    (MetricView::SourceRanking, RowLayout::Columns),
    (MetricView::DestinationRanking, RowLayout::Columns),
];

/// Normalized result of `view`, served from the memo cache when possible.
/// Failures are not cached.
pub async fn load_view(
    state: &ApiState,
    view: MetricView,
    params: QueryParams,
) -> Result<ResultTable, SectionError> {
    if let Some(table) = state.cache.get(view, params) {
        debug!(view = %view, "View served from cache");
        return Ok(table);
    }

    let start = Instant::now();
    let rows = state.reader.fetch(&QuerySpec::new(view, params)).await?;
    let table = normalize(view, &rows)?;
    info!(
        view = %view,
        rows = table.len(),
        duration_ms = start.elapsed().as_millis(),
        "View loaded"
    );
    state.cache.insert(view, params, table.clone());
    Ok(table)
}

fn section(
    id: &str,
    title: &str,
    charts: Vec<ChartSpec>,
    errors: Vec<SectionError>,
) -> SectionResponse {
    SectionResponse {
        id: id.to_owned(),
        title: title.to_owned(),
        charts,
        errors: errors.iter().map(SectionError::body).collect(),
    }
}

/// Section for one view; a failure is carried inside the section.
pub async fn view_section(
    state: &ApiState,
    view: MetricView,
    params: QueryParams,
) -> SectionResponse {
    match load_view(state, view, params).await {
        Ok(table) => section(view.as_str(), section_title(view), render(view, &table), Vec::new()),
        Err(e) => {
            error!(view = %view, error = %e, "View failed");
            section(view.as_str(), section_title(view), Vec::new(), vec![e])
        }
    }
}

/// Every dashboard section, one view after another.
pub async fn dashboard(state: &ApiState, params: QueryParams) -> DashboardResponse {
    let mut rows = Vec::with_capacity(DASHBOARD_LAYOUT.len());
    for (view, layout) in DASHBOARD_LAYOUT {
        rows.push(DashboardRow { layout, section: view_section(state, view, params).await });
    }
    let failed = rows.iter().filter(|r| !r.section.errors.is_empty()).count();
    info!(sections = rows.len(), failed, "Dashboard assembled");
    DashboardResponse { filters: filter_selection(&params), rows }
}

/// Collects charts for the metrics that loaded and errors for the rest.
#[derive(Default)]
struct Collected {
    charts: Vec<ChartSpec>,
    errors: Vec<SectionError>,
}

impl Collected {
    fn push<T>(&mut self, metric: &Result<T, FeedError>, chart: impl FnOnce(&T) -> ChartSpec) {
        match metric {
            Ok(value) => self.charts.push(chart(value)),
            Err(e) => self.errors.push(SectionError::Feed(e.clone())),
        }
    }

    fn into_row(self, layout: RowLayout, id: &str, title: &str) -> DashboardRow {
        DashboardRow { layout, section: section(id, title, self.charts, self.errors) }
    }
}

/// NFT rows: KPI cards, daily charts, then tables.
pub fn nft_rows(metrics: &NftMetrics) -> Vec<DashboardRow> {
    let mut cards = Collected::default();
    cards.push(&metrics.total_minters, |v| kpi("Total Minters", Some(*v), "Addresses"));
    cards.push(&metrics.total_minted, |v| kpi("Total NFTs Minted", Some(*v), "NFTs"));
    cards.push(&metrics.total_value, |v| kpi("Total Value of NFTs Minted ($)", Some(*v), "$"));

    let mut daily = Collected::default();
    daily.push(&metrics.minted_per_day, |s| {
        dual_axis_chart(
            "Number of NFTs Minted per Day",
            "Number of NFT Minted",
            "Total Number of NFT Minted",
            None,
            s,
        )
    });
    daily.push(&metrics.value_per_day, |s| {
        dual_axis_chart(
            "Value of NFTs Minted per Day",
            "Value of NFTs Minted",
            "Total Value of NFTs Minted",
            Some("$"),
            s,
        )
    });

    let mut tables = Collected::default();
    tables.push(&metrics.minted_vs_minters, |t| table_chart("Number of NFT Minted vs Minters", t));
    tables.push(&metrics.top_addresses, |t| table_chart("Top Addresses by NFT Minted", t));

    vec![
        cards.into_row(RowLayout::Cards, "nft-kpi", "NFT Mint Campaign"),
        daily.into_row(RowLayout::Columns, "nft-daily", "Daily Mints"),
        tables.into_row(RowLayout::Columns, "nft-tables", "Minters"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed::{DailyPoint, DualSeries, FeedTable};

    fn down() -> FeedError {
        FeedError::Unavailable { query_id: 5693886, reason: "HTTP 500".to_owned() }
    }

    #[test]
    fn layout_matches_dashboard_rows() {
        let views: Vec<MetricView> = DASHBOARD_LAYOUT.iter().map(|(v, _)| *v).collect();
        assert_eq!(views, MetricView::ALL.to_vec());
        assert_eq!(DASHBOARD_LAYOUT[0].1, RowLayout::Cards);
        assert_eq!(DASHBOARD_LAYOUT[3].1, RowLayout::Tabs);
    }

    #[test]
    fn nft_failures_stay_in_their_row() {
        let metrics = NftMetrics {
            total_minters: Ok(10.0),
            total_minted: Err(down()),
            total_value: Ok(99.5),
            minted_per_day: Err(down()),
            value_per_day: Ok(DualSeries {
                points: vec![DailyPoint {
                    date: chrono::NaiveDate::from_ymd_opt(2024, 8, 1).unwrap(),
                    value: Some(1.0),
                    cumulative: Some(1.0),
                }],
            }),
            minted_vs_minters: Ok(FeedTable::default()),
            top_addresses: Ok(FeedTable::default()),
        };
        let rows = nft_rows(&metrics);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].section.charts.len(), 2);
        assert_eq!(rows[0].section.errors.len(), 1);
        assert_eq!(rows[0].section.errors[0].kind, "external-feed-unavailable");
        assert_eq!(rows[1].section.charts.len(), 1);
        assert_eq!(rows[1].section.errors.len(), 1);
        assert!(rows[2].section.errors.is_empty());
        assert_eq!(rows[2].section.charts.len(), 2);
    }
}
