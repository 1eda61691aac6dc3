//! Warehouse-backed metric views and their output schemas

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Value class of a view column
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Bucket start date rendered as `YYYY-MM-DD`
    Date,
    /// Chain identifier or other label
    Text,
    /// Distinct count
    Count,
    /// Fiat amount
    Amount,
}

/// One declared output column
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as written in the generated SQL
    pub name: &'static str,
    /// Value class
    pub kind: ColumnKind,
    /// Whether the warehouse may return NULL for it
    pub nullable: bool,
}

const fn col(name: &'static str, kind: ColumnKind, nullable: bool) -> ColumnSpec {
    ColumnSpec { name, kind, nullable }
}

const KPI_SCHEMA: &[ColumnSpec] = &[
    col("number_of_transfers", ColumnKind::Count, false),
    col("number_of_users", ColumnKind::Count, false),
    col("volume_of_transfers", ColumnKind::Amount, true),
];

const TIME_SERIES_SCHEMA: &[ColumnSpec] = &[
    col("date", ColumnKind::Date, false),
    col("number_of_transfers", ColumnKind::Count, false),
    col("number_of_users", ColumnKind::Count, false),
    col("volume_of_transfers", ColumnKind::Amount, true),
];

const USER_COHORT_SCHEMA: &[ColumnSpec] = &[
    col("date", ColumnKind::Date, false),
    col("new_users", ColumnKind::Count, false),
    col("total_users", ColumnKind::Count, true),
];

const CHAIN_FLOW_SCHEMA: &[ColumnSpec] = &[
    col("source_chain", ColumnKind::Text, true),
    col("destination_chain", ColumnKind::Text, true),
    col("swap_volume", ColumnKind::Amount, true),
    col("swap_count", ColumnKind::Count, false),
    col("swapper_count", ColumnKind::Count, false),
];

const RANKING_SCHEMA: &[ColumnSpec] = &[
    col("chain", ColumnKind::Text, true),
    col("number_of_transfers", ColumnKind::Count, false),
    col("number_of_users", ColumnKind::Count, false),
    col("volume_of_transfers", ColumnKind::Amount, true),
];

/// Output shapes computed from the event relation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MetricView {
    /// Window totals: transfers, users, volume
    Kpi,
    /// Per-bucket totals
    TimeSeries,
    /// New, active and total users per bucket
    UserCohort,
    /// Aggregates per (source chain, destination chain)
    ChainFlow,
    /// Aggregates per source chain
    SourceRanking,
    /// Aggregates per destination chain
    DestinationRanking,
}

impl MetricView {
    /// Every view in dashboard order.
    pub const ALL: [Self; 6] = [
        Self::Kpi,
        Self::TimeSeries,
        Self::UserCohort,
        Self::ChainFlow,
        Self::SourceRanking,
        Self::DestinationRanking,
    ];

    /// Path segment used by the HTTP API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Kpi => "kpi",
            Self::TimeSeries => "time-series",
            Self::UserCohort => "user-cohort",
            Self::ChainFlow => "chain-flow",
            Self::SourceRanking => "source-ranking",
            Self::DestinationRanking => "destination-ranking",
        }
    }

    /// Whether the view output depends on the selected granularity.
    pub const fn uses_granularity(&self) -> bool {
        matches!(self, Self::TimeSeries | Self::UserCohort)
    }

    /// Declared output columns.
    pub const fn schema(&self) -> &'static [ColumnSpec] {
        match self {
            Self::Kpi => KPI_SCHEMA,
            Self::TimeSeries => TIME_SERIES_SCHEMA,
            Self::UserCohort => USER_COHORT_SCHEMA,
            Self::ChainFlow => CHAIN_FLOW_SCHEMA,
            Self::SourceRanking | Self::DestinationRanking => RANKING_SCHEMA,
        }
    }
}

impl fmt::Display for MetricView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown view '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_names_round_trip() {
        for view in MetricView::ALL {
            assert_eq!(view.as_str().parse::<MetricView>().unwrap(), view);
        }
        assert!("volume".parse::<MetricView>().is_err());
    }

    #[test]
    fn serde_uses_path_names() {
        let json = serde_json::to_string(&MetricView::DestinationRanking).unwrap();
        assert_eq!(json, "\"destination-ranking\"");
    }

    #[test]
    fn only_bucketed_views_use_granularity() {
        let bucketed: Vec<_> =
            MetricView::ALL.into_iter().filter(MetricView::uses_granularity).collect();
        assert_eq!(bucketed, vec![MetricView::TimeSeries, MetricView::UserCohort]);
    }
}
