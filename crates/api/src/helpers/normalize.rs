//! Raw warehouse rows to typed result tables

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use warehouse::{ColumnKind, MetricView, RawRow};

/// Label used for rows whose chain identifier is NULL
pub const UNKNOWN_CHAIN: &str = "unknown";

/// Maximum number of rows kept in a ranking chart
pub const TOP_N: usize = 10;

/// Rows do not have the shape the view declares
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("schema mismatch in {view}: column '{column}' {reason}")]
pub struct SchemaMismatch {
    /// View being normalized
    pub view: MetricView,
    /// Offending column
    pub column: String,
    /// What was wrong with it
    pub reason: String,
}

/// Window totals
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KpiTotals {
    /// Distinct transfers
    pub transfers: u64,
    /// Distinct users
    pub users: u64,
    /// Rounded fiat volume, NULL when no row had a price
    pub volume: Option<f64>,
}

/// One time bucket
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesRow {
    /// Bucket start
    pub date: NaiveDate,
    /// Distinct transfers
    pub transfers: u64,
    /// Distinct users
    pub users: u64,
    /// Rounded fiat volume
    pub volume: Option<f64>,
}

/// One cohort bucket
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CohortRow {
    /// Bucket start
    pub date: NaiveDate,
    /// Users whose first event falls in the bucket
    pub new_users: u64,
    /// Users active in the bucket
    pub total_users: u64,
    /// `total_users - new_users`
    pub active_users: u64,
    /// Running sum of `new_users`
    pub growth: u64,
}

/// Aggregates for one chain pair
#[derive(Clone, Debug, PartialEq)]
pub struct FlowRow {
    /// Source chain
    pub source: String,
    /// Destination chain
    pub destination: String,
    /// Rounded fiat volume
    pub volume: Option<f64>,
    /// Distinct transfers
    pub transfers: u64,
    /// Distinct users
    pub users: u64,
}

/// Aggregates for one chain
#[derive(Clone, Debug, PartialEq)]
pub struct RankingRow {
    /// Chain identifier
    pub chain: String,
    /// Distinct transfers
    pub transfers: u64,
    /// Distinct users
    pub users: u64,
    /// Rounded fiat volume
    pub volume: Option<f64>,
}

/// Metric a ranking is ordered by
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RankMetric {
    /// Fiat volume
    Volume,
    /// Transfer count
    Transfers,
    /// User count
    Users,
}

impl RankMetric {
    /// Every metric in chart order.
    pub const ALL: [Self; 3] = [Self::Volume, Self::Transfers, Self::Users];

    fn value(self, row: &RankingRow) -> Option<f64> {
        match self {
            Self::Volume => row.volume,
            Self::Transfers => Some(row.transfers as f64),
            Self::Users => Some(row.users as f64),
        }
    }
}

/// Normalized output of a metric view
#[derive(Clone, Debug, PartialEq)]
pub enum ResultTable {
    /// Window totals
    Kpi(KpiTotals),
    /// Buckets in ascending order
    TimeSeries(Vec<SeriesRow>),
    /// Buckets in ascending order with derived columns
    UserCohort(Vec<CohortRow>),
    /// Chain pairs
    ChainFlow(Vec<FlowRow>),
    /// Chains in warehouse order; see [`top_n`]
    Ranking(Vec<RankingRow>),
}

impl ResultTable {
    /// Number of rows held.
    pub fn len(&self) -> usize {
        match self {
            Self::Kpi(_) => 1,
            Self::TimeSeries(rows) => rows.len(),
            Self::UserCohort(rows) => rows.len(),
            Self::ChainFlow(rows) => rows.len(),
            Self::Ranking(rows) => rows.len(),
        }
    }

    /// Whether no rows are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Typed access to one raw row.
struct Cells<'a> {
    view: MetricView,
    row: &'a RawRow,
}

impl<'a> Cells<'a> {
    const fn new(view: MetricView, row: &'a RawRow) -> Self {
        Self { view, row }
    }

    fn mismatch(&self, column: &str, reason: impl Into<String>) -> SchemaMismatch {
        SchemaMismatch { view: self.view, column: column.to_owned(), reason: reason.into() }
    }

    /// Case-insensitive column lookup.
    fn get(&self, column: &str) -> Result<&'a Value, SchemaMismatch> {
        if let Some(v) = self.row.get(column) {
            return Ok(v);
        }
        self.row
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
            .ok_or_else(|| self.mismatch(column, "is missing"))
    }

    fn count(&self, column: &str) -> Result<u64, SchemaMismatch> {
        let value = self.get(column)?;
        if value.is_null() {
            return Err(self.mismatch(column, "is NULL"));
        }
        as_f64(value)
            .filter(|n| *n >= 0.0)
            .map(|n| n.round() as u64)
            .ok_or_else(|| self.mismatch(column, format!("is not a count: {value}")))
    }

    fn optional_count(&self, column: &str) -> Result<Option<u64>, SchemaMismatch> {
        let value = self.get(column)?;
        Ok(as_f64(value).filter(|n| *n >= 0.0).map(|n| n.round() as u64))
    }

    fn amount(&self, column: &str) -> Result<Option<f64>, SchemaMismatch> {
        self.get(column).map(as_f64)
    }

    fn chain(&self, column: &str) -> Result<String, SchemaMismatch> {
        let value = self.get(column)?;
        Ok(match value {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Null | Value::String(_) => UNKNOWN_CHAIN.to_owned(),
            other => other.to_string(),
        })
    }

    fn date(&self, column: &str) -> Result<NaiveDate, SchemaMismatch> {
        let value = self.get(column)?;
        value
            .as_str()
            .and_then(|s| s.trim().get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .ok_or_else(|| self.mismatch(column, format!("is not a date: {value}")))
    }
}

/// Number from a JSON number or numeric string. 64-bit integers arrive quoted.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Reject rows missing a declared column before any typed access.
fn check_columns(view: MetricView, rows: &[RawRow]) -> Result<(), SchemaMismatch> {
    for row in rows {
        let cells = Cells::new(view, row);
        for spec in view.schema() {
            let value = cells.get(spec.name)?;
            if value.is_null() && !spec.nullable && spec.kind != ColumnKind::Text {
                return Err(cells.mismatch(spec.name, "is NULL"));
            }
        }
    }
    Ok(())
}

/// Normalize `rows` returned for `view`.
pub fn normalize(view: MetricView, rows: &[RawRow]) -> Result<ResultTable, SchemaMismatch> {
    check_columns(view, rows)?;
    match view {
        MetricView::Kpi => kpi(view, rows).map(ResultTable::Kpi),
        MetricView::TimeSeries => time_series(view, rows).map(ResultTable::TimeSeries),
        MetricView::UserCohort => user_cohort(view, rows).map(ResultTable::UserCohort),
        MetricView::ChainFlow => chain_flow(view, rows).map(ResultTable::ChainFlow),
        MetricView::SourceRanking | MetricView::DestinationRanking => {
            ranking(view, rows).map(ResultTable::Ranking)
        }
    }
}

fn kpi(view: MetricView, rows: &[RawRow]) -> Result<KpiTotals, SchemaMismatch> {
    match rows {
        [] => Ok(KpiTotals::default()),
        [row] => {
            let cells = Cells::new(view, row);
            Ok(KpiTotals {
                transfers: cells.count("number_of_transfers")?,
                users: cells.count("number_of_users")?,
                volume: cells.amount("volume_of_transfers")?,
            })
        }
        _ => Err(SchemaMismatch {
            view,
            column: "number_of_transfers".to_owned(),
            reason: format!("expected a single row, got {}", rows.len()),
        }),
    }
}

fn time_series(view: MetricView, rows: &[RawRow]) -> Result<Vec<SeriesRow>, SchemaMismatch> {
    let mut out = rows
        .iter()
        .map(|row| {
            let cells = Cells::new(view, row);
            Ok(SeriesRow {
                date: cells.date("date")?,
                transfers: cells.count("number_of_transfers")?,
                users: cells.count("number_of_users")?,
                volume: cells.amount("volume_of_transfers")?,
            })
        })
        .collect::<Result<Vec<_>, SchemaMismatch>>()?;
    out.sort_by_key(|r| r.date);
    Ok(out)
}

fn user_cohort(view: MetricView, rows: &[RawRow]) -> Result<Vec<CohortRow>, SchemaMismatch> {
    let mut buckets = rows
        .iter()
        .map(|row| {
            let cells = Cells::new(view, row);
            Ok((
                cells.date("date")?,
                cells.count("new_users")?,
                cells.optional_count("total_users")?.unwrap_or_default(),
            ))
        })
        .collect::<Result<Vec<_>, SchemaMismatch>>()?;
    buckets.sort_by_key(|(date, _, _)| *date);
    Ok(derive_cohort(&buckets))
}

/// Active users and running growth for `(date, new, total)` buckets in order.
pub fn derive_cohort(buckets: &[(NaiveDate, u64, u64)]) -> Vec<CohortRow> {
    let mut growth = 0u64;
    buckets
        .iter()
        .map(|&(date, new_users, total_users)| {
            growth = growth.saturating_add(new_users);
            CohortRow {
                date,
                new_users,
                total_users,
                active_users: total_users.saturating_sub(new_users),
                growth,
            }
        })
        .collect()
}

fn chain_flow(view: MetricView, rows: &[RawRow]) -> Result<Vec<FlowRow>, SchemaMismatch> {
    rows.iter()
        .map(|row| {
            let cells = Cells::new(view, row);
            Ok(FlowRow {
                source: cells.chain("source_chain")?,
                destination: cells.chain("destination_chain")?,
                volume: cells.amount("swap_volume")?,
                transfers: cells.count("swap_count")?,
                users: cells.count("swapper_count")?,
            })
        })
        .collect()
}

fn ranking(view: MetricView, rows: &[RawRow]) -> Result<Vec<RankingRow>, SchemaMismatch> {
    rows.iter()
        .map(|row| {
            let cells = Cells::new(view, row);
            Ok(RankingRow {
                chain: cells.chain("chain")?,
                transfers: cells.count("number_of_transfers")?,
                users: cells.count("number_of_users")?,
                volume: cells.amount("volume_of_transfers")?,
            })
        })
        .collect()
}

/// Descending order with missing values after every present one.
fn desc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// First `n` rows by `metric`, descending. Ties keep their input order.
pub fn top_n(rows: &[RankingRow], metric: RankMetric, n: usize) -> Vec<RankingRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| desc_nulls_last(metric.value(a), metric.value(b)));
    sorted.truncate(n);
    sorted
}
