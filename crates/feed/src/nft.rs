//! NFT mint campaign metrics shaped from saved query results

use chrono::NaiveDate;
use serde_json::Value;
use tracing::info;

use crate::client::{FeedClient, FeedError, FeedResult, FeedRow};

/// Last day of the mint campaign shown in daily charts
pub const NFT_CUTOFF_DATE: &str = "2024-08-17";

/// Saved queries backing the NFT section
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NftQuery {
    /// Distinct minting addresses
    TotalMinters,
    /// Tokens minted
    TotalMinted,
    /// Daily and cumulative mint value
    MintedValue,
    /// Daily and cumulative mint count
    MintedPerDay,
    /// Mint count distribution across minters
    MintedVsMinters,
    /// Addresses ranked by tokens minted
    TopAddresses,
}

impl NftQuery {
    /// Saved query identifier.
    pub const fn id(&self) -> u64 {
        match self {
            Self::TotalMinters => 5693825,
            Self::TotalMinted => 5693849,
            Self::MintedValue => 5693983,
            Self::MintedPerDay => 5693886,
            Self::MintedVsMinters => 5693905,
            Self::TopAddresses => 5694318,
        }
    }
}

/// One day of a bar + cumulative line series
#[derive(Clone, Debug, PartialEq)]
pub struct DailyPoint {
    /// Calendar day
    pub date: NaiveDate,
    /// Value for the day
    pub value: Option<f64>,
    /// Running total up to and including the day
    pub cumulative: Option<f64>,
}

/// Daily series with a cumulative companion
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DualSeries {
    /// Points in ascending date order
    pub points: Vec<DailyPoint>,
}

/// Table row carrying its 1-based position
#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    /// Position starting at 1
    pub rank: usize,
    /// Cells in column order
    pub cells: Vec<Value>,
}

/// Tabular feed result ready for display
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeedTable {
    /// Column headers
    pub columns: Vec<String>,
    /// Ranked rows
    pub rows: Vec<TableRow>,
}

/// Every NFT metric; each one succeeds or fails on its own
#[derive(Clone, Debug)]
pub struct NftMetrics {
    /// Distinct minters
    pub total_minters: Result<f64, FeedError>,
    /// Tokens minted
    pub total_minted: Result<f64, FeedError>,
    /// Latest cumulative mint value
    pub total_value: Result<f64, FeedError>,
    /// Daily mint count
    pub minted_per_day: Result<DualSeries, FeedError>,
    /// Daily mint value
    pub value_per_day: Result<DualSeries, FeedError>,
    /// Mint count vs minters
    pub minted_vs_minters: Result<FeedTable, FeedError>,
    /// Top minting addresses
    pub top_addresses: Result<FeedTable, FeedError>,
}

impl FeedClient {
    /// Fetch every NFT metric one query after another.
    pub async fn nft_metrics(&self) -> NftMetrics {
        let minters = self.query_results(NftQuery::TotalMinters.id()).await;
        let minted = self.query_results(NftQuery::TotalMinted.id()).await;
        let value = self.query_results(NftQuery::MintedValue.id()).await;
        let per_day = self.query_results(NftQuery::MintedPerDay.id()).await;
        let vs_minters = self.query_results(NftQuery::MintedVsMinters.id()).await;
        let top = self.query_results(NftQuery::TopAddresses.id()).await;

        let metrics = NftMetrics {
            total_minters: minters
                .and_then(|r| first_number(NftQuery::TotalMinters, &r, "Total Minters")),
            total_minted: minted
                .and_then(|r| first_number(NftQuery::TotalMinted, &r, "Total NFTs Minted")),
            total_value: value.clone().and_then(|r| {
                last_number(NftQuery::MintedValue, &r, "Total Value of NFTs Minted")
            }),
            minted_per_day: per_day.and_then(|r| {
                daily_series(
                    NftQuery::MintedPerDay,
                    &r,
                    "Number of NFT Minted",
                    "Total Number of NFT Minted",
                )
            }),
            value_per_day: value.and_then(|r| {
                daily_series(
                    NftQuery::MintedValue,
                    &r,
                    "Value of NFTs Minted",
                    "Total Value of NFTs Minted",
                )
            }),
            minted_vs_minters: vs_minters.map(|r| ranked_table(r, &[])),
            top_addresses: top.map(|r| ranked_table(r, &[("to", "Address")])),
        };
        info!(failed = metrics.failures(), "NFT metrics loaded");
        metrics
    }
}

impl NftMetrics {
    /// Number of metrics carried.
    pub const COUNT: usize = 7;

    /// Number of metrics that could not be loaded.
    pub fn failures(&self) -> usize {
        [
            self.total_minters.is_err(),
            self.total_minted.is_err(),
            self.total_value.is_err(),
            self.minted_per_day.is_err(),
            self.value_per_day.is_err(),
            self.minted_vs_minters.is_err(),
            self.top_addresses.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }

    /// Whether every metric failed.
    pub fn all_failed(&self) -> bool {
        self.failures() == Self::COUNT
    }
}

/// Number held in a JSON cell, accepting numeric strings.
pub fn cell_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn column_number(query: NftQuery, row: &FeedRow, column: &str) -> Result<f64, FeedError> {
    let cell = row
        .get(column)
        .ok_or_else(|| FeedError::unavailable(query.id(), format!("missing column '{column}'")))?;
    cell_number(cell).ok_or_else(|| {
        FeedError::unavailable(query.id(), format!("non-numeric value in '{column}': {cell}"))
    })
}

fn first_number(query: NftQuery, res: &FeedResult, column: &str) -> Result<f64, FeedError> {
    let row = res.rows.first().ok_or_else(|| FeedError::unavailable(query.id(), "no rows"))?;
    column_number(query, row, column)
}

fn last_number(query: NftQuery, res: &FeedResult, column: &str) -> Result<f64, FeedError> {
    let row = res.rows.last().ok_or_else(|| FeedError::unavailable(query.id(), "no rows"))?;
    column_number(query, row, column)
}

/// Leading `YYYY-MM-DD` of a date or timestamp cell.
fn cell_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

fn cutoff() -> NaiveDate {
    NaiveDate::parse_from_str(NFT_CUTOFF_DATE, "%Y-%m-%d").unwrap_or(NaiveDate::MAX)
}

fn daily_series(
    query: NftQuery,
    res: &FeedResult,
    value_column: &str,
    cumulative_column: &str,
) -> Result<DualSeries, FeedError> {
    let cutoff = cutoff();
    let mut points = Vec::with_capacity(res.rows.len());
    for row in &res.rows {
        let date = row.get("Date").and_then(cell_date).ok_or_else(|| {
            FeedError::unavailable(query.id(), "row without a valid 'Date'")
        })?;
        if date > cutoff {
            continue;
        }
        points.push(DailyPoint {
            date,
            value: row.get(value_column).and_then(cell_number),
            cumulative: row.get(cumulative_column).and_then(cell_number),
        });
    }
    points.sort_by_key(|p| p.date);
    Ok(DualSeries { points })
}

fn ranked_table(res: FeedResult, renames: &[(&str, &str)]) -> FeedTable {
    let FeedResult { columns: source_columns, rows } = res;
    let columns = source_columns
        .iter()
        .map(|c| {
            renames
                .iter()
                .find(|(from, _)| *from == c.as_str())
                .map_or_else(|| c.clone(), |(_, to)| (*to).to_owned())
        })
        .collect();
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| TableRow {
            rank: i + 1,
            cells: source_columns
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                .collect(),
        })
        .collect();
    FeedTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};
    use serde_json::json;

    fn result(columns: &[&str], rows: Value) -> FeedResult {
        let rows = match rows {
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::Object(m) => m,
                    _ => panic!("row must be an object"),
                })
                .collect(),
            _ => panic!("rows must be an array"),
        };
        FeedResult { columns: columns.iter().map(|c| (*c).to_owned()).collect(), rows }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn kpi_value_uses_last_row() {
        let res = result(
            &["Date", "Total Value of NFTs Minted"],
            json!([
                {"Date": "2024-08-01 00:00:00.000 UTC", "Total Value of NFTs Minted": 10.5},
                {"Date": "2024-08-02 00:00:00.000 UTC", "Total Value of NFTs Minted": "25.5"}
            ]),
        );
        let v = last_number(NftQuery::MintedValue, &res, "Total Value of NFTs Minted").unwrap();
        assert_eq!(v, 25.5);
    }

    #[test]
    fn kpi_missing_column_is_unavailable() {
        let res = result(&["x"], json!([{"x": 1}]));
        let err = first_number(NftQuery::TotalMinters, &res, "Total Minters").unwrap_err();
        assert_eq!(
            err,
            FeedError::Unavailable {
                query_id: 5693825,
                reason: "missing column 'Total Minters'".to_owned()
            }
        );
    }

    #[test]
    fn daily_series_stops_at_cutoff() {
        let res = result(
            &["Date", "Number of NFT Minted", "Total Number of NFT Minted"],
            json!([
                {"Date": "2024-08-18", "Number of NFT Minted": 4, "Total Number of NFT Minted": 17},
                {"Date": "2024-08-16", "Number of NFT Minted": 5, "Total Number of NFT Minted": 5},
                {"Date": "2024-08-17 00:00:00.000 UTC", "Number of NFT Minted": 8, "Total Number of NFT Minted": 13}
            ]),
        );
        let series = daily_series(
            NftQuery::MintedPerDay,
            &res,
            "Number of NFT Minted",
            "Total Number of NFT Minted",
        )
        .unwrap();
        let dates: Vec<_> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date("2024-08-16"), date("2024-08-17")]);
        assert_eq!(series.points[1].cumulative, Some(13.0));
    }

    #[test]
    fn daily_series_rejects_rows_without_date() {
        let res = result(&["Date"], json!([{"Date": null}]));
        assert!(daily_series(NftQuery::MintedValue, &res, "a", "b").is_err());
    }

    #[test]
    fn tables_are_ranked_from_one_and_renamed() {
        let res = result(
            &["to", "NFTs Minted"],
            json!([
                {"to": "0xabc", "NFTs Minted": 12},
                {"to": "0xdef", "NFTs Minted": 9}
            ]),
        );
        let table = ranked_table(res, &[("to", "Address")]);
        assert_eq!(table.columns, vec!["Address".to_owned(), "NFTs Minted".to_owned()]);
        assert_eq!(table.rows[0].rank, 1);
        assert_eq!(table.rows[1].rank, 2);
        assert_eq!(table.rows[1].cells, vec![json!("0xdef"), json!(9)]);
    }

    async fn mock_query(server: &mut ServerGuard, query: NftQuery, body: Value) {
        server
            .mock("GET", format!("/query/{}/results", query.id()).as_str())
            .with_status(200)
            .with_body(json!({"result": {"rows": body}}).to_string())
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn metrics_fail_independently() {
        let mut server = Server::new_async().await;
        mock_query(&mut server, NftQuery::TotalMinters, json!([{"Total Minters": 1520}])).await;
        mock_query(&mut server, NftQuery::TotalMinted, json!([{"Total NFTs Minted": "2048"}]))
            .await;
        mock_query(
            &mut server,
            NftQuery::MintedValue,
            json!([
                {"Date": "2024-08-10", "Value of NFTs Minted": 100.0, "Total Value of NFTs Minted": 100.0},
                {"Date": "2024-08-11", "Value of NFTs Minted": 50.0, "Total Value of NFTs Minted": 150.0}
            ]),
        )
        .await;
        server
            .mock("GET", format!("/query/{}/results", NftQuery::MintedPerDay.id()).as_str())
            .with_status(500)
            .create_async()
            .await;
        mock_query(&mut server, NftQuery::MintedVsMinters, json!([{"NFTs": 1, "Minters": 900}]))
            .await;
        mock_query(&mut server, NftQuery::TopAddresses, json!([{"to": "0xabc", "Minted": 40}]))
            .await;

        let client = FeedClient::with_base_url("k".to_owned(), server.url().parse().unwrap());
        let metrics = client.nft_metrics().await;

        assert_eq!(metrics.total_minters, Ok(1520.0));
        assert_eq!(metrics.total_minted, Ok(2048.0));
        assert_eq!(metrics.total_value, Ok(150.0));
        assert!(metrics.minted_per_day.is_err());
        assert_eq!(metrics.value_per_day.as_ref().unwrap().points.len(), 2);
        assert!(metrics.top_addresses.as_ref().unwrap().columns.contains(&"Address".to_owned()));
        assert_eq!(metrics.failures(), 1);
        assert!(!metrics.all_failed());
    }
}
