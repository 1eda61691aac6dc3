//! SQL compilation for metric views
//!
//! Every view reads the same base relation: router transfers and GMP calls
//! combined with `UNION ALL`, each branch filtered by the allowlist and the
//! delivery status. Request values only ever reach the warehouse as bound
//! parameters; identifiers and JSON paths come from the closed set below.

use crate::{allowlist::AllowList, params::QueryParams, view::MetricView};

const TRANSFERS_TABLE: &str = "fact_transfers";
const GMP_TABLE: &str = "fact_gmp";

/// Tables and allowlist a compiled query reads from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSource {
    transfers_table: String,
    gmp_table: String,
    allowlist: AllowList,
}

impl EventSource {
    /// Qualify the fact tables with `schema` (empty means unqualified).
    pub fn new(schema: &str, allowlist: AllowList) -> Self {
        Self {
            transfers_table: qualify(schema, TRANSFERS_TABLE),
            gmp_table: qualify(schema, GMP_TABLE),
            allowlist,
        }
    }

    /// Allowlist applied to both branches.
    pub const fn allowlist(&self) -> &AllowList {
        &self.allowlist
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::new("", AllowList::router())
    }
}

fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('\\', "\\\\").replace('`', "\\`"))
}

fn qualify(schema: &str, table: &str) -> String {
    let schema = schema.trim();
    if schema.is_empty() {
        quote_ident(table)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(table))
    }
}

/// A value sent alongside the SQL text as `param_<name>`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindParam {
    /// Placeholder name
    pub name: String,
    /// Textual value
    pub value: String,
}

/// SQL text plus its bound parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledQuery {
    /// Query text with `{name:Type}` placeholders
    pub sql: String,
    /// Values for every placeholder in `sql`
    pub params: Vec<BindParam>,
}

impl CompiledQuery {
    /// Look up the value bound to `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|p| p.name == name).map(|p| p.value.as_str())
    }
}

/// Collects bound parameters while SQL text is assembled.
#[derive(Debug, Default)]
pub(crate) struct Binds {
    params: Vec<BindParam>,
}

impl Binds {
    /// Register `value` under `name` and return its placeholder.
    /// Binding the same name twice keeps the first value.
    pub(crate) fn bind(&mut self, name: &str, ty: &str, value: String) -> String {
        if !self.params.iter().any(|p| p.name == name) {
            self.params.push(BindParam { name: name.to_owned(), value });
        }
        format!("{{{name}:{ty}}}")
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.params.len()
    }

    fn into_params(self) -> Vec<BindParam> {
        self.params
    }
}

/// A view plus the filter selection it is computed for
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct QuerySpec {
    /// Output shape
    pub view: MetricView,
    /// Granularity and window
    pub params: QueryParams,
}

impl QuerySpec {
    /// Pair a view with its params.
    pub const fn new(view: MetricView, params: QueryParams) -> Self {
        Self { view, params }
    }

    /// Compile into SQL against `source`.
    pub fn compile(&self, source: &EventSource) -> CompiledQuery {
        let mut binds = Binds::default();
        let sql = match self.view {
            MetricView::Kpi => kpi(source, &self.params, &mut binds),
            MetricView::TimeSeries => time_series(source, &self.params, &mut binds),
            MetricView::UserCohort => user_cohort(source, &self.params, &mut binds),
            MetricView::ChainFlow => chain_flow(source, &self.params, &mut binds),
            MetricView::SourceRanking => ranking(source, &self.params, "source_chain", &mut binds),
            MetricView::DestinationRanking => {
                ranking(source, &self.params, "destination_chain", &mut binds)
            }
        };
        CompiledQuery { sql, params: binds.into_params() }
    }
}

/// JSON path arguments for the `JSONExtract*` family rooted at `data`.
fn json_args(path: &[&str]) -> String {
    let keys: Vec<String> = path.iter().map(|k| format!("'{k}'")).collect();
    format!("data, {}", keys.join(", "))
}

/// Double at `path`, or NULL when the value is an array, an object or
/// text that does not parse as a number.
fn scalar_double(path: &[&str]) -> String {
    let args = json_args(path);
    format!(
        "if(JSONType({args}) IN ('Array', 'Object'), NULL, \
         toFloat64OrNull(trim(BOTH '\"' FROM JSONExtractRaw({args}))))"
    )
}

fn json_string(path: &[&str]) -> String {
    format!("JSONExtractString({})", json_args(path))
}

fn chain_id(path: &[&str], lowercase: bool) -> String {
    let raw = json_string(path);
    if lowercase {
        format!("nullIf(lower({raw}), '')")
    } else {
        format!("nullIf({raw}, '')")
    }
}

fn window(expr: &str, params: &QueryParams, binds: &mut Binds) -> String {
    let start = binds.bind("start_date", "Date", params.start_date().to_string());
    let end = binds.bind("end_date", "Date", params.end_date().to_string());
    format!("toDate({expr}) >= {start} AND toDate({expr}) <= {end}")
}

/// Optional columns of the base relation. `created_at`, `actor` and `id` are
/// always present.
#[derive(Copy, Clone, Debug, Default)]
struct Columns {
    chains: bool,
    amounts: bool,
    fee: bool,
    asset: bool,
}

impl Columns {
    const IDENTITY: Self = Self { chains: false, amounts: false, fee: false, asset: false };
    const METRICS: Self = Self { chains: false, amounts: true, fee: false, asset: false };
    const ROUTED: Self = Self { chains: true, amounts: true, fee: false, asset: false };
}

/// Builder for the unioned event relation.
#[derive(Debug)]
struct BaseRelation<'a> {
    source: &'a EventSource,
    columns: Columns,
    lower_gmp_chains: bool,
    windowed: bool,
}

impl<'a> BaseRelation<'a> {
    const fn new(source: &'a EventSource, columns: Columns) -> Self {
        Self { source, columns, lower_gmp_chains: false, windowed: false }
    }

    const fn lower_gmp_chains(mut self) -> Self {
        self.lower_gmp_chains = true;
        self
    }

    const fn windowed(mut self) -> Self {
        self.windowed = true;
        self
    }

    fn render(&self, params: &QueryParams, binds: &mut Binds) -> String {
        let transfers = self.transfers_branch(params, binds);
        let gmp = self.gmp_branch(params, binds);
        format!("{transfers}\n    UNION ALL\n{gmp}")
    }

    fn select_list(&self, fields: BranchFields) -> String {
        let mut cols = vec![
            "created_at AS created_at".to_owned(),
            format!("{} AS actor", fields.actor),
            "toString(id) AS id".to_owned(),
            format!("'{}' AS service", fields.service),
        ];
        if self.columns.chains {
            cols.push(format!("{} AS source_chain", fields.source_chain));
            cols.push(format!("{} AS destination_chain", fields.destination_chain));
        }
        if self.columns.amounts {
            cols.push(format!("{} AS amount", fields.amount));
            cols.push(format!("{} AS amount_usd", fields.amount_usd));
        }
        if self.columns.fee {
            cols.push(format!("{} AS fee", fields.fee));
        }
        if self.columns.asset {
            cols.push(format!("{} AS raw_asset", fields.asset));
        }
        cols.join(",\n        ")
    }

    fn filters(
        &self,
        allow_expr: &str,
        params: &QueryParams,
        binds: &mut Binds,
    ) -> Vec<String> {
        let mut filters = vec![
            "status = 'executed'".to_owned(),
            "simplified_status = 'received'".to_owned(),
            self.source.allowlist.predicate(allow_expr, binds),
        ];
        if self.windowed {
            filters.push(window("created_at", params, binds));
        }
        filters
    }

    fn transfers_branch(&self, params: &QueryParams, binds: &mut Binds) -> String {
        let amount = scalar_double(&["send", "amount"]);
        let fields = BranchFields {
            service: "Token Transfers",
            actor: "recipient_address".to_owned(),
            source_chain: chain_id(&["send", "original_source_chain"], true),
            destination_chain: chain_id(&["send", "original_destination_chain"], true),
            amount_usd: format!("{amount} * {}", scalar_double(&["link", "price"])),
            amount,
            fee: scalar_double(&["send", "fee_value"]),
            asset: json_string(&["link", "asset"]),
        };
        let filters = self.filters("sender_address", params, binds);
        format!(
            "    SELECT\n        {}\n    FROM {}\n    WHERE {}",
            self.select_list(fields),
            self.source.transfers_table,
            filters.join("\n      AND ")
        )
    }

    fn gmp_branch(&self, params: &QueryParams, binds: &mut Binds) -> String {
        let gas_fee = format!(
            "{} * {}",
            scalar_double(&["gas", "gas_used_amount"]),
            scalar_double(&["gas_price_rate", "source_token", "token_price", "usd"])
        );
        let fields = BranchFields {
            service: "GMP",
            actor: json_string(&["call", "transaction", "from"]),
            source_chain: chain_id(&["call", "chain"], self.lower_gmp_chains),
            destination_chain: chain_id(
                &["call", "returnValues", "destinationChain"],
                self.lower_gmp_chains,
            ),
            amount: scalar_double(&["amount"]),
            amount_usd: scalar_double(&["value"]),
            fee: format!("coalesce({gas_fee}, {})", scalar_double(&["fees", "express_fee_usd"])),
            asset: json_string(&["symbol"]),
        };
        let allow_expr = json_string(&["approved", "returnValues", "contractAddress"]);
        let filters = self.filters(&allow_expr, params, binds);
        format!(
            "    SELECT\n        {}\n    FROM {}\n    WHERE {}",
            self.select_list(fields),
            self.source.gmp_table,
            filters.join("\n      AND ")
        )
    }
}

/// Per-branch expressions for the base relation columns
#[derive(Debug)]
struct BranchFields {
    service: &'static str,
    actor: String,
    source_chain: String,
    destination_chain: String,
    amount: String,
    amount_usd: String,
    fee: String,
    asset: String,
}

fn kpi(source: &EventSource, params: &QueryParams, binds: &mut Binds) -> String {
    let events = BaseRelation::new(source, Columns::METRICS).render(params, binds);
    let window = window("created_at", params, binds);
    format!(
        "WITH events AS (\n{events}\n)\n\
         SELECT\n    \
             count(DISTINCT id) AS number_of_transfers,\n    \
             count(DISTINCT actor) AS number_of_users,\n    \
             round(sum(amount_usd)) AS volume_of_transfers\n\
         FROM events\n\
         WHERE {window}"
    )
}

fn time_series(source: &EventSource, params: &QueryParams, binds: &mut Binds) -> String {
    let events = BaseRelation::new(source, Columns::METRICS).render(params, binds);
    let window = window("created_at", params, binds);
    let trunc = params.granularity().truncate_fn();
    format!(
        "WITH events AS (\n{events}\n)\n\
         SELECT\n    \
             {trunc}(created_at) AS date,\n    \
             count(DISTINCT id) AS number_of_transfers,\n    \
             count(DISTINCT actor) AS number_of_users,\n    \
             round(sum(amount_usd)) AS volume_of_transfers\n\
         FROM events\n\
         WHERE {window}\n\
         GROUP BY date\n\
         ORDER BY date ASC"
    )
}

fn user_cohort(source: &EventSource, params: &QueryParams, binds: &mut Binds) -> String {
    // First-seen day is taken over the full history, so the base relation
    // is left unwindowed.
    let events = BaseRelation::new(source, Columns::IDENTITY).render(params, binds);
    let first_seen_window = window("first_date", params, binds);
    let active_window = window("created_at", params, binds);
    let trunc = params.granularity().truncate_fn();
    format!(
        "WITH events AS (\n{events}\n),\n\
         first_seen AS (\n    \
             SELECT actor, min(toDate(created_at)) AS first_date\n    \
             FROM events\n    \
             GROUP BY actor\n\
         ),\n\
         new_users AS (\n    \
             SELECT {trunc}(first_date) AS date, count(DISTINCT actor) AS new_users\n    \
             FROM first_seen\n    \
             WHERE {first_seen_window}\n    \
             GROUP BY date\n\
         ),\n\
         total_users AS (\n    \
             SELECT {trunc}(created_at) AS date, count(DISTINCT actor) AS total_users\n    \
             FROM events\n    \
             WHERE {active_window}\n    \
             GROUP BY date\n\
         )\n\
         SELECT n.date AS date, n.new_users AS new_users, t.total_users AS total_users\n\
         FROM new_users AS n\n\
         LEFT JOIN total_users AS t ON n.date = t.date\n\
         ORDER BY date ASC"
    )
}

fn chain_flow(source: &EventSource, params: &QueryParams, binds: &mut Binds) -> String {
    let events =
        BaseRelation::new(source, Columns::ROUTED).lower_gmp_chains().render(params, binds);
    let window = window("created_at", params, binds);
    format!(
        "WITH events AS (\n{events}\n)\n\
         SELECT\n    \
             source_chain,\n    \
             destination_chain,\n    \
             round(sum(amount_usd)) AS swap_volume,\n    \
             count(DISTINCT id) AS swap_count,\n    \
             count(DISTINCT actor) AS swapper_count\n\
         FROM events\n\
         WHERE {window}\n  \
           AND amount_usd IS NOT NULL\n\
         GROUP BY source_chain, destination_chain\n\
         ORDER BY source_chain ASC, destination_chain ASC"
    )
}

fn ranking(
    source: &EventSource,
    params: &QueryParams,
    chain_column: &str,
    binds: &mut Binds,
) -> String {
    let events = BaseRelation::new(source, Columns::ROUTED).windowed().render(params, binds);
    format!(
        "WITH events AS (\n{events}\n)\n\
         SELECT\n    \
             {chain_column} AS chain,\n    \
             count(DISTINCT id) AS number_of_transfers,\n    \
             count(DISTINCT actor) AS number_of_users,\n    \
             round(sum(amount_usd)) AS volume_of_transfers\n\
         FROM events\n\
         GROUP BY chain\n\
         ORDER BY number_of_transfers DESC"
    )
}
