//! # Collector
//!
//! Pulls the roster, the per-member expense lines and the propositions from
//! the Chamber of Deputies open-data API and persists them as CSV tables under
//! the data directory.
//!
//! Every request carries the configured `dataInicio`/`dataFim` range and reads
//! a single page. A successful response is HTTP 200 with a JSON body whose
//! `dados` array holds the records.
//!
//! Expense collection is best effort: a member whose request fails is logged
//! and left out, and the rest of the batch goes on. Writes replace the target
//! file only after they succeed, so a failed fetch leaves the previous file as
//! it was.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use reqwest::{StatusCode, header::ACCEPT};
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use tracing::{debug, error, info};

use crate::{
    commands::Dataset,
    config::CamaraConfig,
    error::{CollectError, DataError},
    tables::{Table, cell_text},
};

/// Columns the expense aggregate is grouped by, in output order.
pub const EXPENSE_KEYS: [&str; 3] = ["dataDocumento", "nome", "tipoDespesa"];

/// Column tagging each expense line with the member it was fetched for.
pub const MEMBER_ID_COLUMN: &str = "deputado_id";

#[derive(Debug, Deserialize)]
struct Envelope {
    dados: Vec<Map<String, Value>>,
}

/// Outcome of [`Collector::fetch_expenses`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpenseRun {
    /// Members read from the roster.
    pub members: usize,
    /// Ids whose request failed and were left out.
    pub failed: Vec<String>,
    /// Rows in the written aggregate.
    pub rows: usize,
}

/// Client for the upstream API, bound to one date range and one data directory.
pub struct Collector {
    client: reqwest::Client,
    base_url: String,
    date_start: NaiveDate,
    date_end: NaiveDate,
    members_path: PathBuf,
    expenses_path: PathBuf,
    propositions_path: PathBuf,
}

impl Collector {
    pub fn from_config(config: &CamaraConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            date_start: config.date_start,
            date_end: config.date_end,
            members_path: config.members_path(),
            expenses_path: config.expenses_path(),
            propositions_path: config.propositions_path(),
        }
    }

    /// One GET against `{base}/{path}`; returns the `dados` array.
    async fn get_dados(&self, path: &str) -> Result<Vec<Map<String, Value>>, CollectError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("GET {url} ({} .. {})", self.date_start, self.date_end);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("dataInicio", self.date_start.to_string()),
                ("dataFim", self.date_end.to_string()),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| CollectError::Http {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(CollectError::Status { url, status });
        }

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|source| CollectError::Decode {
                url: url.clone(),
                source,
            })?;
        Ok(envelope.dados)
    }

    /// Fetch the roster and write it to the members table.
    ///
    /// Returns the number of members written.
    pub async fn fetch_members(&self) -> Result<usize, CollectError> {
        self.fetch_table("deputados", &self.members_path).await
    }

    /// Fetch the propositions presented in the range and write them out.
    pub async fn fetch_propositions(&self) -> Result<usize, CollectError> {
        self.fetch_table("proposicoes", &self.propositions_path).await
    }

    async fn fetch_table(&self, endpoint: &str, path: &Path) -> Result<usize, CollectError> {
        let records = self.get_dados(endpoint).await.inspect_err(|e| {
            error!("Could not fetch {endpoint}: {e}");
        })?;
        let table = Table::from_records(&records);
        table.write_csv(path)?;
        info!("Wrote {} rows to {}", table.len(), path.display());
        Ok(table.len())
    }

    /// Fetch every member's expenses, aggregate them per day and type, and
    /// write the result.
    ///
    /// Reads the members table written by [`fetch_members`](Self::fetch_members);
    /// it must have `id` and `nome` columns.
    pub async fn fetch_expenses(&self) -> Result<ExpenseRun, CollectError> {
        let members = Table::read_csv(&self.members_path)?;
        let id_col = members.column("id").ok_or_else(|| DataError::MissingColumn {
            path: self.members_path.clone(),
            column: "id",
        })?;
        let name_col = members.column("nome").ok_or_else(|| DataError::MissingColumn {
            path: self.members_path.clone(),
            column: "nome",
        })?;

        let mut run = ExpenseRun {
            members: members.len(),
            ..ExpenseRun::default()
        };
        let mut lines = Vec::new();

        for row in &members.rows {
            let id = row.get(id_col).map(String::as_str).unwrap_or_default();
            let name = row.get(name_col).map(String::as_str).unwrap_or_default();

            match self.get_dados(&format!("deputados/{id}/despesas")).await {
                Ok(records) => {
                    debug!("{} expense lines for {name} ({id})", records.len());
                    let tag = member_id_value(id);
                    lines.extend(records.into_iter().map(|mut record| {
                        record.insert(MEMBER_ID_COLUMN.to_string(), tag.clone());
                        record.insert("nome".to_string(), Value::String(name.to_string()));
                        record
                    }));
                }
                Err(e) => {
                    error!("Skipping expenses of {name} ({id}): {e}");
                    run.failed.push(id.to_string());
                }
            }
        }

        let table = aggregate_expenses(lines);
        table.write_csv(&self.expenses_path)?;
        run.rows = table.len();
        info!(
            "Wrote {} aggregated expense rows to {} ({} of {} members failed)",
            run.rows,
            self.expenses_path.display(),
            run.failed.len(),
            run.members
        );
        Ok(run)
    }

    /// Collect `dataset`, in roster, expenses, propositions order.
    ///
    /// A failing step is logged and the remaining ones still run; the report
    /// lists what failed.
    pub async fn collect(&self, dataset: Dataset) -> CollectReport {
        let mut report = CollectReport::default();
        let wants = |d: Dataset| dataset == d || dataset == Dataset::All;

        if wants(Dataset::Members) {
            match self.fetch_members().await {
                Ok(n) => report.members = Some(n),
                Err(e) => report.fail(Dataset::Members, e),
            }
        }
        if wants(Dataset::Expenses) {
            match self.fetch_expenses().await {
                Ok(run) => report.expenses = Some(run),
                Err(e) => report.fail(Dataset::Expenses, e),
            }
        }
        if wants(Dataset::Propositions) {
            match self.fetch_propositions().await {
                Ok(n) => report.propositions = Some(n),
                Err(e) => report.fail(Dataset::Propositions, e),
            }
        }
        report
    }
}

/// Outcome of [`Collector::collect`].
#[derive(Debug, Default)]
pub struct CollectReport {
    /// Members written, when the roster was collected.
    pub members: Option<usize>,
    pub expenses: Option<ExpenseRun>,
    /// Propositions written, when they were collected.
    pub propositions: Option<usize>,
    /// Steps that failed, with their error.
    pub failed: Vec<(Dataset, CollectError)>,
}

impl CollectReport {
    fn fail(&mut self, dataset: Dataset, err: CollectError) {
        error!("Collecting {dataset:?} failed: {err}");
        self.failed.push((dataset, err));
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

fn member_id_value(id: &str) -> Value {
    id.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(id.to_string()))
}

#[derive(Default)]
struct Group {
    member_id: Option<Value>,
    sums: Vec<Sum>,
}

/// Running total of one numeric column; integer columns stay integers.
#[derive(Clone, Copy)]
enum Sum {
    Int(i64),
    Float(f64),
}

impl Sum {
    fn add(&mut self, value: &Value) {
        match self {
            Sum::Int(total) => *total = total.saturating_add(value.as_i64().unwrap_or(0)),
            Sum::Float(total) => *total += value.as_f64().unwrap_or(0.0),
        }
    }

    fn text(self) -> String {
        match self {
            Sum::Int(total) => total.to_string(),
            Sum::Float(total) => Number::from_f64(total)
                .map(|n| n.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Group expense lines by date, member name and expense type.
///
/// Lines missing any key are dropped. Numeric columns (every non-null value is
/// a JSON number) are summed, as integers when every value is one;
/// `deputado_id` keeps the group's first value; every other column is
/// dropped. Groups come out in key order.
pub fn aggregate_expenses(records: Vec<Map<String, Value>>) -> Table {
    let records: Vec<Map<String, Value>> = records
        .into_iter()
        .filter(|r| {
            EXPENSE_KEYS
                .iter()
                .all(|k| r.get(*k).is_some_and(|v| !v.is_null()))
        })
        .collect();

    let mut numeric: Vec<String> = Vec::new();
    let mut rejected: Vec<&str> = Vec::new();
    let mut non_integer: Vec<&str> = Vec::new();
    for record in &records {
        for (column, value) in record {
            if EXPENSE_KEYS.contains(&column.as_str()) || column == MEMBER_ID_COLUMN {
                continue;
            }
            match value {
                Value::Null => {}
                Value::Number(n) => {
                    if !n.is_i64() && !non_integer.contains(&column.as_str()) {
                        non_integer.push(column.as_str());
                    }
                    if !numeric.contains(column) && !rejected.contains(&column.as_str()) {
                        numeric.push(column.clone());
                    }
                }
                _ => {
                    if !rejected.contains(&column.as_str()) {
                        rejected.push(column.as_str());
                    }
                }
            }
        }
    }
    numeric.retain(|c| !rejected.contains(&c.as_str()));
    let zero: Vec<Sum> = numeric
        .iter()
        .map(|c| {
            if non_integer.contains(&c.as_str()) {
                Sum::Float(0.0)
            } else {
                Sum::Int(0)
            }
        })
        .collect();

    let mut groups: BTreeMap<[String; 3], Group> = BTreeMap::new();
    for record in &records {
        let key = EXPENSE_KEYS.map(|k| record.get(k).map(cell_text).unwrap_or_default());
        let group = groups.entry(key).or_insert_with(|| Group {
            member_id: None,
            sums: zero.clone(),
        });
        if group.member_id.is_none() {
            group.member_id = record.get(MEMBER_ID_COLUMN).filter(|v| !v.is_null()).cloned();
        }
        for (sum, column) in group.sums.iter_mut().zip(&numeric) {
            if let Some(value) = record.get(column) {
                sum.add(value);
            }
        }
    }

    let mut table = Table::new(
        EXPENSE_KEYS
            .iter()
            .map(|k| k.to_string())
            .chain([MEMBER_ID_COLUMN.to_string()])
            .chain(numeric.iter().cloned())
            .collect(),
    );
    table.rows = groups
        .into_iter()
        .map(|(key, group)| {
            key.into_iter()
                .chain([group.member_id.as_ref().map(cell_text).unwrap_or_default()])
                .chain(group.sums.iter().map(|s| s.text()))
                .collect()
        })
        .collect();
    table
}
