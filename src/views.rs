//! # Views
//!
//! The read-only pages of the CLI: overview, expenses and propositions. Each
//! view renders to a markdown `String` that [`crate::pretty`] prints.
//!
//! A missing or broken artifact never aborts a view. The failure is rendered
//! inline, with its own wording for a missing file, undecodable JSON and a
//! missing key, and the rest of the page is still shown.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    config::CamaraConfig,
    error::DataError,
    insights::{self, ExpenseInsights, display_text},
    tables::Table,
};

/// Rows shown before a table is cut.
const MAX_TABLE_ROWS: usize = 50;

/// Column summed in the per-member expense totals.
const EXPENSE_VALUE_COLUMN: &str = "valorDocumento";

/// Inline notice for a failed artifact.
pub fn notice(err: &DataError) -> String {
    match err {
        DataError::MissingFile { path } => {
            format!("> **Arquivo não encontrado:** `{}`", path.display())
        }
        DataError::MalformedJson { path, .. } => {
            format!("> **Erro ao decodificar o arquivo JSON:** `{}`", path.display())
        }
        DataError::MissingKey { path, key } => {
            format!("> **Chave `{key}` não encontrada em** `{}`", path.display())
        }
        other => format!("> **Erro ao ler os dados:** {other}"),
    }
}

/// Render `table` as a markdown table, keeping at most `max_rows` rows.
pub fn markdown_table(table: &Table, max_rows: usize) -> String {
    if table.columns.is_empty() {
        return String::from("_(tabela vazia)_\n");
    }
    let mut out = table_line(&table.columns);
    out.push_str(&format!("|{}|\n", vec![":-"; table.columns.len()].join("|")));
    for row in table.rows.iter().take(max_rows) {
        out.push_str(&table_line(row));
    }
    if table.len() > max_rows {
        out.push_str(&format!("\n_… mais {} linhas_\n", table.len() - max_rows));
    }
    out
}

fn table_line(cells: &[String]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| cell(c)).collect();
    format!("|{}|\n", cells.join("|"))
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Party and state breakdown of the roster, then the distribution insights.
pub fn overview(config: &CamaraConfig) -> String {
    let mut out = String::from("# Câmara dos Deputados\n\n");
    out.push_str(&format!("{}\n\n", config.overview_summary));

    out.push_str("## Distribuição dos deputados por partido\n\n");
    match Table::read_csv(&config.members_path()) {
        Ok(members) => match count_by(&members, "siglaPartido") {
            Some(counts) => out.push_str(&markdown_table(&counts, usize::MAX)),
            None => out.push_str(&format!(
                "_{} deputados, sem a coluna `siglaPartido`_\n",
                members.len()
            )),
        },
        Err(e) => out.push_str(&notice(&e)),
    }

    out.push_str("\n## Insights\n\n");
    match insights::distribution_insights(&config.distribution_insights_path()) {
        Ok(items) => {
            for item in items {
                out.push_str(&format!("- {item}\n"));
            }
        }
        Err(e) => out.push_str(&notice(&e)),
    }
    out
}

/// Count rows per distinct value of `column`, most frequent first.
fn count_by(table: &Table, column: &str) -> Option<Table> {
    let idx = table.column(column)?;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &table.rows {
        *counts.entry(row.get(idx).map(String::as_str).unwrap_or_default()).or_default() += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let mut out = Table::new(vec![column.to_string(), "deputados".to_string()]);
    out.rows = counts
        .into_iter()
        .map(|(value, n)| vec![value.to_string(), n.to_string()])
        .collect();
    Some(out)
}

/// Expense insights, then either one member's daily series or the totals per member.
pub fn expenses(config: &CamaraConfig, member: Option<&str>) -> String {
    let mut out = String::from("# Despesas dos deputados\n\n");

    out.push_str("## Insights\n\n");
    match ExpenseInsights::load(&config.expense_insights_path()) {
        Ok(doc) => {
            for (headline, text) in doc.pairs() {
                match headline {
                    Some(h) => out.push_str(&format!("- **{h}**: {text}\n")),
                    None => out.push_str(&format!("- {text}\n")),
                }
            }
            for (title, items) in [("Conclusões", &doc.conclusoes), ("Limitações", &doc.limitacoes)] {
                if !items.is_empty() {
                    out.push_str(&format!("\n### {title}\n\n"));
                    for item in items {
                        out.push_str(&format!("- {}\n", display_text(item)));
                    }
                }
            }
        }
        Err(e) => out.push_str(&notice(&e)),
    }

    let table = match Table::read_csv(&config.expenses_path()) {
        Ok(table) => table,
        Err(e) => {
            out.push_str(&format!("\n## Série de despesas\n\n{}\n", notice(&e)));
            return out;
        }
    };

    match member {
        Some(name) => {
            out.push_str(&format!("\n## Série de despesas: {name}\n\n"));
            out.push_str(&member_series(&table, name));
        }
        None => {
            out.push_str("\n## Total por deputado\n\n");
            out.push_str(&member_totals(&table));
        }
    }
    out
}

/// Daily totals of one member's expenses.
fn member_series(table: &Table, name: &str) -> String {
    let (Some(name_col), Some(date_col), Some(value_col)) = (
        table.column("nome"),
        table.column("dataDocumento"),
        table.column(EXPENSE_VALUE_COLUMN),
    ) else {
        return String::from(
            "_A tabela de despesas precisa das colunas `nome`, `dataDocumento` e `valorDocumento`._\n",
        );
    };
    let rows = table
        .rows
        .iter()
        .filter(|row| row.get(name_col).is_some_and(|n| n == name));
    let series = sum_by(rows, date_col, value_col, "dataDocumento");
    if series.is_empty() {
        return format!("_Nenhuma despesa encontrada para {name}._\n");
    }
    markdown_table(&series, MAX_TABLE_ROWS)
}

fn member_totals(table: &Table) -> String {
    let (Some(name_col), Some(value_col)) = (table.column("nome"), table.column(EXPENSE_VALUE_COLUMN))
    else {
        return markdown_table(table, MAX_TABLE_ROWS);
    };
    markdown_table(&sum_by(table.rows.iter(), name_col, value_col, "nome"), MAX_TABLE_ROWS)
}

/// Sum `value_col` per distinct `key_col`, in key order. Unparseable values count as zero.
fn sum_by<'a>(
    rows: impl Iterator<Item = &'a Vec<String>>,
    key_col: usize,
    value_col: usize,
    key_name: &str,
) -> Table {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        let value = row
            .get(value_col)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);
        *totals
            .entry(row.get(key_col).map(String::as_str).unwrap_or_default())
            .or_default() += value;
    }
    let mut out = Table::new(vec![key_name.to_string(), EXPENSE_VALUE_COLUMN.to_string()]);
    out.rows = totals
        .into_iter()
        .map(|(key, total)| vec![key.to_string(), format!("{total:.2}")])
        .collect();
    out
}

/// The propositions table and their summaries.
pub fn propositions(config: &CamaraConfig) -> String {
    let mut out = String::from("# Proposições\n\n");
    match Table::read_csv(&config.propositions_path()) {
        Ok(table) => out.push_str(&markdown_table(&table, MAX_TABLE_ROWS)),
        Err(e) => out.push_str(&notice(&e)),
    }

    out.push_str("\n## Sumarização\n\n");
    match insights::proposition_summaries(&config.propositions_summary_path()) {
        Ok(items) => {
            for item in &items {
                match item {
                    Value::Object(map) => {
                        for (key, value) in map {
                            out.push_str(&format!("- **{key}**: {}\n", display_text(value)));
                        }
                        out.push('\n');
                    }
                    other => {
                        out.push_str(&format!("- {}\n", display_text(other)));
                    }
                }
            }
        }
        Err(e) => out.push_str(&notice(&e)),
    }
    out
}
