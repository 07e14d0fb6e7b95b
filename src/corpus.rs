//! # Corpus
//!
//! Flattens the collected tables and the insight documents into one ordered
//! list of entries, the unit the assistant retrieves from.
//!
//! Entries are a tagged variant ([`CorpusEntry`]): a row of cells, a scalar, or
//! an opaque JSON value. Normalisation turns each into a single string and drops
//! the opaque ones, so a [`Corpus`] never holds more texts than the builder saw
//! entries. The corpus keeps every surviving entry next to its text; position
//! `i` in [`Corpus::texts`] is position `i` in the embedding matrix and in
//! [`Corpus::entries`].

use serde_json::{Number, Value};
use tracing::{info, warn};

use crate::{
    config::CamaraConfig,
    error::DataError,
    insights::{self, ExpenseInsights, display_text},
    tables::Table,
};

/// A single-value entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(Number),
}

/// One item of the corpus before normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum CorpusEntry {
    /// A table row, or a headline/text pair.
    List(Vec<String>),
    Scalar(Scalar),
    /// Anything else; never reaches the index.
    Opaque(Value),
}

impl CorpusEntry {
    pub fn text(s: impl Into<String>) -> Self {
        CorpusEntry::Scalar(Scalar::Text(s.into()))
    }

    /// Classify a JSON value the way the documents are flattened.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => CorpusEntry::List(items.iter().map(display_text).collect()),
            Value::String(s) => CorpusEntry::text(s),
            Value::Number(n) => CorpusEntry::Scalar(Scalar::Number(n)),
            Value::Bool(b) => CorpusEntry::text(b.to_string()),
            other => CorpusEntry::Opaque(other),
        }
    }

    /// The text that gets embedded, or `None` for opaque entries.
    pub fn normalize(&self) -> Option<String> {
        match self {
            CorpusEntry::List(cells) => Some(cells.join(" ")),
            CorpusEntry::Scalar(Scalar::Text(s)) => Some(s.clone()),
            CorpusEntry::Scalar(Scalar::Number(n)) => Some(n.to_string()),
            CorpusEntry::Opaque(_) => None,
        }
    }

    /// The text placed in a prompt when this entry is retrieved.
    ///
    /// Lists are space-joined and strings pass through; numbers are indexed
    /// but never quoted back as context.
    pub fn context_text(&self) -> Option<String> {
        match self {
            CorpusEntry::List(cells) => Some(cells.join(" ")),
            CorpusEntry::Scalar(Scalar::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

/// Accumulates entries in corpus order.
#[derive(Debug, Default)]
pub struct CorpusBuilder {
    entries: Vec<CorpusEntry>,
}

impl CorpusBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// One list entry per row.
    pub fn push_table(&mut self, table: &Table) -> &mut Self {
        self.entries
            .extend(table.rows.iter().cloned().map(CorpusEntry::List));
        self
    }

    /// Headline/text pairs from `insights`, then every conclusion and limitation.
    pub fn push_expense_insights(&mut self, doc: &ExpenseInsights) -> &mut Self {
        for insight in &doc.insights {
            match insight {
                Value::Object(map) => {
                    for (key, value) in map {
                        self.entries
                            .push(CorpusEntry::List(vec![key.clone(), display_text(value)]));
                    }
                }
                other => self.entries.push(CorpusEntry::from_json(other.clone())),
            }
        }
        self.entries.extend(
            doc.conclusoes
                .iter()
                .chain(&doc.limitacoes)
                .cloned()
                .map(CorpusEntry::from_json),
        );
        self
    }

    /// The whole distribution document as a single entry.
    pub fn push_document(&mut self, doc: Value) -> &mut Self {
        self.entries.push(CorpusEntry::from_json(doc));
        self
    }

    /// A document's raw text as a single entry.
    pub fn push_raw_text(&mut self, text: String) -> &mut Self {
        self.entries.push(CorpusEntry::text(text));
        self
    }

    /// Entries gathered so far, before normalisation.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// Run the normalisation pass.
    pub fn build(self) -> Corpus {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut texts = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            if let Some(text) = entry.normalize() {
                texts.push(text);
                entries.push(entry);
            }
        }
        Corpus { entries, texts }
    }
}

/// The normalised corpus. `entries[i]` and `texts[i]` describe the same record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    texts: Vec<String>,
}

impl Corpus {
    /// Assemble the corpus from the files under `config.data_dir`.
    ///
    /// The three tables are required. Insight documents are optional: a missing
    /// or unreadable document is logged and left out.
    pub fn load(config: &CamaraConfig) -> Result<Self, DataError> {
        let members = Table::read_csv(&config.members_path())?;
        let expenses = Table::read_csv(&config.expenses_path())?;
        let propositions = Table::read_csv(&config.propositions_path())?;

        let mut builder = CorpusBuilder::new();
        builder
            .push_table(&members)
            .push_table(&expenses)
            .push_table(&propositions);

        match ExpenseInsights::load(&config.expense_insights_path()) {
            Ok(doc) => {
                builder.push_expense_insights(&doc);
            }
            Err(e) => warn!("Skipping expense insights: {e}"),
        }
        match insights::read_json(&config.distribution_insights_path()) {
            Ok(doc) => {
                builder.push_document(doc);
            }
            Err(e) => warn!("Skipping distribution insights: {e}"),
        }
        match insights::read_text(&config.propositions_summary_path()) {
            Ok(text) => {
                builder.push_raw_text(text);
            }
            Err(e) => warn!("Skipping propositions summary: {e}"),
        }

        let gathered = builder.entries().len();
        let corpus = builder.build();
        info!(
            "Corpus ready: {} entries ({} dropped during normalisation)",
            corpus.len(),
            gathered - corpus.len()
        );
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Normalised texts, in index order.
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&CorpusEntry> {
        self.entries.get(index)
    }

    /// Prompt text for the entry at `index`, if it has one.
    pub fn context(&self, index: usize) -> Option<String> {
        self.entry(index).and_then(CorpusEntry::context_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn table(rows: &[&[&str]]) -> Table {
        Table {
            columns: (0..rows.first().map_or(0, |r| r.len()))
                .map(|i| format!("c{i}"))
                .collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_normalize_per_variant() {
        let list = CorpusEntry::List(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(list.normalize().as_deref(), Some("a b c"));

        let number = CorpusEntry::from_json(json!(5));
        assert_eq!(number.normalize().as_deref(), Some("5"));

        let object = CorpusEntry::from_json(json!({"k": "v"}));
        assert_eq!(object.normalize(), None);
        assert_eq!(CorpusEntry::from_json(json!(null)).normalize(), None);
    }

    #[test]
    fn test_context_text_drops_numbers_and_opaque() {
        assert_eq!(
            CorpusEntry::from_json(json!(["x", 1])).context_text().as_deref(),
            Some("x 1")
        );
        assert_eq!(
            CorpusEntry::text("livre").context_text().as_deref(),
            Some("livre")
        );
        assert_eq!(CorpusEntry::from_json(json!(2.5)).context_text(), None);
        assert_eq!(CorpusEntry::from_json(json!({})).context_text(), None);
    }

    #[test]
    fn test_end_to_end_entry_count() {
        let members = table(&[&["1", "Ana"], &["2", "Bruno"], &["3", "Carla"]]);
        let expenses = crate::collector::aggregate_expenses(
            serde_json::from_value(json!([
                {"dataDocumento": "2024-08-02", "nome": "Ana", "tipoDespesa": "COMBUSTÍVEIS", "valorDocumento": 10.0, "deputado_id": 1},
                {"dataDocumento": "2024-08-02", "nome": "Ana", "tipoDespesa": "COMBUSTÍVEIS", "valorDocumento": 5.5, "deputado_id": 1}
            ]))
            .unwrap(),
        );
        assert_eq!(expenses.len(), 1);

        let insights = ExpenseInsights::from_value(
            &json!({"insights": ["x"], "conclusoes": ["y"], "limitacoes": []}),
            std::path::Path::new("insights.json"),
        )
        .unwrap();

        let mut builder = CorpusBuilder::new();
        builder
            .push_table(&members)
            .push_table(&expenses)
            .push_table(&Table::default())
            .push_expense_insights(&insights);

        assert_eq!(builder.entries().len(), 3 + 1 + 1 + 1);
        let corpus = builder.build();
        assert_eq!(corpus.len(), 6);
        assert_eq!(corpus.texts()[0], "1 Ana");
        assert_eq!(corpus.texts()[4], "x");
        assert_eq!(corpus.texts()[5], "y");
    }

    #[test]
    fn test_length_is_rows_plus_salvageable_entries() {
        let members = table(&[&["1", "Ana"], &["2", "Bruno"]]);
        let expenses = table(&[&["2024-08-01", "Ana", "PASSAGEM", "100"]]);
        let propositions = table(&[&["PL 1/2024"], &["PEC 2/2024"], &["PL 3/2024"]]);
        let insights = ExpenseInsights {
            insights: vec![json!({"Maior gasto": "Passagens", "Menor": "Correios"}), json!("solto")],
            conclusoes: vec![json!("c1"), json!({"descartado": true})],
            limitacoes: vec![json!("l1"), json!(null)],
        };

        let mut builder = CorpusBuilder::new();
        builder
            .push_table(&members)
            .push_table(&expenses)
            .push_table(&propositions)
            .push_expense_insights(&insights)
            .push_document(json!({"insights": ["distribuição"]}))
            .push_raw_text("{\"sumarizacao_proposicoes\": []}".to_string());

        let gathered = builder.entries().len();
        let corpus = builder.build();

        let rows = 2 + 1 + 3;
        // two pairs + "solto" + "c1" + "l1" + raw summary text
        let salvageable = 2 + 1 + 1 + 1 + 1;
        assert_eq!(corpus.len(), rows + salvageable);
        assert!(corpus.len() <= gathered);
        assert_eq!(corpus.texts()[6], "Maior gasto Passagens");
        assert_eq!(corpus.entries().len(), corpus.texts().len());
    }

    #[test]
    fn test_order_is_preserved_and_entries_stay_aligned() {
        let mut builder = CorpusBuilder::new();
        builder
            .push_raw_text("primeiro".into())
            .push_document(json!({"opaco": 1}))
            .push_raw_text("segundo".into());
        let corpus = builder.build();

        assert_eq!(corpus.texts(), ["primeiro", "segundo"]);
        for (i, text) in corpus.texts().iter().enumerate() {
            assert_eq!(corpus.entry(i).unwrap().normalize().as_ref(), Some(text));
        }
        assert_eq!(corpus.context(1).as_deref(), Some("segundo"));
    }

    #[test]
    fn test_load_degrades_without_insight_documents() {
        let dir = tempdir().unwrap();
        let config = CamaraConfig {
            data_dir: dir.path().to_path_buf(),
            ..CamaraConfig::default()
        };
        table(&[&["1", "Ana"]]).write_csv(&config.members_path()).unwrap();
        table(&[&["2024-08-01", "Ana", "PASSAGEM", "100"]])
            .write_csv(&config.expenses_path())
            .unwrap();
        table(&[&["PL 1/2024"]])
            .write_csv(&config.propositions_path())
            .unwrap();
        fs::write(config.expense_insights_path(), "{ not json").unwrap();

        let corpus = Corpus::load(&config).unwrap();
        assert_eq!(corpus.len(), 3);
    }

    #[test]
    fn test_load_requires_core_tables() {
        let dir = tempdir().unwrap();
        let config = CamaraConfig {
            data_dir: dir.path().to_path_buf(),
            ..CamaraConfig::default()
        };
        assert!(matches!(
            Corpus::load(&config),
            Err(DataError::MissingFile { .. })
        ));
    }
}
