//! # Insight documents
//!
//! Loading for the JSON documents produced upstream of this tool:
//!
//! | file | keys read |
//! |------|-----------|
//! | `insights_despesas_deputados.json` | `insights` (required), `conclusoes`, `limitacoes` |
//! | `insights_distribuicao_deputados.json` | `insights` for display, whole document for the corpus |
//! | `sumarizacao_proposicoes.json` | `sumarizacao_proposicoes` for display, raw text for the corpus |
//!
//! Contents are opaque free text. Every loader reports the three failure kinds
//! separately: [`DataError::MissingFile`], [`DataError::MalformedJson`] and
//! [`DataError::MissingKey`].

use std::{fs, path::Path};

use serde_json::Value;

use crate::error::DataError;

/// Read and parse a JSON document.
pub fn read_json(path: &Path) -> Result<Value, DataError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| DataError::MalformedJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a document as raw text, without parsing it.
pub fn read_text(path: &Path) -> Result<String, DataError> {
    fs::read_to_string(path).map_err(|e| DataError::from_io(path, e))
}

/// Fetch `key` from a document, failing with [`DataError::MissingKey`].
pub fn require_key<'a>(
    doc: &'a Value,
    path: &Path,
    key: &'static str,
) -> Result<&'a Value, DataError> {
    doc.get(key).ok_or_else(|| DataError::MissingKey {
        path: path.to_path_buf(),
        key,
    })
}

fn require_array<'a>(
    doc: &'a Value,
    path: &Path,
    key: &'static str,
) -> Result<&'a Vec<Value>, DataError> {
    require_key(doc, path, key)?
        .as_array()
        .ok_or_else(|| DataError::UnexpectedShape {
            path: path.to_path_buf(),
            key,
            expected: "an array",
        })
}

fn optional_array(doc: &Value, path: &Path, key: &'static str) -> Result<Vec<Value>, DataError> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(_) => require_array(doc, path, key).cloned(),
    }
}

/// The expense insights document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseInsights {
    /// Strings, or objects whose key/value pairs are headline/text.
    pub insights: Vec<Value>,
    pub conclusoes: Vec<Value>,
    pub limitacoes: Vec<Value>,
}

impl ExpenseInsights {
    pub fn load(path: &Path) -> Result<Self, DataError> {
        Self::from_value(&read_json(path)?, path)
    }

    pub fn from_value(doc: &Value, path: &Path) -> Result<Self, DataError> {
        Ok(Self {
            insights: require_array(doc, path, "insights")?.clone(),
            conclusoes: optional_array(doc, path, "conclusoes")?,
            limitacoes: optional_array(doc, path, "limitacoes")?,
        })
    }

    /// `(headline, text)` pairs for display; plain string insights have no headline.
    pub fn pairs(&self) -> Vec<(Option<String>, String)> {
        let mut out = Vec::new();
        for insight in &self.insights {
            match insight {
                Value::Object(map) => {
                    for (key, value) in map {
                        out.push((Some(key.clone()), display_text(value)));
                    }
                }
                other => out.push((None, display_text(other))),
            }
        }
        out
    }
}

/// The `insights` list of the distribution document, for display.
pub fn distribution_insights(path: &Path) -> Result<Vec<String>, DataError> {
    let doc = read_json(path)?;
    Ok(require_array(&doc, path, "insights")?
        .iter()
        .map(display_text)
        .collect())
}

/// The `sumarizacao_proposicoes` list, for display.
pub fn proposition_summaries(path: &Path) -> Result<Vec<Value>, DataError> {
    let doc = read_json(path)?;
    require_array(&doc, path, "sumarizacao_proposicoes").cloned()
}

/// Text form of a JSON value: strings verbatim, everything else as JSON.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
