//! # Error types
//!
//! Typed failures for every stage of the pipeline. The shell decides how each
//! kind is surfaced:
//!
//! - [`DataError`] covers persisted artifacts (tables and JSON documents). The
//!   views print these inline; each kind gets its own message so a missing file
//!   never reads like a malformed one.
//! - [`CollectError`] covers upstream API calls made by the collector.
//! - [`IndexError`] and [`AssistantError`] cover the retrieval pipeline. The
//!   chat surface collapses all of them into [`GENERIC_ASSISTANT_ERROR`].

use std::path::PathBuf;

use thiserror::Error;

/// The only message the chat surface ever shows when the assistant fails.
pub const GENERIC_ASSISTANT_ERROR: &str = "Ocorreu um erro ao processar a resposta.";

/// Failure reading or writing a persisted artifact.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("could not decode JSON in {}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("key '{key}' not found in {}", path.display())]
    MissingKey { path: PathBuf, key: &'static str },

    #[error("key '{key}' in {} does not hold {expected}", path.display())]
    UnexpectedShape {
        path: PathBuf,
        key: &'static str,
        expected: &'static str,
    },

    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("malformed table {}: {source}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    /// Map an I/O error, turning `NotFound` into [`DataError::MissingFile`].
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            DataError::MissingFile { path }
        } else {
            DataError::Io { path, source }
        }
    }
}

/// Failure talking to the upstream open-data API.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upstream answered {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode upstream payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Failure building or querying the nearest-neighbour index.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    #[error("the corpus is empty, nothing to index")]
    EmptyCorpus,

    #[error("k must be at least 1")]
    InvalidK,

    #[error("asked for {k} neighbours but the index only holds {available}")]
    InsufficientEntries { k: usize, available: usize },

    #[error("vector {row} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Failure anywhere in the retrieve → prompt → generate chain.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("the model returned no text")]
    EmptyResponse,
}

impl AssistantError {
    /// The text shown to the user, whatever went wrong.
    pub fn user_message(&self) -> &'static str {
        GENERIC_ASSISTANT_ERROR
    }
}
