//! This module provides functionality for loading and handling the application's configuration.
//!
//! It defines the `CamaraConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a YAML file. Every
//! field has a default, so a partial file (or an empty one) is valid.
//!
//! # Examples
//!
//! Loading the configuration from a file:
//!
//! ```no_run
//! use camara_rag::config::{CamaraConfig, load_config};
//!
//! let config: CamaraConfig = load_config("data/config.yaml").unwrap();
//! println!("{}", config.members_path().display());
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    env,
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use tracing::*;

/// Environment variable consulted when `api_key` is absent from the file.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Represents the application's configuration.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(default)]
pub struct CamaraConfig {
    /// Credential for the hosted generative model. Falls back to `GEMINI_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible chat endpoint.
    pub api_base: String,

    /// The name of the model used to generate answers.
    pub model: String,

    /// Hugging Face repository of the sentence embedding model.
    pub embedding_model: String,

    /// Where downloaded embedding weights are cached.
    pub embedding_cache_dir: PathBuf,

    /// Directory holding the collected tables and the insight documents.
    pub data_dir: PathBuf,

    /// Root of the Chamber of Deputies open-data API.
    pub upstream_base_url: String,

    // First day of the collected range (`dataInicio`).
    pub date_start: NaiveDate,

    // Last day of the collected range (`dataFim`).
    pub date_end: NaiveDate,

    /// How many corpus entries are retrieved per question.
    pub top_k: usize,

    /// Text shown at the top of the overview.
    pub overview_summary: String,

    /// Optional YAML file overriding the prompt template.
    pub template_path: Option<PathBuf>,
}

impl Default for CamaraConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai/".to_string(),
            model: "gemini-1.5-flash".to_string(),
            embedding_model: "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"
                .to_string(),
            embedding_cache_dir: PathBuf::from("data/embeddings_cache"),
            data_dir: PathBuf::from("data"),
            upstream_base_url: "https://dadosabertos.camara.leg.br/api/v2".to_string(),
            date_start: NaiveDate::from_ymd_opt(2024, 8, 1).unwrap_or_default(),
            date_end: NaiveDate::from_ymd_opt(2024, 8, 30).unwrap_or_default(),
            top_k: 20,
            overview_summary: "Dados abertos da Câmara dos Deputados coletados para agosto de 2024."
                .to_string(),
            template_path: None,
        }
    }
}

impl CamaraConfig {
    /// Reject settings no component can work with.
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.date_start > self.date_end {
            return Err(format!(
                "date_start ({}) is after date_end ({})",
                self.date_start, self.date_end
            )
            .into());
        }
        if self.top_k == 0 {
            return Err("top_k must be at least 1".into());
        }
        Ok(())
    }

    /// The credential for the generative model, from the file or the environment.
    pub fn resolve_api_key(&self) -> Result<String, Box<dyn Error>> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        env::var(API_KEY_ENV)
            .map_err(|_| format!("no api_key configured and {API_KEY_ENV} is not set").into())
    }

    pub fn members_path(&self) -> PathBuf {
        self.data_dir.join("deputados.csv")
    }

    pub fn expenses_path(&self) -> PathBuf {
        self.data_dir.join("serie_despesas_diarias_deputados.csv")
    }

    pub fn propositions_path(&self) -> PathBuf {
        self.data_dir.join("proposicoes_deputados.csv")
    }

    pub fn expense_insights_path(&self) -> PathBuf {
        self.data_dir.join("insights_despesas_deputados.json")
    }

    pub fn distribution_insights_path(&self) -> PathBuf {
        self.data_dir.join("insights_distribuicao_deputados.json")
    }

    pub fn propositions_summary_path(&self) -> PathBuf {
        self.data_dir.join("sumarizacao_proposicoes.json")
    }
}

/// Loads the application's configuration from a YAML file.
///
/// # Returns
///
/// - `Ok(CamaraConfig)`: The loaded, validated configuration.
/// - `Err(Box<dyn Error>)`: The file could not be read, parsed, or failed validation.
pub fn load_config(file: impl AsRef<Path>) -> Result<CamaraConfig, Box<dyn Error>> {
    let file = file.as_ref();
    debug!("Loading config from: {}", file.display());
    let content = fs::read_to_string(file)?;
    let config: CamaraConfig = if content.trim().is_empty() {
        CamaraConfig::default()
    } else {
        serde_yaml::from_str(&content)?
    };
    config.validate()?;
    Ok(config)
}

/// Write `config` as YAML to `file`, creating parent directories.
pub fn write_config(config: &CamaraConfig, file: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir)?;
    }
    info!("Creating config file: {}", file.display());
    fs::write(file, serde_yaml::to_string(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_valid_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
api_key: "example_api_key"
api_base: "http://example.com/v1"
model: "example_model"
data_dir: "/tmp/camara"
date_start: "2024-07-01"
date_end: "2024-07-31"
top_k: 5
"#
        )
        .unwrap();

        let config = load_config(temp_file.path());

        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.api_key.as_deref(), Some("example_api_key"));
        assert_eq!(config.api_base, "http://example.com/v1");
        assert_eq!(config.model, "example_model");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.date_start, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(
            config.members_path(),
            PathBuf::from("/tmp/camara/deputados.csv")
        );
        // untouched fields keep their defaults
        assert_eq!(
            config.upstream_base_url,
            "https://dadosabertos.camara.leg.br/api/v2"
        );
    }

    #[test]
    fn test_load_config_empty_file_is_default() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config, CamaraConfig::default());
        assert_eq!(config.top_k, 20);
    }

    #[test]
    fn test_load_config_invalid_file() {
        let config = load_config("non/existent/path");
        assert!(config.is_err());
    }

    #[test]
    fn test_load_config_invalid_format() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, r#"invalid: config: format"#).unwrap();

        let config = load_config(temp_file.path());

        assert!(config.is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range_and_zero_k() {
        let mut config = CamaraConfig::default();
        config.date_start = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
        assert!(config.validate().is_err());

        let mut config = CamaraConfig::default();
        config.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.yaml");
        let config = CamaraConfig {
            top_k: 7,
            ..CamaraConfig::default()
        };
        write_config(&config, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_resolve_api_key_prefers_file() {
        let config = CamaraConfig {
            api_key: Some("from-file".into()),
            ..CamaraConfig::default()
        };
        assert_eq!(config.resolve_api_key().unwrap(), "from-file");
    }
}
