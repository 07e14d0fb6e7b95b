//! # camara_rag (library root)
//!
//! Collects open data from the Brazilian Chamber of Deputies and answers
//! questions about it with retrieval-augmented generation.
//!
//! The pipeline, in the order data flows through it:
//!
//! - [`collector`]: roster, expenses and propositions from the upstream API,
//!   persisted as CSV [`tables`].
//! - [`insights`]: the JSON insight documents produced alongside the tables.
//! - [`corpus`]: tables and documents flattened into one ordered list of texts.
//! - [`embedding`] and [`vector_store`]: sentence embeddings and an exact L2
//!   index over the corpus.
//! - [`assistant`]: retrieve, fill the [`template`], call the generative model.
//!
//! [`views`], [`pretty`] and [`commands`] make up the CLI; [`config`] and
//! [`error`] are shared by everything.

use directories::ProjectDirs;
use std::error::Error;

pub mod assistant;
pub mod collector;
pub mod commands;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod insights;
pub mod pretty;
pub mod tables;
pub mod template;
pub mod vector_store;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

/// Return the per-platform configuration directory.
///
/// The directory is **not** created by this function; callers that need it should
/// create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
///
/// # Examples
/// ```rust
/// let cfg = camara_rag::config_dir().expect("has a config dir");
/// println!("config at {}", cfg.display());
/// ```
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("br", "camara-rag", "camara")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
