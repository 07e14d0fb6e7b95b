//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use camara_rag::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Commands::Ask { question } => println!("asking: {question}"),
//!     _ => {}
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Configuration file. Defaults to ./data/config.yaml, then the user config directory.
    #[arg(long, short = 'c', global = true, env = "CAMARA_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Which upstream dataset to collect.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dataset {
    Members,
    Expenses,
    Propositions,
    /// Members, then expenses, then propositions.
    All,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Write a default configuration file.
    Init,

    /// Fetch data from the Chamber of Deputies API into the data directory.
    #[clap(name = "collect")]
    Collect {
        #[arg(value_enum, default_value_t = Dataset::All)]
        dataset: Dataset,
    },

    /// Roster breakdown and distribution insights.
    Overview,

    /// Expense insights and totals, or one member's daily series.
    #[clap(name = "expenses", alias = "e")]
    Expenses {
        /// Member name, exactly as in the roster.
        #[arg(long, short = 'm')]
        member: Option<String>,
    },

    /// Propositions table and summaries.
    Propositions,

    /// Ask the assistant a single question.
    #[clap(name = "ask", alias = "a")]
    Ask { question: String },

    /// Chat with the assistant. Type `sair` or `exit` to leave.
    #[clap(name = "chat", alias = "i")]
    Chat,
}
