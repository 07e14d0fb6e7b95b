//! Main module for the `camara` CLI.
//!
//! Parses the command line, resolves the configuration file and dispatches to
//! the collector, the views or the assistant.
//!
//! # Examples
//!
//! ```sh
//! camara init
//! camara collect all
//! camara expenses --member "Ana Silva"
//! camara ask "Qual partido tem mais deputados?"
//! camara chat
//! ```

use camara_rag::{
    assistant::{AssistantSession, OpenAiGenerator, SessionState},
    collector::Collector,
    commands::{Cli, Commands, Dataset},
    config::{self, CamaraConfig},
    config_dir,
    corpus::Corpus,
    embedding::SentenceEmbeddingsModel,
    pretty,
    template::{self, PromptTemplate},
    views,
};
use clap::Parser;
use once_cell::sync::OnceCell;
use std::{
    error::Error,
    io::{self, BufRead},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

static TRACING: OnceCell<()> = OnceCell::new();

type Session = AssistantSession<SentenceEmbeddingsModel, OpenAiGenerator>;

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt::init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => config_dir()?.join("config.yaml"),
        };
        config::write_config(&CamaraConfig::default(), &path)?;
        println!("Configuração criada em {}", path.display());
        return Ok(());
    }

    let config = load_or_default(&config_path(cli.config)?)?;
    debug!("Config loaded: {:?}", config);

    match cli.command {
        Commands::Init => {}
        Commands::Collect { dataset } => collect(&config, dataset).await?,
        Commands::Overview => pretty::print_pretty(&views::overview(&config))?,
        Commands::Expenses { member } => {
            pretty::print_pretty(&views::expenses(&config, member.as_deref()))?
        }
        Commands::Propositions => pretty::print_pretty(&views::propositions(&config))?,
        Commands::Ask { question } => {
            let mut session = open_session(&config)?;
            ask(&mut session, &question).await?;
        }
        Commands::Chat => {
            let mut session = open_session(&config)?;
            chat(&mut session).await?;
        }
    }

    Ok(())
}

/// `--config` / `CAMARA_CONFIG`, else `./data/config.yaml` when present, else
/// the user config directory.
fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let local = PathBuf::from("data").join("config.yaml");
    if local.is_file() {
        return Ok(local);
    }
    Ok(config_dir()?.join("config.yaml"))
}

fn load_or_default(path: &Path) -> Result<CamaraConfig, Box<dyn Error>> {
    if path.is_file() {
        return config::load_config(path);
    }
    warn!(
        "No config at {}, using defaults (run `camara init` to create one)",
        path.display()
    );
    Ok(CamaraConfig::default())
}

async fn collect(config: &CamaraConfig, dataset: Dataset) -> Result<(), Box<dyn Error>> {
    let report = Collector::from_config(config).collect(dataset).await;

    if let Some(n) = report.members {
        println!("{n} deputados salvos em {}", config.members_path().display());
    }
    if let Some(run) = &report.expenses {
        println!(
            "{} linhas de despesas salvas em {} ({} de {} deputados falharam)",
            run.rows,
            config.expenses_path().display(),
            run.failed.len(),
            run.members
        );
    }
    if let Some(n) = report.propositions {
        println!("{n} proposições salvas em {}", config.propositions_path().display());
    }

    if report.is_complete() {
        return Ok(());
    }
    let failed: Vec<String> = report
        .failed
        .iter()
        .map(|(dataset, err)| format!("{dataset:?}: {err}"))
        .collect();
    Err(format!("collection incomplete ({})", failed.join("; ")).into())
}

/// Load the corpus, the embedding model and the generator.
///
/// The index itself is built on the first question.
fn open_session(config: &CamaraConfig) -> Result<Session, Box<dyn Error>> {
    let corpus = Corpus::load(config)?;
    let template = match &config.template_path {
        Some(path) => template::load_template(path)?,
        None => PromptTemplate::default(),
    };
    let generator = OpenAiGenerator::from_config(config)?;

    let bar = pretty::spinner("Carregando o modelo de embeddings…");
    let embedder = SentenceEmbeddingsModel::load(&config.embedding_model, &config.embedding_cache_dir);
    bar.finish_and_clear();
    let embedder = embedder.map_err(|e| e.to_string())?;

    info!("Session opened with {} corpus entries", corpus.len());
    Ok(AssistantSession::new(corpus, embedder, generator, template).with_top_k(config.top_k))
}

async fn ask(session: &mut Session, question: &str) -> Result<(), Box<dyn Error>> {
    let message = match session.state() {
        SessionState::Ready => "Consultando o assistente…",
        _ => "Indexando a base de dados…",
    };
    let bar = pretty::spinner(message);
    let reply = session.reply(question).await;
    bar.finish_and_clear();
    pretty::print_pretty(&reply)
}

async fn chat(session: &mut Session) -> Result<(), Box<dyn Error>> {
    pretty::print_pretty("# Assistente da Câmara\n\nDigite `sair` para encerrar.")?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        pretty::print_prompt()?;
        let line = lines.next().transpose()?;
        pretty::reset_colors()?;

        let Some(line) = line else { break };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "sair" | "exit") {
            break;
        }
        ask(session, question).await?;
    }
    Ok(())
}
