use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use vizrag_cli::{
    Reply, SessionFactory, Shell, ShellCommand, display_banner, handle_input_with_history,
    print_answer, print_reply, read_masked, report_error,
};
use vizrag_core::{Error, GenerationConfig};
use vizrag_openai::{OpenAIClient, OpenAIConfig};
use vizrag_rag::{DistanceMetric, RagConfig, SessionController};

#[derive(Parser)]
#[command(name = "vizrag")]
#[command(about = "Ask questions about your Power BI HTML Content guide", long_about = None)]
struct Cli {
    /// File to process in one-shot mode (.txt, .md or .csv)
    #[arg(short, long, requires = "question")]
    file: Option<PathBuf>,

    /// Question to answer in one-shot mode
    #[arg(short, long, requires = "file")]
    question: Option<String>,

    /// Number of chunks used as context for each answer
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Similarity metric: cosine or euclidean
    #[arg(long)]
    metric: Option<DistanceMetric>,

    /// Chat model used for answers (defaults to VIZRAG_CHAT_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Upper bound on answer length, in tokens
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_tokens: Option<u32>,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rag_config = rag_config(&cli)?;
    let overrides = GenerationOverrides {
        model: cli.model.clone(),
        max_tokens: cli.max_tokens,
    };
    let mut shell = Shell::new(session_factory(rag_config, overrides));

    match OpenAIConfig::from_env() {
        Ok(config) => shell.set_api_key(&config.api_key)?,
        Err(Error::MissingCredential(_)) => {}
        Err(e) => return Err(anyhow!(e.guidance())),
    }

    if let (Some(file), Some(question)) = (cli.file, cli.question) {
        startup_key(&mut shell);
        return run_once(&mut shell, file, question).await;
    }

    display_banner();
    startup_key(&mut shell);

    let mut history = Vec::new();
    loop {
        let input = handle_input_with_history(&mut history).await?;

        let command = match ShellCommand::parse(&input) {
            Ok(command) => command,
            Err(e) => {
                report_error(&e);
                continue;
            }
        };

        if matches!(command, ShellCommand::Process | ShellCommand::Ask(_)) {
            println!("{} Working...", "🤖".blue());
        }

        match shell.dispatch(command).await {
            Ok(Reply::Exit) => {
                print_reply(&Reply::Exit);
                break;
            }
            Ok(Reply::KeyRequested) => ask_for_key(&mut shell),
            Ok(reply) => print_reply(&reply),
            Err(e) => report_error(&e),
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn rag_config(cli: &Cli) -> Result<RagConfig> {
    let config = RagConfig::from_env().map_err(|e| anyhow!(e.guidance()))?;

    let mut builder = RagConfig::builder()
        .chunk_size(config.chunk_size)
        .chunk_overlap(config.chunk_overlap)
        .top_k(cli.top_k.unwrap_or(config.top_k))
        .embedding_batch_size(config.embedding_batch_size)
        .metric(config.metric);
    if let Some(metric) = cli.metric {
        builder = builder.metric(metric);
    }

    builder.build().map_err(|e| anyhow!(e.guidance()))
}

/// Answer settings given on the command line
#[derive(Debug, Clone, Default)]
struct GenerationOverrides {
    model: Option<String>,
    max_tokens: Option<u32>,
}

/// Settings for every answer: the configured chat model and the provider
/// defaults, with command line overrides applied on top
fn generation_config(chat_model: &str, overrides: &GenerationOverrides) -> GenerationConfig {
    let defaults = GenerationConfig::default();
    GenerationConfig {
        model_id: overrides
            .model
            .clone()
            .unwrap_or_else(|| chat_model.to_string()),
        max_tokens: overrides.max_tokens.unwrap_or(defaults.max_tokens),
        temperature: defaults.temperature,
    }
}

/// One OpenAI-compatible client serves as both embedder and generator
fn session_factory(rag_config: RagConfig, overrides: GenerationOverrides) -> SessionFactory {
    Box::new(move |key: &str| {
        let config = OpenAIConfig::from_lookup(|name| match name {
            "VIZRAG_API_KEY" => Some(key.to_string()),
            _ => env::var(name).ok(),
        })?;
        let generation = generation_config(&config.chat_model, &overrides);
        let client =
            Arc::new(OpenAIClient::new(config)?.with_generation_config(generation.clone()));
        Ok(SessionController::new(rag_config.clone(), client.clone(), client)
            .with_generation_config(generation))
    })
}

/// Without a key in the environment, ask once if someone is at the terminal
fn startup_key(shell: &mut Shell) {
    if shell.has_credential() {
        return;
    }
    if io::stdin().is_terminal() {
        ask_for_key(shell);
    } else {
        warn!("no API key in the environment");
    }
}

fn ask_for_key(shell: &mut Shell) {
    match read_masked("Enter your API key:") {
        Ok(key) if key.trim().is_empty() => {
            warn!("no API key entered");
            println!(
                "{}",
                "No key entered. Use 'key' before processing a file or asking a question."
                    .yellow()
            );
        }
        Ok(key) => match shell.set_api_key(&key) {
            Ok(()) => println!("{} API key set", "🔐".green()),
            Err(e) => report_error(&e),
        },
        Err(e) => report_error(&e),
    }
}

async fn run_once(shell: &mut Shell, file: PathBuf, question: String) -> Result<()> {
    let commands = [
        ShellCommand::Upload(file),
        ShellCommand::Process,
        ShellCommand::Ask(question),
    ];

    for command in commands {
        match shell.dispatch(command).await {
            Ok(Reply::Answer(turn)) => print_answer(&turn),
            Ok(_) => {}
            Err(e) => return Err(anyhow!(e.guidance())),
        }
    }

    Ok(())
}
