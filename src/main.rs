mod init;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use manimate_core::bootstrap::AppBuilder;
use manimate_index::KeywordScorer;

#[derive(Parser)]
#[command(name = "manimate", version)]
#[command(about = "Retrieval-augmented context for Manim code generation")]
struct Cli {
    /// Config file (default: $MANIMATE_CONFIG, then config/default.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the API and examples collections, reusing a populated index
    Index {
        /// Drop both collections and re-embed everything
        #[arg(long)]
        rebuild: bool,
    },
    /// Semantic search over both collections
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        /// API chunks to return (default: retrieval.top_k_api)
        #[arg(long)]
        top_k_api: Option<usize>,

        /// Examples to return (default: retrieval.top_k_examples)
        #[arg(long)]
        top_k_examples: Option<usize>,
    },
    /// Assemble the reference context for a generation prompt
    Context {
        #[arg(value_name = "PROMPT")]
        prompt: String,

        /// Use this curated example instead of searching (repeatable)
        #[arg(long = "example", value_name = "ID")]
        examples: Vec<String>,

        /// Print the full context as JSON instead of the prompt section
        #[arg(long)]
        json: bool,
    },
    /// List curated examples, show one, or rank them by keyword
    Examples {
        #[arg(long, conflicts_with = "query")]
        id: Option<String>,

        /// Rank examples with the keyword scorer
        #[arg(long)]
        query: Option<String>,
    },
    /// Show per-collection document counts
    Stats,
    /// Write a config file with default settings
    Init(init::InitArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let load = || AppBuilder::load(cli.config.as_deref());

    match cli.command {
        Command::Index { rebuild } => {
            let retriever = load()?.build_retriever()?;
            let counts = retriever.indexer().build_index(rebuild).await?;
            print_json(&counts)?;
        }
        Command::Search {
            ref query,
            top_k_api,
            top_k_examples,
        } => {
            let app = load()?;
            let retriever = app.build_retriever()?;
            retriever
                .initialize(false)
                .await
                .context("retriever initialization failed")?;
            let config = &app.config().retrieval;
            let results = retriever
                .search(
                    query,
                    top_k_api.unwrap_or(config.top_k_api),
                    top_k_examples.unwrap_or(config.top_k_examples),
                )
                .await?;
            print_json(&results)?;
        }
        Command::Context {
            ref prompt,
            ref examples,
            json,
        } => {
            let app = load()?;
            let retriever = app.build_retriever()?;
            if let Err(e) = retriever.initialize(false).await {
                tracing::warn!(error = %e, "continuing without semantic retrieval");
            }
            let assembler = app.build_assembler(retriever)?;
            let context = assembler.assemble(prompt, examples).await;
            if json {
                print_json(&context)?;
            } else {
                print!("{}", context.to_prompt_section());
            }
        }
        Command::Examples { ref id, ref query } => {
            let app = load()?;
            let library = app.load_library()?;
            let scorer = KeywordScorer::new(app.config().retrieval.fallback_max_results);
            if let Some(id) = id {
                let example = library
                    .get(id)
                    .with_context(|| format!("no curated example with id {id:?}"))?;
                print_json(example)?;
            } else if let Some(q) = query {
                let ranked: Vec<_> = scorer
                    .search(library.list(), q)
                    .into_iter()
                    .map(|e| example_summary(e, Some(scorer.score(e, q))))
                    .collect();
                print_json(&ranked)?;
            } else {
                let listed: Vec<_> = library
                    .list()
                    .iter()
                    .map(|e| example_summary(e, None))
                    .collect();
                print_json(&listed)?;
            }
        }
        Command::Stats => {
            let retriever = load()?.build_retriever()?;
            let stats = retriever.indexer().stats().await?;
            print_json(&stats)?;
        }
        Command::Init(ref args) => init::run(args)?,
    }

    Ok(())
}

fn example_summary(example: &manimate_index::Example, score: Option<u32>) -> serde_json::Value {
    let mut value = serde_json::json!({
        "id": example.id,
        "name": example.name,
        "tags": example.tags,
        "difficulty": example.difficulty,
        "description": example.description,
    });
    if let Some(score) = score {
        value["score"] = score.into();
    }
    value
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_subscriber() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
