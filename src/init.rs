use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use manimate_core::config::{Config, EmbeddingProviderKind, StoreBackend};

#[derive(Debug, Clone, Args)]
pub(crate) struct InitArgs {
    /// Where to write the config
    #[arg(long, short, default_value = "config/default.toml")]
    pub(crate) output: PathBuf,

    /// Embedding backend: voyage or ollama
    #[arg(long, value_parser = parse_provider)]
    pub(crate) provider: Option<EmbeddingProviderKind>,

    /// Vector store backend: qdrant or memory
    #[arg(long, value_parser = parse_backend)]
    pub(crate) backend: Option<StoreBackend>,

    /// Root of the installed manim package to chunk
    #[arg(long, value_name = "PATH")]
    pub(crate) source_root: Option<PathBuf>,

    /// Replace an existing file
    #[arg(long)]
    pub(crate) force: bool,
}

fn parse_provider(value: &str) -> Result<EmbeddingProviderKind, String> {
    serde_json::from_value(serde_json::Value::String(value.to_owned()))
        .map_err(|_| format!("unknown embedding provider: {value}"))
}

fn parse_backend(value: &str) -> Result<StoreBackend, String> {
    serde_json::from_value(serde_json::Value::String(value.to_owned()))
        .map_err(|_| format!("unknown store backend: {value}"))
}

pub(crate) fn build_config(args: &InitArgs) -> Config {
    let mut config = Config::default();
    if let Some(provider) = args.provider {
        config.embedding.provider = provider;
    }
    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    if let Some(root) = &args.source_root {
        config.index.source_root.clone_from(root);
    }
    config
}

pub(crate) fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config = build_config(args);
    write_config(&config, &args.output, args.force)?;
    println!("Config written to {}", args.output.display());
    print_next_steps(&config, &args.output);
    Ok(())
}

fn write_config(config: &Config, path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml_str = toml::to_string_pretty(config).context("failed to serialize config")?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml_str)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn print_next_steps(config: &Config, path: &Path) {
    println!("\nNext steps:");
    match config.embedding.provider {
        EmbeddingProviderKind::Voyage => {
            println!("  1. export VOYAGE_API_KEY=<key from https://dash.voyageai.com/>");
        }
        other => println!("  1. Make sure the {} server is running", other.as_str()),
    }
    println!("  2. Run: manimate --config {} index", path.display());
    println!("  3. Then: manimate --config {} context \"<prompt>\"", path.display());
}
