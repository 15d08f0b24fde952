use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use version_lens::config::{LOG_ENV, data_dir, db_path};
use version_lens::manifest::{FileManifestSource, ManifestSource};
use version_lens::version::cache::Cache;
use version_lens::version::registries::npm::{DEFAULT_BASE_URL, NpmRegistry};
use version_lens::version::resolver::{resolve_dependencies, summarize};

#[derive(Parser)]
#[command(name = "version-lens")]
#[command(version, about = "Language Server annotating outdated package.json dependencies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a package.json once and print the dependency report as JSON
    Check {
        /// Path to the package.json
        path: PathBuf,

        /// Ignore cached latest versions and query the registry for every dependency
        #[arg(long)]
        force: bool,

        /// Base URL of the npm registry
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        registry_url: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.command {
        None => runtime.block_on(version_lens::lsp::server::run_server()),
        Some(Command::Check {
            path,
            force,
            registry_url,
        }) => runtime.block_on(run_check(&path, force, &registry_url)),
    }
}

async fn run_check(path: &Path, force: bool, registry_url: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let manifest = FileManifestSource
        .load(path)
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;
    let cache = Cache::new(&db_path()).context("Failed to open version cache")?;
    let registry = NpmRegistry::new(registry_url);

    let report =
        resolve_dependencies(&manifest.merged_dependencies(), &cache, &registry, force).await;

    let (outdated, most_severe) = summarize(&report);
    match most_severe {
        Some(kind) => info!(
            "{} of {} dependencies outdated, most severe: {}",
            outdated,
            report.len(),
            kind
        ),
        None => info!("No comparable dependencies in {}", path.display()),
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
