use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use depsync::apply::ShellRunner;
use depsync::config::SyncConfig;
use depsync::notify::NotifierSet;
use depsync::orchestrator::Orchestrator;
use depsync::version::cache::Cache;
use depsync::version::registries::NpmRegistry;

#[derive(Parser)]
#[command(name = "depsync")]
#[command(version, about = "Dependency version monitoring and guarded upgrades")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "depsync.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full sync cycle across all configured projects
    Sync,
    /// Check available updates for one project, or list projects
    Check { project: Option<String> },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SyncConfig::load(&cli.config)
        .with_context(|| format!("Cannot load configuration from {:?}", cli.config))?;

    let db_path = config.cache_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create cache directory {:?}", parent))?;
    }
    let cache = Arc::new(Cache::new(&db_path).context("Cannot open version cache")?);

    let notifier = Arc::new(NotifierSet::from_config(&config.notifications));
    let orchestrator = Orchestrator::new(
        config.clone(),
        cache,
        Arc::new(NpmRegistry::default()),
        Arc::new(ShellRunner),
        notifier,
    );

    match cli.command.unwrap_or(Command::Sync) {
        Command::Sync => {
            orchestrator.run_full_sync().await;
        }
        Command::Check { project: None } => {
            println!("Configured projects:");
            for project in &config.projects {
                println!("  {}", project.name);
            }
        }
        Command::Check {
            project: Some(name),
        } => {
            let report = orchestrator.check_project(&name).await?;

            if report.updates.is_empty() {
                println!("{} is up to date", name);
            } else {
                println!("Available updates for {}:", name);
                for update in &report.updates {
                    println!(
                        "  {} {} -> {} [{}]{}",
                        update.package,
                        update.current,
                        update.latest,
                        update.change_type,
                        if update.has_breaking_changes {
                            " breaking"
                        } else {
                            ""
                        }
                    );
                    println!("    strategy: {}, {}", update.strategy, update.recommendation);
                }
            }

            if !report.service_health.is_empty() {
                println!("Service health:");
                for health in &report.service_health {
                    println!("  {}: {:?}", health.service, health.status);
                }
            }
        }
    }

    Ok(())
}
