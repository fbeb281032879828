use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod filter;
mod i18n;
mod jitter;
mod loader;
mod markers;
mod models;
mod pipeline;
mod render;
mod source;

use config::AtlasConfig;
use filter::MapFilter;
use i18n::Language;
use source::{DirectorySource, SheetSource, TableSource};

#[derive(Parser)]
#[command(name = "volunteer-atlas")]
#[command(about = "Privacy-preserving volunteer and delivery request map", long_about = None)]
struct Cli {
    /// Read `Volunteers.csv` and `Requests.csv` from this directory instead of the spreadsheet
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the interactive map document
    Render {
        #[arg(long, default_value = "index.html")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = Language::En)]
        lang: Language,
        /// Seed the location jitter; random per run when omitted
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print loaded and eligible record counts per category
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Preferred day of week (repeatable)
    #[arg(long = "day")]
    days: Vec<String>,
    /// Preferred time of day (repeatable)
    #[arg(long = "time")]
    times: Vec<String>,
    /// Type of service (repeatable)
    #[arg(long = "service")]
    services: Vec<String>,
    /// Reimbursement method (repeatable)
    #[arg(long = "payment")]
    payments: Vec<String>,
}

impl From<FilterArgs> for MapFilter {
    fn from(args: FilterArgs) -> Self {
        MapFilter {
            days: args.days,
            times: args.times,
            services: args.services,
            payments: args.payments,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AtlasConfig::from_env().context("invalid ATLAS_* configuration")?;

    match cli.dir {
        Some(dir) => run(cli.command, &DirectorySource::new(dir), &config).await,
        None => {
            let source = SheetSource::new(config.sheet_id.clone())?;
            run(cli.command, &source, &config).await
        }
    }
}

async fn run<S: TableSource>(command: Commands, source: &S, config: &AtlasConfig) -> anyhow::Result<()> {
    match command {
        Commands::Render {
            out,
            lang,
            seed,
            filter,
        } => {
            let mut rng = match seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            let map_filter = MapFilter::from(filter);
            let document = pipeline::build_map_document(source, config, lang, &map_filter, &mut rng)
                .await
                .with_context(|| format!("failed to build map from {}", source.source_id()))?;

            std::fs::write(&out, &document.html)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(degraded = document.degraded, "map written");

            if document.degraded {
                println!("Source unavailable; wrote empty map to {}.", out.display());
            } else {
                for (category, count) in &document.marker_counts {
                    println!("- {}: {count} markers", category.table_name());
                }
                println!("Map written to {}.", out.display());
            }
        }
        Commands::Summary { filter } => {
            let map_filter = MapFilter::from(filter);
            let summaries = pipeline::summarize(source, &map_filter)
                .await
                .with_context(|| format!("failed to load {}", source.source_id()))?;

            if !map_filter.is_empty() {
                println!("Filters applied to eligible counts.");
            }
            for summary in summaries {
                let latest = summary
                    .latest_submission
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "- {}: {} loaded, {} plottable, {} eligible, latest submission {}",
                    summary.category.table_name(),
                    summary.loaded,
                    summary.plottable,
                    summary.eligible,
                    latest
                );
            }
        }
    }

    Ok(())
}
