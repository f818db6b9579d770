mod collect;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "newswell")]
#[command(about = "Keyword-driven article + comment + demographics acquisition")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a collection pass over the configured keywords
    Run {
        /// Override the search plan's keywords (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Start of the date window, portal form (YYYY.MM.DD)
        #[arg(long, requires = "end_date")]
        start_date: Option<String>,

        /// End of the date window, portal form (YYYY.MM.DD)
        #[arg(long, requires = "start_date")]
        end_date: Option<String>,

        /// Accept articles on comment count alone and skip comment bodies
        #[arg(long)]
        metadata_only: bool,

        /// Stop after this many accepted articles
        #[arg(long)]
        max_articles: Option<u64>,

        /// Use a different search-plan file for this run
        #[arg(long)]
        search_plan: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = newswell_core::load_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            keywords,
            start_date,
            end_date,
            metadata_only,
            max_articles,
            search_plan,
        } => {
            collect::run_collect(
                config,
                collect::RunOverrides {
                    keywords,
                    start_date,
                    end_date,
                    metadata_only,
                    max_articles,
                    search_plan,
                },
            )
            .await
        }
    }
}
