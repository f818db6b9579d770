//! Collection command wiring.
//!
//! Resolves the search plan, takes the single-instance run lock, builds the
//! clients and the run controller, and prints the end-of-run summary. Lock
//! contention is the only error that aborts before any work; everything else
//! the controller degrades around.

mod article;
mod runner;

use chrono::Local;

use newswell_core::{load_search_plan, AppConfig, SearchPlan};
use newswell_scraper::{CommentFetcher, RenderClient, UiResolver};
use newswell_store::{BatchPersister, RunLock, SeenSet, StatusWriter};

use runner::RunController;

/// CLI-level overrides applied on top of the environment config and plan file.
pub(crate) struct RunOverrides {
    pub keywords: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub metadata_only: bool,
    pub max_articles: Option<u64>,
    pub search_plan: Option<std::path::PathBuf>,
}

pub(crate) async fn run_collect(
    mut config: AppConfig,
    overrides: RunOverrides,
) -> anyhow::Result<()> {
    if overrides.metadata_only {
        config.metadata_only = true;
    }
    if let Some(n) = overrides.max_articles {
        config.max_articles = n;
    }
    if let Some(path) = overrides.search_plan {
        config.search_plan_path = path;
    }

    let plan = if overrides.keywords.is_empty() {
        load_search_plan(&config.search_plan_path)?
    } else {
        SearchPlan {
            keywords: overrides.keywords,
            start_date: overrides.start_date,
            end_date: overrides.end_date,
        }
    };
    if plan.keywords.is_empty() {
        anyhow::bail!(
            "search plan has no keywords; add some to {} or pass --keyword",
            config.search_plan_path.display()
        );
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let lock = RunLock::new(&config.output_dir);
    let _guard = lock.acquire()?;

    let run_id = Local::now().format("%Y%m%d_%H%M%S").to_string();
    tracing::info!(run_id = %run_id, keywords = plan.keywords.len(), "starting collection run");

    let mut seen = SeenSet::new();
    seen.seed(&config.output_dir);

    let persister = BatchPersister::new(&config.output_dir, &run_id, config.batch_size)?;
    let status = StatusWriter::new(persister.run_dir());

    let fetcher = CommentFetcher::new(
        &config.comment_api_url,
        &config.user_agent,
        config.request_timeout_secs,
        config.max_retries,
        config.backoff_base_secs,
        config.page_pool,
    )?;

    let ui = match &config.render_url {
        Some(url) if config.demographics_ui_fallback => Some(UiResolver::new(RenderClient::new(
            url,
            config.render_token.as_deref(),
            config.request_timeout_secs,
        )?)),
        _ => None,
    };

    let mut controller =
        RunController::new(&config, plan, fetcher, ui, seen, persister, status, run_id);
    let report = controller.run().await?;

    println!("run {} finished", report.run_id);
    println!(
        "  scanned {} / collected {} / comments {}",
        report.stats.scanned, report.stats.collected, report.stats.comments_total
    );
    println!(
        "  search fallbacks {} / demographic fallbacks {} / errors {}",
        report.stats.fallback_search,
        report.stats.fallback_demographics,
        report.stats.errors.len()
    );
    if report.breaker_tripped {
        println!("  terminated early: circuit breaker tripped after repeated blocks");
    }

    Ok(())
}
