//! Run controller: keyword and page iteration, bounded article fan-out,
//! outcome folding, and circuit-breaker bookkeeping.
//!
//! The controller is the single owner of the seen-set, the persister buffers,
//! and the run statistics; article pipelines return typed outcomes and never
//! touch shared state. Items are marked seen *before* dispatch so overlapping
//! pipelines can never schedule the same article twice.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;

use newswell_core::{AppConfig, RunStats, SearchPlan};
use newswell_scraper::{CommentFetcher, SearchAcquirer, UiResolver};
use newswell_store::{BatchPersister, RunStage, SeenSet, StatusWriter};

use super::article::{ArticleOrchestrator, ArticleOutcome};

/// A page with fewer results than this is the portal's last for the query.
const SEARCH_PAGE_SIZE: usize = 10;

/// Consecutive hard blocks that trip the run-level circuit breaker.
const BLOCK_STREAK_TRIP: u32 = 2;

pub(crate) struct RunReport {
    pub run_id: String,
    pub stats: RunStats,
    pub breaker_tripped: bool,
}

pub(crate) struct RunController<'a> {
    config: &'a AppConfig,
    plan: SearchPlan,
    fetcher: CommentFetcher,
    ui: Option<UiResolver>,
    page_pool: Arc<Semaphore>,
    seen: SeenSet,
    persister: BatchPersister,
    status: StatusWriter,
    run_id: String,
    stats: RunStats,
    forbidden_streak: u32,
    breaker_tripped: bool,
}

impl<'a> RunController<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: &'a AppConfig,
        plan: SearchPlan,
        fetcher: CommentFetcher,
        ui: Option<UiResolver>,
        seen: SeenSet,
        persister: BatchPersister,
        status: StatusWriter,
        run_id: String,
    ) -> Self {
        Self {
            config,
            plan,
            fetcher,
            ui,
            page_pool: Arc::new(Semaphore::new(config.page_pool.max(1))),
            seen,
            persister,
            status,
            run_id,
            stats: RunStats::default(),
            forbidden_streak: 0,
            breaker_tripped: false,
        }
    }

    /// Drive the whole run: `READY → STARTING → SEARCHING → COMPLETED`, with
    /// breaker-tripped early termination in between. Only startup-class
    /// failures (an HTTP client that cannot be built) propagate as errors;
    /// everything else degrades the dataset and is reported in the stats.
    pub(crate) async fn run(&mut self) -> anyhow::Result<RunReport> {
        self.status.set_stage(RunStage::Starting);

        let keywords = self.plan.keywords.clone();
        let date_range = self
            .plan
            .date_range()
            .map(|(s, e)| (s.to_owned(), e.to_owned()));

        self.status.set_stage(RunStage::Searching);

        for keyword in &keywords {
            if self.breaker_tripped || self.stats.collected >= self.config.max_articles {
                break;
            }
            self.status.set_keyword(keyword);
            self.process_keyword(keyword, date_range.as_ref().map(|(s, e)| (s.as_str(), e.as_str())))
                .await?;
        }

        if let Err(e) = self.persister.flush(true) {
            self.stats.record_error("persist", e.to_string());
        }
        self.status.set_stage(RunStage::Completed);
        self.status.update_stats(&self.stats, self.breaker_tripped);

        tracing::info!(
            run_id = %self.run_id,
            scanned = self.stats.scanned,
            collected = self.stats.collected,
            comments = self.stats.comments_total,
            forbidden = self.stats.forbidden,
            breaker_tripped = self.breaker_tripped,
            "collection run finished"
        );

        Ok(RunReport {
            run_id: self.run_id.clone(),
            stats: self.stats.clone(),
            breaker_tripped: self.breaker_tripped,
        })
    }

    async fn process_keyword(
        &mut self,
        keyword: &str,
        date_range: Option<(&str, &str)>,
    ) -> anyhow::Result<()> {
        let mut acquirer = SearchAcquirer::new(self.config, date_range)?;

        let mut page_index = 0;
        while page_index < self.config.max_pages {
            if self.breaker_tripped || self.stats.collected >= self.config.max_articles {
                break;
            }

            let page = acquirer.fetch_page(keyword, page_index).await;
            if page.used_fallback {
                self.stats.fallback_search += 1;
            }
            let last_page = page.items.len() < SEARCH_PAGE_SIZE;

            // Mark-before-dispatch: the seen check and the fetch span a
            // suspension point, so marking afterwards would let overlapping
            // pages schedule the same article twice.
            let mut batch = Vec::new();
            for item in page.items {
                if self.seen.seen(&item) {
                    continue;
                }
                self.seen.mark(&item);
                self.stats.scanned += 1;
                batch.push(item);
            }
            let fresh = batch.len();
            tracing::info!(keyword, page_index, fresh, last_page, "search page processed");

            if fresh > 0 {
                let outcomes: Vec<ArticleOutcome> = {
                    let orchestrator = ArticleOrchestrator {
                        config: self.config,
                        fetcher: &self.fetcher,
                        ui: self.ui.as_ref(),
                        page_pool: &self.page_pool,
                        run_id: &self.run_id,
                    };
                    stream::iter(&batch)
                        .map(|item| orchestrator.process(item))
                        .buffer_unordered(self.config.article_pool.max(1))
                        .collect()
                        .await
                };
                self.fold_outcomes(keyword, outcomes);

                if let Err(e) = self.persister.flush(false) {
                    self.stats.record_error("persist", e.to_string());
                }
                self.status.update_stats(&self.stats, self.breaker_tripped);
            }

            if last_page && fresh == 0 {
                break;
            }
            page_index += 1;
        }

        Ok(())
    }

    /// Fold one page batch's outcomes into stats, buffers, and the breaker
    /// streak. Outcomes complete in arbitrary order; any outcome that made it
    /// past the comment fetch resets the streak, and two consecutive blocks
    /// trip the breaker.
    fn fold_outcomes(&mut self, keyword: &str, outcomes: Vec<ArticleOutcome>) {
        for outcome in outcomes {
            match outcome {
                ArticleOutcome::Accepted {
                    article,
                    comments,
                    used_ui_fallback,
                } => {
                    self.forbidden_streak = 0;
                    self.stats.matched += 1;
                    self.stats.collected += 1;
                    if used_ui_fallback {
                        self.stats.fallback_demographics += 1;
                    }
                    self.stats.comments_total += comments.len() as u64;
                    tracing::info!(
                        keyword,
                        url = %article.url,
                        disposition = ?article.disposition,
                        comments = comments.len(),
                        "article accepted"
                    );
                    self.persister.buffer_article(article);
                    if !comments.is_empty() {
                        self.persister.buffer_comments(comments);
                    }
                }
                ArticleOutcome::Filtered {
                    url,
                    reason,
                    used_ui_fallback,
                } => {
                    self.forbidden_streak = 0;
                    if used_ui_fallback {
                        self.stats.fallback_demographics += 1;
                    }
                    tracing::info!(keyword, url = %url, %reason, "item filtered out");
                }
                ArticleOutcome::Blocked { url } => {
                    self.stats.forbidden += 1;
                    self.forbidden_streak += 1;
                    if self.forbidden_streak >= BLOCK_STREAK_TRIP && !self.breaker_tripped {
                        self.breaker_tripped = true;
                        tracing::warn!(
                            keyword,
                            url = %url,
                            streak = self.forbidden_streak,
                            "circuit breaker tripped — no new work will be scheduled"
                        );
                    }
                }
                ArticleOutcome::Failed {
                    url,
                    context,
                    message,
                } => {
                    // A transient failure between two blocks does not clear
                    // the streak.
                    self.stats.record_error(context, format!("{url}: {message}"));
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
