//! Per-article pipeline: comment fetch, demographic resolution, and the
//! ordered acceptance policy.
//!
//! The orchestrator owns no shared state — it reads the config and clients
//! and returns a typed outcome; the run controller folds outcomes into stats,
//! the breaker streak, and the persister.

use chrono::Utc;
use tokio::sync::Semaphore;

use newswell_core::{
    AppConfig, ArticleRecord, CommentRecord, DemographicSnapshot, Disposition, ItemReference,
};
use newswell_scraper::{CommentFetcher, SocialInfo, UiResolver};

/// Result of processing one candidate item.
pub(crate) enum ArticleOutcome {
    Accepted {
        article: ArticleRecord,
        comments: Vec<CommentRecord>,
        used_ui_fallback: bool,
    },
    Filtered {
        url: String,
        reason: FilterReason,
        used_ui_fallback: bool,
    },
    /// Hard block from the comment API; the controller does breaker
    /// bookkeeping.
    Blocked { url: String },
    /// Non-fatal failure; recorded and skipped.
    Failed {
        url: String,
        context: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterReason {
    BelowThreshold { count: u64 },
    NoDemographics,
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterReason::BelowThreshold { count } => {
                write!(f, "comment count {count} below threshold")
            }
            FilterReason::NoDemographics => write!(f, "no demographic data available"),
        }
    }
}

/// Acceptance policy, evaluated strictly in order:
/// 1. the effective comment count must meet the threshold;
/// 2. metadata-only mode accepts regardless of demographics;
/// 3. otherwise demographics must be available;
/// 4. otherwise accept for full collection.
pub(crate) fn evaluate_acceptance(
    comment_count: u64,
    demographic_available: bool,
    metadata_only: bool,
    threshold: u64,
) -> Result<Disposition, FilterReason> {
    if comment_count < threshold {
        return Err(FilterReason::BelowThreshold {
            count: comment_count,
        });
    }
    if metadata_only {
        return Ok(Disposition::MetadataOnly);
    }
    if !demographic_available {
        return Err(FilterReason::NoDemographics);
    }
    Ok(Disposition::Collected)
}

pub(crate) struct ArticleOrchestrator<'a> {
    pub config: &'a AppConfig,
    pub fetcher: &'a CommentFetcher,
    pub ui: Option<&'a UiResolver>,
    pub page_pool: &'a Semaphore,
    pub run_id: &'a str,
}

impl ArticleOrchestrator<'_> {
    pub(crate) async fn process(&self, item: &ItemReference) -> ArticleOutcome {
        let thread = match self
            .fetcher
            .fetch(&item.oid, &item.aid, self.config.max_comments, self.page_pool)
            .await
        {
            Ok(thread) => thread,
            Err(e) if e.is_blocked() => {
                tracing::warn!(url = %item.url, "comment API returned a hard block");
                return ArticleOutcome::Blocked {
                    url: item.url.clone(),
                };
            }
            Err(e) => {
                tracing::error!(url = %item.url, error = %e, "comment fetch failed");
                return ArticleOutcome::Failed {
                    url: item.url.clone(),
                    context: "comment_api",
                    message: e.to_string(),
                };
            }
        };

        let mut comment_count_api = thread.total_count;
        let mut demographics = thread
            .social_info
            .as_ref()
            .map_or_else(DemographicSnapshot::unavailable, SocialInfo::to_snapshot);

        // UI fallback is warranted when the API gave no structured audience
        // data, or when the API count sits below the threshold and the
        // rendered page can re-verify it (the larger count wins).
        let fallback_warranted = !demographics.demographic_available
            || (comment_count_api < self.config.comment_threshold
                && self.config.demographics_ui_fallback);

        let mut comment_count_ui = comment_count_api;
        let mut used_ui_fallback = false;

        match self.ui {
            Some(ui) if fallback_warranted => {
                used_ui_fallback = true;

                match ui.resolve_demographics(&item.url).await {
                    Ok(snap) if snap.demographic_available => demographics = snap,
                    Ok(_) => {
                        tracing::debug!(url = %item.url, "article page carries no demographic chart");
                    }
                    Err(e) => {
                        tracing::error!(url = %item.url, error = %e, "demographic fallback failed");
                    }
                }

                match ui.resolve_article_details(&item.url).await {
                    Ok(details) => {
                        comment_count_ui = details.comment_count_ui;
                        if comment_count_ui > comment_count_api {
                            comment_count_api = comment_count_ui;
                        }
                    }
                    Err(e) => {
                        tracing::error!(url = %item.url, error = %e, "article detail fallback failed");
                    }
                }
            }
            _ => {}
        }

        let disposition = match evaluate_acceptance(
            comment_count_api,
            demographics.demographic_available,
            self.config.metadata_only,
            self.config.comment_threshold,
        ) {
            Ok(disposition) => disposition,
            Err(reason) => {
                return ArticleOutcome::Filtered {
                    url: item.url.clone(),
                    reason,
                    used_ui_fallback,
                };
            }
        };

        let comments: Vec<CommentRecord> = if disposition == Disposition::Collected {
            thread
                .comments
                .iter()
                .map(|c| CommentRecord {
                    run_id: self.run_id.to_owned(),
                    article_url: item.url.clone(),
                    comment_id: c.comment_id(),
                    comment_text: c.contents.clone(),
                    comment_created_at: c.reg_time.clone(),
                    author: c.author().to_owned(),
                    sympathy_count: c.sympathy_count,
                    antipathy_count: c.antipathy_count,
                })
                .collect()
        } else {
            Vec::new()
        };

        let article = ArticleRecord {
            run_id: self.run_id.to_owned(),
            collected_at: Utc::now(),
            keyword: item.keyword.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            oid: item.oid.clone(),
            aid: item.aid.clone(),
            published_at_raw: item.published_at_raw.clone(),
            comment_count_api,
            comment_count_ui,
            comments_collected: disposition == Disposition::Collected,
            comments_collected_n: comments.len(),
            disposition,
            demographics,
        };

        ArticleOutcome::Accepted {
            article,
            comments,
            used_ui_fallback,
        }
    }
}

#[cfg(test)]
#[path = "article_test.rs"]
mod tests;
