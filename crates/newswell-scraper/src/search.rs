//! Search-results acquisition with fast-path/heavy-path escalation.
//!
//! The fast path is a plain HTTP GET of the search page. The portal sometimes
//! serves that path a JS-only shell (placeholder titles, no dates) or quietly
//! truncates results when it suspects automation; both are treated as signals
//! to escalate to the render service for the affected page only.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rand::Rng;
use reqwest::Client;

use newswell_core::{AppConfig, ItemReference};

use crate::extract::{harvest_search_links, PORTAL_BADGE_TITLE, UNKNOWN_DATE};
use crate::render::RenderClient;

/// Result of fetching one search page.
#[derive(Debug)]
pub struct SearchPage {
    pub items: Vec<ItemReference>,
    pub used_fallback: bool,
}

/// Stateful per-keyword page fetcher.
///
/// Tracks the previous page's item count and a "low streak" of consecutive
/// depressed pages; once the streak reaches the configured trigger (or a page
/// comes back empty or with placeholder data) the page is refetched through
/// the render service, which fully replaces the fast-path result.
pub struct SearchAcquirer {
    client: Client,
    render: Option<RenderClient>,
    base_url: String,
    sort_method: u8,
    date_range: Option<(String, String)>,
    low_drop_ratio: f64,
    low_streak_trigger: u32,
    http_retry_on_low: u32,
    prev_count: Option<usize>,
    low_streak: u32,
}

impl SearchAcquirer {
    /// Build an acquirer for one keyword's paging session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError`] if an HTTP client cannot be constructed.
    pub fn new(
        config: &AppConfig,
        date_range: Option<(&str, &str)>,
    ) -> Result<Self, crate::ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.search_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;

        let render = match &config.render_url {
            Some(url) => Some(RenderClient::new(
                url,
                config.render_token.as_deref(),
                config.request_timeout_secs,
            )?),
            None => None,
        };

        Ok(Self {
            client,
            render,
            base_url: config.search_base_url.clone(),
            sort_method: config.sort_method,
            date_range: date_range.map(|(s, e)| (s.to_owned(), e.to_owned())),
            low_drop_ratio: config.low_drop_ratio,
            low_streak_trigger: config.low_streak_trigger,
            http_retry_on_low: config.http_retry_on_low,
            prev_count: None,
            low_streak: 0,
        })
    }

    /// Fetch one page of candidate references for `keyword`.
    ///
    /// Never fails: fetch errors log and read as zero items, which routes
    /// into the fallback path like any other degraded signal. Fewer than 10
    /// returned items is the caller's end-of-results signal.
    #[allow(clippy::cast_precision_loss)]
    pub async fn fetch_page(&mut self, keyword: &str, page_index: u32) -> SearchPage {
        let mut items = match self.fetch_fast(keyword, page_index).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(keyword, page_index, error = %e, "search fetch failed — treating as empty page");
                Vec::new()
            }
        };

        // Placeholder titles or unparseable dates mean the fast path got the
        // JS-only shell; the whole result is untrustworthy.
        if items
            .iter()
            .any(|i| i.published_at_raw == UNKNOWN_DATE || i.title == PORTAL_BADGE_TITLE)
        {
            tracing::warn!(
                keyword,
                page_index,
                "fast path returned placeholder data — forcing render fallback"
            );
            items.clear();
        }

        let mut fallback_needed = false;
        if items.is_empty() {
            fallback_needed = true;
        } else {
            if let Some(prev) = self.prev_count {
                let floor = prev as f64 * self.low_drop_ratio;
                if (items.len() as f64) < floor {
                    for _ in 0..self.http_retry_on_low {
                        match self.fetch_fast(keyword, page_index).await {
                            Ok(retry) if retry.len() > items.len() => {
                                items = retry;
                                break;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::debug!(keyword, page_index, error = %e, "low-signal retry failed");
                            }
                        }
                    }
                    if (items.len() as f64) < floor {
                        self.low_streak += 1;
                    } else {
                        self.low_streak = 0;
                    }
                } else {
                    self.low_streak = 0;
                }
            }

            if self.low_streak >= self.low_streak_trigger {
                fallback_needed = true;
                self.low_streak = 0;
            }
        }

        let mut used_fallback = false;
        if fallback_needed {
            match &self.render {
                Some(render) => {
                    used_fallback = true;
                    // Brief jittered pause so the render fetch does not land
                    // in lockstep with the fast request it replaces.
                    let jitter_ms = rand::rng().random_range(800..=1200);
                    tokio::time::sleep(Duration::from_millis(jitter_ms)).await;

                    let url = self.search_url(keyword, page_index);
                    match render.content(&url).await {
                        Ok(html) => {
                            items = harvest_search_links(&html, keyword);
                            tracing::info!(
                                keyword,
                                page_index,
                                count = items.len(),
                                "render fallback replaced fast-path result"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(keyword, page_index, error = %e, "render fallback failed — keeping fast-path result");
                        }
                    }
                }
                None => {
                    tracing::warn!(
                        keyword,
                        page_index,
                        "render service not configured — keeping fast-path result"
                    );
                }
            }
        }

        if !items.is_empty() {
            self.prev_count = Some(items.len());
        }

        SearchPage {
            items,
            used_fallback,
        }
    }

    async fn fetch_fast(
        &self,
        keyword: &str,
        page_index: u32,
    ) -> Result<Vec<ItemReference>, crate::ScrapeError> {
        let url = self.search_url(keyword, page_index);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(keyword, page_index, status = status.as_u16(), "search page returned non-2xx");
            return Ok(Vec::new());
        }
        let html = response.text().await?;
        Ok(harvest_search_links(&html, keyword))
    }

    /// The portal pages by result offset: page N starts at item `N*10 + 1`.
    fn search_url(&self, keyword: &str, page_index: u32) -> String {
        let encoded = utf8_percent_encode(keyword, NON_ALPHANUMERIC).to_string();
        let start = page_index * 10 + 1;
        let mut url = format!(
            "{}?where=news&query={}&sort={}&start={}",
            self.base_url, encoded, self.sort_method, start
        );
        if let Some((ds, de)) = &self.date_range {
            let ds_enc = utf8_percent_encode(ds, NON_ALPHANUMERIC).to_string();
            let de_enc = utf8_percent_encode(de, NON_ALPHANUMERIC).to_string();
            url.push_str(&format!("&pd=3&ds={ds_enc}&de={de_enc}"));
        }
        url
    }
}
