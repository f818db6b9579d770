//! Comment API client: template probing, JSONP unwrapping, and bounded
//! concurrent pagination.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Semaphore;

use newswell_core::DemographicSnapshot;

use crate::backoff::retry_with_backoff;
use crate::error::ScrapeError;

/// Template candidates probed in order on page 1. The portal keys its comment
/// API on a per-section template id that is not discoverable up front; the
/// first candidate returning a nonzero comment count wins and is reused for
/// every later page of that article. All-zero probes mean zero comments.
pub const TEMPLATE_CANDIDATES: [&str; 5] = [
    "view_politics",
    "default_society",
    "default_economy",
    "default_view",
    "view_it",
];

const PAGE_SIZE: u32 = 100;
const INDEX_SIZE: u32 = 10;
const REPLY_PAGE_SIZE: u32 = 20;

/// One comment as returned by the portal's comment API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiComment {
    comment_no: serde_json::Value,
    pub contents: String,
    pub reg_time: String,
    pub masked_user_name: String,
    pub user_name: String,
    pub sympathy_count: u64,
    pub antipathy_count: u64,
}

impl ApiComment {
    /// The comment id, stringified regardless of whether the API sent a
    /// number or a string.
    #[must_use]
    pub fn comment_id(&self) -> String {
        match &self.comment_no {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Masked nickname when present, account name otherwise.
    #[must_use]
    pub fn author(&self) -> &str {
        if self.masked_user_name.is_empty() {
            &self.user_name
        } else {
            &self.masked_user_name
        }
    }
}

/// Audience breakdown attached to page 1 of a comment thread, when the portal
/// has computed one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SocialInfo {
    pub male: f64,
    pub female: f64,
    pub age: HashMap<String, f64>,
}

impl SocialInfo {
    /// Convert the API shape into the persisted snapshot. Missing age buckets
    /// read as zero; the 60s and 70s buckets are summed into the final
    /// 60-plus bucket.
    #[must_use]
    pub fn to_snapshot(&self) -> DemographicSnapshot {
        let bucket = |key: &str| self.age.get(key).copied().unwrap_or(0.0);
        DemographicSnapshot::from_parts(
            self.male,
            self.female,
            [
                bucket("10"),
                bucket("20"),
                bucket("30"),
                bucket("40"),
                bucket("50"),
                bucket("60") + bucket("70"),
            ],
        )
    }
}

/// The result of fetching one article's comment thread.
#[derive(Debug, Default)]
pub struct CommentThread {
    pub comments: Vec<ApiComment>,
    pub social_info: Option<SocialInfo>,
    /// The API's total comment count for the article (may exceed the number
    /// of comments actually fetched under the per-article cap).
    pub total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Payload {
    result: PayloadResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PayloadResult {
    count: CountInfo,
    comment_list: Vec<ApiComment>,
    page_model: PageModel,
    social_info: Option<SocialInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CountInfo {
    comment: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PageModel {
    total_pages: u32,
}

/// Client for the portal's JSONP comment endpoint.
///
/// 429 and 5xx responses are retried with exponential backoff; 403 is never
/// retried and surfaces as [`ScrapeError::Blocked`] for the caller's
/// circuit-breaker bookkeeping.
pub struct CommentFetcher {
    client: Client,
    api_url: String,
    max_retries: u32,
    backoff_base_secs: u64,
    /// Local fan-out bound for pages 2..N of one article; the shared page
    /// semaphore additionally bounds requests across all articles.
    page_fan_out: usize,
}

impl CommentFetcher {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(
        api_url: &str,
        user_agent: &str,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_secs: u64,
        page_fan_out: usize,
    ) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.to_owned(),
            max_retries,
            backoff_base_secs,
            page_fan_out: page_fan_out.max(1),
        })
    }

    /// Fetch an article's comment thread and audience metadata.
    ///
    /// Page 1 probes the template candidates sequentially and carries the
    /// total page count and social info. Later pages fetch concurrently
    /// through `page_pool`, stopping early (best-effort) once `max_comments`
    /// have accumulated. Comment order across pages is not guaranteed.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Blocked`] on any 403, from any page. Other errors on
    /// page 1 propagate; on later pages they skip that page with a warning.
    pub async fn fetch(
        &self,
        oid: &str,
        aid: &str,
        max_comments: usize,
        page_pool: &Semaphore,
    ) -> Result<CommentThread, ScrapeError> {
        let (template, first) = self.probe_first_page(oid, aid, page_pool).await?;

        let total_count = first.count.comment;
        let total_pages = first.page_model.total_pages;
        let social_info = first.social_info;

        let mut comments = first.comment_list;
        comments.truncate(max_comments);

        if total_pages > 1 && comments.len() < max_comments {
            let mut pages = stream::iter(2..=total_pages)
                .map(|page| self.request_page(oid, aid, &template, page, false, page_pool))
                .buffer_unordered(self.page_fan_out);

            while let Some(result) = pages.next().await {
                match result {
                    Ok(payload) => {
                        for comment in payload.comment_list {
                            if comments.len() >= max_comments {
                                break;
                            }
                            comments.push(comment);
                        }
                        if comments.len() >= max_comments {
                            break;
                        }
                    }
                    Err(e) if e.is_blocked() => return Err(e),
                    Err(e) => {
                        tracing::warn!(oid, aid, error = %e, "comment page fetch failed — skipping page");
                    }
                }
            }
        }

        Ok(CommentThread {
            comments,
            social_info,
            total_count,
        })
    }

    /// Probe the template candidates, strictly in order, on page 1.
    ///
    /// The first nonzero-count response wins. A 403 aborts immediately; any
    /// other failure logs and moves to the next candidate. If every template
    /// returns zero, the first zero response is accepted as a genuinely empty
    /// thread.
    async fn probe_first_page(
        &self,
        oid: &str,
        aid: &str,
        page_pool: &Semaphore,
    ) -> Result<(String, PayloadResult), ScrapeError> {
        let mut empty: Option<(String, PayloadResult)> = None;
        let mut last_err: Option<ScrapeError> = None;

        for template in TEMPLATE_CANDIDATES {
            match self.request_page(oid, aid, template, 1, true, page_pool).await {
                Ok(payload) => {
                    if payload.count.comment > 0 {
                        return Ok((template.to_owned(), payload));
                    }
                    if empty.is_none() {
                        empty = Some((template.to_owned(), payload));
                    }
                }
                Err(e) if e.is_blocked() => return Err(e),
                Err(e) => {
                    tracing::warn!(oid, aid, template, error = %e, "template probe failed — trying next candidate");
                    last_err = Some(e);
                }
            }
        }

        match (empty, last_err) {
            (Some(found), _) => Ok(found),
            (None, Some(err)) => Err(err),
            // Unreachable with a nonempty candidate list; treat as empty.
            (None, None) => Ok((String::new(), PayloadResult::default())),
        }
    }

    async fn request_page(
        &self,
        oid: &str,
        aid: &str,
        template: &str,
        page: u32,
        initialize: bool,
        page_pool: &Semaphore,
    ) -> Result<PayloadResult, ScrapeError> {
        let object_id = format!("news{oid},{aid}");
        let referer = format!("https://n.news.naver.com/mnews/article/comment/{oid}/{aid}");

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let object_id = object_id.clone();
            let referer = referer.clone();
            async move {
                // Acquired per attempt so a backoff sleep does not hold a
                // slot of the shared page pool.
                let _permit = page_pool
                    .acquire()
                    .await
                    .map_err(|_| ScrapeError::PoolClosed)?;

                let query: [(&str, String); 12] = [
                    ("ticket", "news".to_owned()),
                    ("templateId", template.to_owned()),
                    ("pool", "cbox5".to_owned()),
                    ("lang", "ko".to_owned()),
                    ("country", "KR".to_owned()),
                    ("objectId", object_id.clone()),
                    ("pageSize", PAGE_SIZE.to_string()),
                    ("indexSize", INDEX_SIZE.to_string()),
                    ("page", page.to_string()),
                    (
                        "initialize",
                        if initialize { "true" } else { "false" }.to_owned(),
                    ),
                    ("useAltSort", "true".to_owned()),
                    ("replyPageSize", REPLY_PAGE_SIZE.to_string()),
                ];

                let response = self
                    .client
                    .get(&self.api_url)
                    .header(reqwest::header::REFERER, &referer)
                    .query(&query)
                    .send()
                    .await?;

                let status = response.status();
                let url = response.url().to_string();

                if status == reqwest::StatusCode::FORBIDDEN {
                    return Err(ScrapeError::Blocked { url });
                }
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScrapeError::RateLimited {
                        url,
                        retry_after_secs,
                    });
                }
                if !status.is_success() {
                    return Err(ScrapeError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let body = response.text().await?;
                let json = parse_jsonp(&body, &url)?;
                let payload: Payload =
                    serde_json::from_str(json).map_err(|e| ScrapeError::Deserialize {
                        context: format!("comment page {page} for {object_id}"),
                        source: e,
                    })?;
                Ok(payload.result)
            }
        })
        .await
    }
}

/// Strip a JSONP wrapper positionally: everything between the first `(` and
/// the last `)`. Callback names change; parenthesis positions do not.
fn parse_jsonp<'a>(body: &'a str, url: &str) -> Result<&'a str, ScrapeError> {
    let start = body.find('(');
    let end = body.rfind(')');
    match (start, end) {
        (Some(s), Some(e)) if e > s => Ok(&body[s + 1..e]),
        _ => Err(ScrapeError::Jsonp {
            url: url.to_owned(),
        }),
    }
}
