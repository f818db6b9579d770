//! Client for a Browserless-style render service — the heavy fetch path.
//!
//! The service accepts `POST /content {"url": …}` and returns the
//! fully-rendered HTML of the page, which the caller harvests exactly like a
//! fast-path response.

use std::time::Duration;

use crate::error::ScrapeError;

pub struct RenderClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RenderClient {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(
        base_url: &str,
        token: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    /// Fetch fully-rendered HTML for `url` via the `/content` endpoint.
    ///
    /// # Errors
    ///
    /// [`ScrapeError::Render`] on a non-2xx service response,
    /// [`ScrapeError::Http`] on network failure.
    pub async fn content(&self, url: &str) -> Result<String, ScrapeError> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(token) = &self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({ "url": url });

        let response = self
            .client
            .post(&endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ScrapeError::Render {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}
