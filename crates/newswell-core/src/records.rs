//! Shared data model for the acquisition pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate article reference harvested from a search-results page.
///
/// The `(oid, aid)` pair is the portal's external identifier for the article
/// and its comment thread, and is the cross-run dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemReference {
    pub url: String,
    pub oid: String,
    pub aid: String,
    pub title: String,
    /// Raw date text as shown on the search page ("3시간 전", "2026.08.01.").
    pub published_at_raw: String,
    pub keyword: String,
}

impl ItemReference {
    /// Dedup key for the seen-set: the external identifier pair.
    #[must_use]
    pub fn external_id(&self) -> String {
        format!("{}/{}", self.oid, self.aid)
    }
}

/// Audience demographics for one article's comment thread.
///
/// All-or-nothing: either `demographic_available` is true and every numeric
/// field is present, or it is false and every numeric field is `None` (and
/// omitted from serialized output).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemographicSnapshot {
    pub demographic_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub male_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub female_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_10s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_20s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_30s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_40s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_50s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_60_plus: Option<f64>,
}

impl DemographicSnapshot {
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Construct a fully-populated snapshot. `ages` is ordered 10s through
    /// 60-plus (the 60s and 70s source buckets are already summed by callers).
    #[must_use]
    pub fn from_parts(male_ratio: f64, female_ratio: f64, ages: [f64; 6]) -> Self {
        Self {
            demographic_available: true,
            male_ratio: Some(male_ratio),
            female_ratio: Some(female_ratio),
            age_10s: Some(ages[0]),
            age_20s: Some(ages[1]),
            age_30s: Some(ages[2]),
            age_40s: Some(ages[3]),
            age_50s: Some(ages[4]),
            age_60_plus: Some(ages[5]),
        }
    }
}

/// One comment from an article's thread. Only ever persisted alongside an
/// accepted article from the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub run_id: String,
    pub article_url: String,
    pub comment_id: String,
    pub comment_text: String,
    pub comment_created_at: String,
    pub author: String,
    pub sympathy_count: u64,
    pub antipathy_count: u64,
}

/// Why an accepted article was (or was not) fully collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Collected,
    FilteredOut,
    MetadataOnly,
}

/// The persisted unit: reference fields + demographics + collection outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub run_id: String,
    pub collected_at: DateTime<Utc>,
    pub keyword: String,
    pub title: String,
    pub url: String,
    pub oid: String,
    pub aid: String,
    pub published_at_raw: String,
    pub comment_count_api: u64,
    pub comment_count_ui: u64,
    pub comments_collected: bool,
    pub comments_collected_n: usize,
    pub disposition: Disposition,
    #[serde(flatten)]
    pub demographics: DemographicSnapshot,
}

/// A non-fatal error noted during the run, surfaced in the final summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunErrorNote {
    pub context: String,
    pub message: String,
}

/// Aggregate counters for one run, owned and mutated only by the controller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub scanned: u64,
    pub matched: u64,
    pub collected: u64,
    pub comments_total: u64,
    pub fallback_search: u64,
    pub fallback_demographics: u64,
    pub forbidden: u64,
    pub errors: Vec<RunErrorNote>,
}

impl RunStats {
    pub fn record_error(&mut self, context: impl Into<String>, message: impl Into<String>) {
        self.errors.push(RunErrorNote {
            context: context.into(),
            message: message.into(),
        });
    }
}
