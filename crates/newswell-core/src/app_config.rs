use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Immutable run configuration, constructed once at startup and passed by
/// reference into every component. No component reads ambient state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// YAML file carrying the keyword list and optional date range.
    pub search_plan_path: PathBuf,
    /// Root under which per-run output directories are created.
    pub output_dir: PathBuf,

    pub search_base_url: String,
    pub comment_api_url: String,
    /// Browserless-style render service; `None` disables the heavy path.
    pub render_url: Option<String>,
    pub render_token: Option<String>,

    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub search_timeout_secs: u64,

    /// Concurrently processed articles per search page.
    pub article_pool: usize,
    /// Concurrent comment-page requests across all in-flight articles.
    pub page_pool: usize,
    pub max_retries: u32,
    pub backoff_base_secs: u64,

    pub comment_threshold: u64,
    pub max_comments: usize,
    pub max_articles: u64,
    pub max_pages: u32,
    pub sort_method: u8,
    pub low_drop_ratio: f64,
    pub low_streak_trigger: u32,
    pub http_retry_on_low: u32,
    pub demographics_ui_fallback: bool,
    pub metadata_only: bool,

    pub batch_size: usize,
}
