use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse. All variables have
/// defaults, so a bare environment is valid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value fails to parse.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing/validation logic is decoupled from the actual environment so it
/// can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u8 = |var: &str, default: &str| -> Result<u8, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u8>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<f64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected boolean, got \"{other}\""),
            }),
        }
    };

    let env = parse_environment(&or_default("NEWSWELL_ENV", "development"));
    let log_level = or_default("NEWSWELL_LOG_LEVEL", "info");
    let search_plan_path = PathBuf::from(or_default(
        "NEWSWELL_SEARCH_PLAN_PATH",
        "./config/search.yaml",
    ));
    let output_dir = PathBuf::from(or_default("NEWSWELL_OUTPUT_DIR", "GPR"));

    let search_base_url = or_default(
        "NEWSWELL_SEARCH_BASE_URL",
        "https://search.naver.com/search.naver",
    );
    let comment_api_url = or_default(
        "NEWSWELL_COMMENT_API_URL",
        "https://apis.naver.com/commentBox/cbox/web_naver_list_jsonp.json",
    );
    let render_url = lookup("NEWSWELL_RENDER_URL").ok();
    let render_token = lookup("NEWSWELL_RENDER_TOKEN").ok();

    let user_agent = or_default(
        "NEWSWELL_USER_AGENT",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    );
    let request_timeout_secs = parse_u64("NEWSWELL_REQUEST_TIMEOUT_SECS", "30")?;
    let search_timeout_secs = parse_u64("NEWSWELL_SEARCH_TIMEOUT_SECS", "8")?;

    let article_pool = parse_usize("NEWSWELL_ARTICLE_POOL", "5")?;
    let page_pool = parse_usize("NEWSWELL_PAGE_POOL", "10")?;
    let max_retries = parse_u32("NEWSWELL_MAX_RETRIES", "3")?;
    let backoff_base_secs = parse_u64("NEWSWELL_BACKOFF_BASE_SECS", "2")?;

    let comment_threshold = parse_u64("NEWSWELL_COMMENT_THRESHOLD", "10")?;
    let max_comments = parse_usize("NEWSWELL_MAX_COMMENTS", "300")?;
    let max_articles = parse_u64("NEWSWELL_MAX_ARTICLES", "500")?;
    let max_pages = parse_u32("NEWSWELL_MAX_PAGES", "2")?;
    let sort_method = parse_u8("NEWSWELL_SORT_METHOD", "0")?;
    let low_drop_ratio = parse_f64("NEWSWELL_LOW_DROP_RATIO", "0.5")?;
    let low_streak_trigger = parse_u32("NEWSWELL_LOW_STREAK_TRIGGER", "2")?;
    let http_retry_on_low = parse_u32("NEWSWELL_HTTP_RETRY_ON_LOW", "1")?;
    let demographics_ui_fallback = parse_bool("NEWSWELL_DEMOGRAPHICS_UI_FALLBACK", "true")?;
    let metadata_only = parse_bool("NEWSWELL_METADATA_ONLY", "false")?;

    let batch_size = parse_usize("NEWSWELL_BATCH_SIZE", "20")?;

    Ok(AppConfig {
        env,
        log_level,
        search_plan_path,
        output_dir,
        search_base_url,
        comment_api_url,
        render_url,
        render_token,
        user_agent,
        request_timeout_secs,
        search_timeout_secs,
        article_pool,
        page_pool,
        max_retries,
        backoff_base_secs,
        comment_threshold,
        max_comments,
        max_articles,
        max_pages,
        sort_method,
        low_drop_ratio,
        low_streak_trigger,
        http_retry_on_low,
        demographics_ui_fallback,
        metadata_only,
        batch_size,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment("development"), Environment::Development);
        assert_eq!(parse_environment("test"), Environment::Test);
        assert_eq!(parse_environment("production"), Environment::Production);
        assert_eq!(parse_environment("whatever"), Environment::Development);
    }

    #[test]
    fn build_app_config_succeeds_on_empty_environment() {
        let map: HashMap<&str, &str> = HashMap::new();
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.env, Environment::Development);
        assert_eq!(cfg.article_pool, 5);
        assert_eq!(cfg.page_pool, 10);
        assert_eq!(cfg.comment_threshold, 10);
        assert_eq!(cfg.max_comments, 300);
        assert_eq!(cfg.max_articles, 500);
        assert_eq!(cfg.max_pages, 2);
        assert!((cfg.low_drop_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.low_streak_trigger, 2);
        assert!(cfg.demographics_ui_fallback);
        assert!(!cfg.metadata_only);
        assert_eq!(cfg.batch_size, 20);
        assert!(cfg.render_url.is_none());
    }

    #[test]
    fn build_app_config_applies_overrides() {
        let mut map = HashMap::new();
        map.insert("NEWSWELL_ARTICLE_POOL", "8");
        map.insert("NEWSWELL_COMMENT_THRESHOLD", "25");
        map.insert("NEWSWELL_METADATA_ONLY", "true");
        map.insert("NEWSWELL_RENDER_URL", "http://localhost:3000");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.article_pool, 8);
        assert_eq!(cfg.comment_threshold, 25);
        assert!(cfg.metadata_only);
        assert_eq!(cfg.render_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn build_app_config_rejects_invalid_numeric() {
        let mut map = HashMap::new();
        map.insert("NEWSWELL_PAGE_POOL", "not-a-number");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "NEWSWELL_PAGE_POOL"),
            "expected InvalidEnvVar(NEWSWELL_PAGE_POOL), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_rejects_invalid_bool() {
        let mut map = HashMap::new();
        map.insert("NEWSWELL_METADATA_ONLY", "maybe");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "NEWSWELL_METADATA_ONLY"),
            "expected InvalidEnvVar(NEWSWELL_METADATA_ONLY), got: {result:?}"
        );
    }

    #[test]
    fn build_app_config_rejects_invalid_ratio() {
        let mut map = HashMap::new();
        map.insert("NEWSWELL_LOW_DROP_RATIO", "half");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "NEWSWELL_LOW_DROP_RATIO"),
            "expected InvalidEnvVar(NEWSWELL_LOW_DROP_RATIO), got: {result:?}"
        );
    }
}
