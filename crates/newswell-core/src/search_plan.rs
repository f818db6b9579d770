use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// The keyword list and optional date window for a run, loaded from YAML.
///
/// Dates use the portal's `YYYY.MM.DD` form and are passed through to the
/// search query verbatim; both must be present for the window to apply.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPlan {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl SearchPlan {
    #[must_use]
    pub fn date_range(&self) -> Option<(&str, &str)> {
        match (self.start_date.as_deref(), self.end_date.as_deref()) {
            (Some(s), Some(e)) if !s.is_empty() && !e.is_empty() => Some((s, e)),
            _ => None,
        }
    }
}

/// Load the search plan from `path`.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read or parsed.
pub fn load_search_plan(path: &Path) -> Result<SearchPlan, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::SearchPlanRead {
        path: path.display().to_string(),
        source: e,
    })?;
    let plan: SearchPlan =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::SearchPlanParse {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(plan)
}
