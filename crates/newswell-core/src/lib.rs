mod app_config;
mod config;
mod records;
mod search_plan;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{
    ArticleRecord, CommentRecord, DemographicSnapshot, Disposition, ItemReference, RunErrorNote,
    RunStats,
};
pub use search_plan::{load_search_plan, SearchPlan};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read search plan {path}: {source}")]
    SearchPlanRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse search plan {path}: {source}")]
    SearchPlanParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
