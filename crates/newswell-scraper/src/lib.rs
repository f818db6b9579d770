//! HTTP acquisition layer: search-page harvesting with render-service
//! escalation, the comment API client, and the UI demographic resolver.

mod backoff;
mod comments;
mod error;
mod extract;
mod render;
mod search;
mod ui;

pub use comments::{ApiComment, CommentFetcher, CommentThread, SocialInfo, TEMPLATE_CANDIDATES};
pub use error::ScrapeError;
pub use extract::{
    canonical_article_url, extract_external_id, harvest_search_links, PORTAL_BADGE_TITLE,
    UNKNOWN_DATE,
};
pub use render::RenderClient;
pub use search::{SearchAcquirer, SearchPage};
pub use ui::{ArticleDetails, UiResolver};
