//! Rendered-page resolver for demographics and the UI comment count.
//!
//! The comment API usually carries the audience breakdown; when it does not,
//! the article page's chart widget is the only remaining source. The core
//! treats this as an opaque, possibly-unavailable collaborator — every parse
//! miss degrades to "unavailable", never to an error.

use regex::Regex;

use newswell_core::DemographicSnapshot;

use crate::error::ScrapeError;
use crate::render::RenderClient;

/// Title and comment count as shown in the article page UI.
#[derive(Debug, Clone)]
pub struct ArticleDetails {
    pub title: String,
    pub comment_count_ui: u64,
}

pub struct UiResolver {
    render: RenderClient,
}

impl UiResolver {
    #[must_use]
    pub fn new(render: RenderClient) -> Self {
        Self { render }
    }

    /// Render the article page and read the demographic chart.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] only for render/transport failures; a page
    /// without a chart resolves to an unavailable snapshot.
    pub async fn resolve_demographics(
        &self,
        url: &str,
    ) -> Result<DemographicSnapshot, ScrapeError> {
        let html = self.render.content(url).await?;
        Ok(parse_demographics_html(&html))
    }

    /// Render the article page and read the headline and UI comment count.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] only for render/transport failures; missing
    /// elements resolve to an empty title / zero count.
    pub async fn resolve_article_details(&self, url: &str) -> Result<ArticleDetails, ScrapeError> {
        let html = self.render.content(url).await?;
        Ok(parse_article_details_html(&html))
    }
}

/// Read the gender/age chart out of rendered article HTML.
///
/// All-or-nothing: both gender percentages and at least six age buckets must
/// parse, otherwise the snapshot is unavailable. A seventh bucket (70s) is
/// summed into the 60-plus bucket.
fn parse_demographics_html(html: &str) -> DemographicSnapshot {
    if !html.contains("u_cbox_chart_cont") {
        return DemographicSnapshot::unavailable();
    }

    let male_re = Regex::new(
        r#"(?s)u_cbox_chart_male.*?u_cbox_chart_per[^>]*>\s*([0-9.]+)\s*%"#,
    )
    .expect("valid regex");
    let female_re = Regex::new(
        r#"(?s)u_cbox_chart_female.*?u_cbox_chart_per[^>]*>\s*([0-9.]+)\s*%"#,
    )
    .expect("valid regex");
    let per_re = Regex::new(r"u_cbox_chart_per[^>]*>\s*([0-9.]+)\s*%").expect("valid regex");

    let parse_pct = |caps: regex::Captures<'_>| caps[1].parse::<f64>().ok();

    let Some(male) = male_re.captures(html).and_then(parse_pct) else {
        return DemographicSnapshot::unavailable();
    };
    let Some(female) = female_re.captures(html).and_then(parse_pct) else {
        return DemographicSnapshot::unavailable();
    };

    // Age bars live after the gender section; scan from the age container on.
    let Some(age_start) = html.find("u_cbox_chart_age") else {
        return DemographicSnapshot::unavailable();
    };
    let age_values: Vec<f64> = per_re
        .captures_iter(&html[age_start..])
        .filter_map(|c| c[1].parse::<f64>().ok())
        .collect();
    if age_values.len() < 6 {
        return DemographicSnapshot::unavailable();
    }

    let mut sixty_plus = age_values[5];
    if age_values.len() >= 7 {
        sixty_plus += age_values[6];
    }

    DemographicSnapshot::from_parts(
        male,
        female,
        [
            age_values[0],
            age_values[1],
            age_values[2],
            age_values[3],
            age_values[4],
            sixty_plus,
        ],
    )
}

fn parse_article_details_html(html: &str) -> ArticleDetails {
    let title_re = Regex::new(
        r#"(?s)<h2[^>]*(?:id="title_area"|class="[^"]*media_end_head_headline[^"]*")[^>]*>(.*?)</h2>"#,
    )
    .expect("valid regex");
    let tag_re = Regex::new(r"<[^>]*>").expect("valid regex");
    let count_re = Regex::new(r#"u_cbox_count[^>]*>\s*([0-9,]+)\s*<"#).expect("valid regex");

    let title = title_re
        .captures(html)
        .map(|c| {
            let text = tag_re.replace_all(&c[1], " ");
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .unwrap_or_default();

    let comment_count_ui = count_re
        .captures(html)
        .and_then(|c| c[1].replace(',', "").parse::<u64>().ok())
        .unwrap_or(0);

    ArticleDetails {
        title,
        comment_count_ui,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART_HTML: &str = r#"
        <div class="u_cbox_chart_cont">
          <div class="u_cbox_chart_male"><span class="u_cbox_chart_per">58.3%</span></div>
          <div class="u_cbox_chart_female"><span class="u_cbox_chart_per">41.7%</span></div>
          <div class="u_cbox_chart_age">
            <span class="u_cbox_chart_per">1.0%</span>
            <span class="u_cbox_chart_per">4.0%</span>
            <span class="u_cbox_chart_per">12.0%</span>
            <span class="u_cbox_chart_per">28.0%</span>
            <span class="u_cbox_chart_per">33.0%</span>
            <span class="u_cbox_chart_per">18.0%</span>
            <span class="u_cbox_chart_per">4.0%</span>
          </div>
        </div>"#;

    #[test]
    fn parses_full_chart_and_sums_final_buckets() {
        let snap = parse_demographics_html(CHART_HTML);
        assert!(snap.demographic_available);
        assert_eq!(snap.male_ratio, Some(58.3));
        assert_eq!(snap.female_ratio, Some(41.7));
        assert_eq!(snap.age_50s, Some(33.0));
        assert_eq!(snap.age_60_plus, Some(22.0));
    }

    #[test]
    fn page_without_chart_is_unavailable() {
        let snap = parse_demographics_html("<html><body>기사 본문</body></html>");
        assert!(!snap.demographic_available);
        assert!(snap.male_ratio.is_none());
    }

    #[test]
    fn incomplete_age_bars_are_unavailable() {
        let html = r#"
            <div class="u_cbox_chart_cont">
              <div class="u_cbox_chart_male"><span class="u_cbox_chart_per">50%</span></div>
              <div class="u_cbox_chart_female"><span class="u_cbox_chart_per">50%</span></div>
              <div class="u_cbox_chart_age">
                <span class="u_cbox_chart_per">10%</span>
                <span class="u_cbox_chart_per">20%</span>
              </div>
            </div>"#;
        assert!(!parse_demographics_html(html).demographic_available);
    }

    #[test]
    fn reads_title_and_comma_separated_comment_count() {
        let html = r#"
            <h2 id="title_area"><span>연금 개혁, 다시 <b>원점</b>으로</span></h2>
            <a class="u_cbox_btn"><span class="u_cbox_count">1,234</span></a>"#;
        let details = parse_article_details_html(html);
        assert_eq!(details.title, "연금 개혁, 다시 원점 으로");
        assert_eq!(details.comment_count_ui, 1234);
    }

    #[test]
    fn missing_count_reads_as_zero() {
        let details = parse_article_details_html("<h2 id=\"title_area\">제목</h2>");
        assert_eq!(details.comment_count_ui, 0);
        assert_eq!(details.title, "제목");
    }
}
