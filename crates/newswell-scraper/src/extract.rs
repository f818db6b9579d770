//! Identifier and link harvesting from portal markup.
//!
//! This is deliberately thin: regexes over raw HTML, no DOM. The acquisition
//! core only needs canonical article links, a title, and the raw date text —
//! anything it cannot recognize is discarded, not retried.

use std::collections::HashSet;

use regex::Regex;

use newswell_core::ItemReference;

/// Date text used when no recognizable date appears near a harvested link.
/// Its presence in a fast-path result is a strong signal the response was the
/// JS-only shell, which forces render escalation.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// The portal's own badge text. An anchor whose visible text is the badge has
/// no real headline — the same JS-only-response signal as [`UNKNOWN_DATE`].
pub const PORTAL_BADGE_TITLE: &str = "네이버뉴스";

const NO_TITLE: &str = "No Title";

/// Bytes of surrounding markup scanned for a headline and date per link.
const CARD_WINDOW: usize = 2000;

/// Rebuild the canonical article URL from the external identifier pair.
#[must_use]
pub fn canonical_article_url(oid: &str, aid: &str) -> String {
    format!("https://n.news.naver.com/mnews/article/{oid}/{aid}")
}

/// Extract the `(oid, aid)` external identifier pair from an article URL.
///
/// Two URL shapes are recognized: the path-embedded pair
/// (`…/article/{oid}/{aid}`) and the query-parameter pair
/// (`…?oid={oid}&aid={aid}`). Anything else yields `None` and the reference
/// is unusable.
#[must_use]
pub fn extract_external_id(url: &str) -> Option<(String, String)> {
    let path_re = Regex::new(r"article/(\d+)/(\d+)").expect("valid regex");
    if let Some(caps) = path_re.captures(url) {
        return Some((caps[1].to_string(), caps[2].to_string()));
    }

    let oid_re = Regex::new(r"oid=(\d+)").expect("valid regex");
    let aid_re = Regex::new(r"aid=(\d+)").expect("valid regex");
    match (oid_re.captures(url), aid_re.captures(url)) {
        (Some(o), Some(a)) => Some((o[1].to_string(), a[1].to_string())),
        _ => None,
    }
}

/// Harvest candidate article references from a search-results page.
///
/// Scans every anchor pointing at the portal's article host, extracts the
/// identifier pair, canonicalizes the URL, and dedupes. The headline is taken
/// from a `news_tit` anchor in the surrounding card when present, otherwise
/// from the anchor's own text; the raw date text is matched in the same card.
#[must_use]
pub fn harvest_search_links(html: &str, keyword: &str) -> Vec<ItemReference> {
    let anchor_re =
        Regex::new(r#"(?s)<a\s[^>]*href="([^"]*n\.news\.naver\.com[^"]*)"[^>]*>(.*?)</a>"#)
            .expect("valid regex");
    let title_re = Regex::new(r#"(?s)<a[^>]*class="[^"]*news_tit[^"]*"[^>]*>(.*?)</a>"#)
        .expect("valid regex");
    let date_re =
        Regex::new(r"(\d{4}\.\d{2}\.\d{2}\.?|\d+\s*(?:분|시간|일|주)\s*전)").expect("valid regex");

    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();

    for caps in anchor_re.captures_iter(html) {
        let href = decode_entities(&caps[1]);
        let Some((oid, aid)) = extract_external_id(&href) else {
            continue;
        };
        let url = canonical_article_url(&oid, &aid);
        if !seen.insert(url.clone()) {
            continue;
        }

        let anchor_start = caps.get(0).map_or(0, |m| m.start());
        let anchor_end = caps.get(0).map_or(anchor_start, |m| m.end());
        // The headline anchor and date text precede the article link within a
        // result card, so the nearest *preceding* match belongs to this card
        // even when the scan window spans a neighbor.
        let before = preceding_window(html, anchor_start);
        let after = following_window(html, anchor_end);

        let mut title = title_re
            .captures_iter(before)
            .last()
            .map(|t| strip_tags(&t[1]))
            .unwrap_or_default();
        if title.is_empty() {
            title = strip_tags(&caps[2]);
        }
        if title.is_empty() {
            title = NO_TITLE.to_string();
        }

        let published_at_raw = date_re
            .find_iter(before)
            .last()
            .or_else(|| date_re.find(after))
            .map_or_else(|| UNKNOWN_DATE.to_string(), |m| m.as_str().to_string());

        items.push(ItemReference {
            url,
            oid,
            aid,
            title,
            published_at_raw,
            keyword: keyword.to_string(),
        });
    }

    items
}

/// Slice of `html` ending at `end`, clamped to a char boundary so multibyte
/// headline text can never split a slice.
fn preceding_window(html: &str, end: usize) -> &str {
    let mut start = end.saturating_sub(CARD_WINDOW);
    while start > 0 && !html.is_char_boundary(start) {
        start -= 1;
    }
    &html[start..end]
}

/// Short slice of `html` starting at `start`, for layouts that place the date
/// after the article link.
fn following_window(html: &str, start: usize) -> &str {
    let mut end = (start + CARD_WINDOW / 4).min(html.len());
    while end < html.len() && !html.is_char_boundary(end) {
        end += 1;
    }
    &html[start..end]
}

fn strip_tags(fragment: &str) -> String {
    let tag_re = Regex::new(r"<[^>]*>").expect("valid regex");
    let text = tag_re.replace_all(fragment, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    decode_entities(&collapsed)
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_path_embedded_pair() {
        let url = "https://n.news.naver.com/mnews/article/001/0001234567";
        assert_eq!(
            extract_external_id(url),
            Some(("001".to_string(), "0001234567".to_string()))
        );
    }

    #[test]
    fn extracts_query_parameter_pair() {
        let url = "https://news.naver.com/main/read.naver?oid=025&aid=0009876543";
        assert_eq!(
            extract_external_id(url),
            Some(("025".to_string(), "0009876543".to_string()))
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let url = "https://n.news.naver.com/mnews/article/001/0001234567?sid=101";
        let first = extract_external_id(url);
        let second = extract_external_id(url);
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[test]
    fn unusable_urls_yield_none() {
        assert_eq!(extract_external_id("https://n.news.naver.com/mnews"), None);
        assert_eq!(extract_external_id("https://example.com/article/abc"), None);
        // oid without aid is not enough
        assert_eq!(
            extract_external_id("https://news.naver.com/read?oid=001"),
            None
        );
    }

    #[test]
    fn canonical_url_round_trips_through_extraction() {
        let url = canonical_article_url("001", "0001234567");
        assert_eq!(
            extract_external_id(&url),
            Some(("001".to_string(), "0001234567".to_string()))
        );
    }

    fn card(oid: &str, aid: &str, title: &str, date: &str) -> String {
        format!(
            r#"<div class="news_area">
                 <a href="https://press.example.com/x" class="news_tit">{title}</a>
                 <div class="info_group"><span class="info">{date}</span>
                   <a class="info" href="https://n.news.naver.com/mnews/article/{oid}/{aid}">네이버뉴스</a>
                 </div>
               </div>"#
        )
    }

    #[test]
    fn harvests_titles_dates_and_ids_from_cards() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            card("001", "0001111111", "연금 개혁안 국회 통과", "2026.08.01."),
            card("025", "0002222222", "기초연금 인상 논의", "3시간 전"),
        );
        let items = harvest_search_links(&html, "연금");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].oid, "001");
        assert_eq!(items[0].title, "연금 개혁안 국회 통과");
        assert_eq!(items[0].published_at_raw, "2026.08.01.");
        assert_eq!(items[0].keyword, "연금");
        assert_eq!(items[1].title, "기초연금 인상 논의");
        assert_eq!(items[1].published_at_raw, "3시간 전");
        assert_eq!(
            items[1].url,
            "https://n.news.naver.com/mnews/article/025/0002222222"
        );
    }

    #[test]
    fn dedupes_repeated_links_to_the_same_article() {
        let html = format!(
            "{}{}",
            card("001", "0001111111", "같은 기사", "1일 전"),
            card("001", "0001111111", "같은 기사", "1일 전"),
        );
        let items = harvest_search_links(&html, "연금");
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn badge_only_anchor_keeps_placeholder_title_and_date() {
        // A JS-only shell: the article link exists but there is no headline
        // anchor and no date text anywhere near it.
        let html = r#"<a href="https://n.news.naver.com/mnews/article/001/0003333333">네이버뉴스</a>"#;
        let items = harvest_search_links(html, "연금");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, PORTAL_BADGE_TITLE);
        assert_eq!(items[0].published_at_raw, UNKNOWN_DATE);
    }

    #[test]
    fn entity_encoded_hrefs_are_decoded_before_extraction() {
        let html = r#"<a href="https://news.naver.com/read?oid=032&amp;aid=0004444444">제목이 충분히 긴 기사</a>"#;
        let items = harvest_search_links(html, "연금");
        assert_eq!(items.len(), 0, "host filter requires the article host");

        let html = r#"<a href="https://n.news.naver.com/read?oid=032&amp;aid=0004444444">제목이 충분히 긴 기사</a>"#;
        let items = harvest_search_links(html, "연금");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].oid, "032");
        assert_eq!(items[0].aid, "0004444444");
    }
}
