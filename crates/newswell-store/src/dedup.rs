//! Cross-run dedup store.
//!
//! Seeded once at startup by walking every prior run's article batches under
//! the output root; consulted (and marked) before any new work is scheduled.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use newswell_core::ItemReference;

#[derive(Debug, Default)]
pub struct SeenSet {
    keys: HashSet<String>,
}

impl SeenSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `output_root` recursively and seed the set from every
    /// `articles*.jsonl` file found. Malformed lines and unreadable files are
    /// skipped, not fatal. Returns the number of identifiers loaded.
    pub fn seed(&mut self, output_root: &Path) -> usize {
        let before = self.keys.len();
        if output_root.exists() {
            self.walk(output_root);
        }
        let loaded = self.keys.len() - before;
        if loaded > 0 {
            tracing::info!(
                loaded,
                root = %output_root.display(),
                "seeded dedup store from prior batch output"
            );
        }
        loaded
    }

    fn walk(&mut self, dir: &Path) {
        let Ok(entries) = fs::read_dir(dir) else {
            tracing::warn!(dir = %dir.display(), "unreadable directory during dedup seeding");
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path);
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.contains("articles") && name.ends_with(".jsonl") {
                self.seed_file(&path);
            }
        }
    }

    fn seed_file(&mut self, path: &Path) {
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to open history file");
                return;
            }
        };
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { return };
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
                continue;
            };
            if let (Some(oid), Some(aid)) = (value["oid"].as_str(), value["aid"].as_str()) {
                self.keys.insert(format!("{oid}/{aid}"));
            }
            if let Some(url) = value["url"].as_str() {
                self.keys.insert(url.to_owned());
            }
        }
    }

    #[must_use]
    pub fn seen(&self, item: &ItemReference) -> bool {
        self.keys.contains(&item.external_id()) || self.keys.contains(&item.url)
    }

    /// Mark an item before dispatching it — the check-then-act sequence spans
    /// a suspension point otherwise.
    pub fn mark(&mut self, item: &ItemReference) {
        self.keys.insert(item.external_id());
        self.keys.insert(item.url.clone());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn item(oid: &str, aid: &str) -> ItemReference {
        ItemReference {
            url: format!("https://n.news.naver.com/mnews/article/{oid}/{aid}"),
            oid: oid.to_string(),
            aid: aid.to_string(),
            title: "t".to_string(),
            published_at_raw: "1일 전".to_string(),
            keyword: "연금".to_string(),
        }
    }

    #[test]
    fn marked_items_stay_seen() {
        let mut seen = SeenSet::new();
        let a = item("001", "0000000001");
        assert!(!seen.seen(&a));
        seen.mark(&a);
        assert!(seen.seen(&a));
        assert!(seen.seen(&a), "seen must hold for the process lifetime");
    }

    #[test]
    fn seeding_dedupes_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let run1 = dir.path().join("run_a");
        let run2 = dir.path().join("run_b");
        fs::create_dir_all(&run1).unwrap();
        fs::create_dir_all(&run2).unwrap();

        let row = |oid: &str, aid: &str| {
            format!(
                r#"{{"oid":"{oid}","aid":"{aid}","url":"https://n.news.naver.com/mnews/article/{oid}/{aid}"}}"#
            )
        };

        // Two files, four rows, but only two distinct identifiers.
        let mut f1 = fs::File::create(run1.join("articles_batch_a_0001_1.jsonl")).unwrap();
        writeln!(f1, "{}", row("001", "0000000001")).unwrap();
        writeln!(f1, "{}", row("001", "0000000002")).unwrap();
        let mut f2 = fs::File::create(run2.join("articles_batch_b_0001_2.jsonl")).unwrap();
        writeln!(f2, "{}", row("001", "0000000001")).unwrap();
        writeln!(f2, "{}", row("001", "0000000002")).unwrap();

        let mut seen = SeenSet::new();
        seen.seed(dir.path());

        assert!(seen.seen(&item("001", "0000000001")));
        assert!(seen.seen(&item("001", "0000000002")));
        assert!(!seen.seen(&item("001", "0000000003")));
        // Each distinct article contributes an id key and a url key.
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("articles_batch_x_0001_1.jsonl")).unwrap();
        writeln!(f, "not json at all").unwrap();
        writeln!(
            f,
            r#"{{"oid":"025","aid":"0000000009","url":"https://n.news.naver.com/mnews/article/025/0000000009"}}"#
        )
        .unwrap();

        let mut seen = SeenSet::new();
        seen.seed(dir.path());
        assert!(seen.seen(&item("025", "0000000009")));
    }

    #[test]
    fn non_article_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("comments_batch_x_0001_1.jsonl")).unwrap();
        writeln!(
            f,
            r#"{{"oid":"001","aid":"0000000001","url":"https://n.news.naver.com/mnews/article/001/0000000001"}}"#
        )
        .unwrap();

        let mut seen = SeenSet::new();
        let loaded = seen.seed(dir.path());
        assert_eq!(loaded, 0);
    }

    #[test]
    fn seen_matches_by_url_when_only_url_was_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join("articles_old.jsonl")).unwrap();
        writeln!(
            f,
            r#"{{"url":"https://n.news.naver.com/mnews/article/032/0000000777"}}"#
        )
        .unwrap();

        let mut seen = SeenSet::new();
        seen.seed(dir.path());
        assert!(seen.seen(&item("032", "0000000777")));
    }
}
