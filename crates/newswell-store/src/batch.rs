//! Buffered JSONL batch writer with atomic publication.
//!
//! Records accumulate in memory and flush as uniquely named batch files:
//! rows are written to `<final>.tmp` and the tmp file is renamed into place,
//! so a reader can never observe a partially written batch. Filenames encode
//! run id, per-kind sequence number, and the writer's PID, which keeps names
//! unique even across concurrent processes sharing an output root.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use newswell_core::{ArticleRecord, CommentRecord};

use crate::error::StoreError;

const TMP_SUFFIX: &str = ".tmp";

pub struct BatchPersister {
    run_dir: PathBuf,
    run_id: String,
    pid: u32,
    batch_size: usize,
    article_buffer: Vec<ArticleRecord>,
    comment_buffer: Vec<CommentRecord>,
    article_batch_idx: u32,
    comment_batch_idx: u32,
}

impl BatchPersister {
    /// Create the persister and its per-run output directory
    /// (`<output_root>/run_<run_id>/`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the run directory cannot be created.
    pub fn new(
        output_root: &Path,
        run_id: &str,
        batch_size: usize,
    ) -> Result<Self, StoreError> {
        let run_dir = output_root.join(format!("run_{run_id}"));
        fs::create_dir_all(&run_dir).map_err(|e| StoreError::Io {
            path: run_dir.clone(),
            source: e,
        })?;
        Ok(Self {
            run_dir,
            run_id: run_id.to_owned(),
            pid: std::process::id(),
            batch_size: batch_size.max(1),
            article_buffer: Vec::new(),
            comment_buffer: Vec::new(),
            article_batch_idx: 0,
            comment_batch_idx: 0,
        })
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn buffer_article(&mut self, record: ArticleRecord) {
        self.article_buffer.push(record);
    }

    pub fn buffer_comments(&mut self, records: Vec<CommentRecord>) {
        self.comment_buffer.extend(records);
    }

    /// Flush any buffer that has reached the batch size; with `force`, flush
    /// everything regardless (end of run).
    ///
    /// A failed write drops that flush's rows — best-effort durability, the
    /// run continues.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] encountered; buffers are cleared
    /// either way.
    pub fn flush(&mut self, force: bool) -> Result<(), StoreError> {
        let mut first_err = None;

        let article_due = !self.article_buffer.is_empty()
            && (force || self.article_buffer.len() >= self.batch_size);
        if article_due {
            self.article_batch_idx += 1;
            let path = self.batch_path("articles_batch", self.article_batch_idx);
            let rows = std::mem::take(&mut self.article_buffer);
            if let Err(e) = write_batch(&rows, &path) {
                tracing::error!(path = %path.display(), error = %e, "article batch write failed — rows dropped");
                first_err = Some(e);
            }
        }

        let comment_due = !self.comment_buffer.is_empty()
            && (force || self.comment_buffer.len() >= self.batch_size);
        if comment_due {
            self.comment_batch_idx += 1;
            let path = self.batch_path("comments_batch", self.comment_batch_idx);
            let rows = std::mem::take(&mut self.comment_buffer);
            if let Err(e) = write_batch(&rows, &path) {
                tracing::error!(path = %path.display(), error = %e, "comment batch write failed — rows dropped");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn batch_path(&self, prefix: &str, idx: u32) -> PathBuf {
        self.run_dir
            .join(format!("{prefix}_{}_{idx:04}_{}.jsonl", self.run_id, self.pid))
    }
}

/// Serialize `rows` as JSON lines into `<final_path>.tmp`, then atomically
/// rename into place. On any failure the tmp file is removed.
fn write_batch<T: Serialize>(rows: &[T], final_path: &Path) -> Result<(), StoreError> {
    let tmp_path = tmp_path_for(final_path);

    let result = (|| -> Result<(), StoreError> {
        let mut file = fs::File::create(&tmp_path).map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        for row in rows {
            let line = serde_json::to_string(row)?;
            file.write_all(line.as_bytes()).map_err(|e| StoreError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
            file.write_all(b"\n").map_err(|e| StoreError::Io {
                path: tmp_path.clone(),
                source: e,
            })?;
        }
        file.sync_all().map_err(|e| StoreError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, final_path).map_err(|e| StoreError::Io {
            path: final_path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    })();

    if result.is_err() && tmp_path.exists() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn tmp_path_for(final_path: &Path) -> PathBuf {
    let mut s = final_path.as_os_str().to_owned();
    s.push(TMP_SUFFIX);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use newswell_core::{DemographicSnapshot, Disposition};

    fn article(aid: &str) -> ArticleRecord {
        ArticleRecord {
            run_id: "20260807_120000".to_string(),
            collected_at: Utc::now(),
            keyword: "연금".to_string(),
            title: "기사".to_string(),
            url: format!("https://n.news.naver.com/mnews/article/001/{aid}"),
            oid: "001".to_string(),
            aid: aid.to_string(),
            published_at_raw: "2026.08.01.".to_string(),
            comment_count_api: 20,
            comment_count_ui: 20,
            comments_collected: true,
            comments_collected_n: 20,
            disposition: Disposition::Collected,
            demographics: DemographicSnapshot::unavailable(),
        }
    }

    fn list_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn buffered_rows_stay_in_memory_below_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = BatchPersister::new(dir.path(), "r1", 10).unwrap();
        persister.buffer_article(article("0000000001"));
        persister.flush(false).unwrap();
        assert!(list_files(persister.run_dir()).is_empty());
    }

    #[test]
    fn flush_writes_exactly_one_file_with_one_line_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = BatchPersister::new(dir.path(), "r1", 3).unwrap();
        for i in 0..3 {
            persister.buffer_article(article(&format!("{i:010}")));
        }
        persister.flush(false).unwrap();

        let files = list_files(persister.run_dir());
        assert_eq!(files.len(), 1, "exactly one batch file: {files:?}");
        assert!(files[0].starts_with("articles_batch_r1_0001_"));
        assert!(files[0].ends_with(".jsonl"));
        assert!(!files.iter().any(|f| f.ends_with(TMP_SUFFIX)));

        let content = fs::read_to_string(persister.run_dir().join(&files[0])).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["disposition"], "collected");
        }
    }

    #[test]
    fn forced_flush_writes_partial_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = BatchPersister::new(dir.path(), "r1", 100).unwrap();
        persister.buffer_article(article("0000000001"));
        persister.buffer_comments(vec![CommentRecord {
            run_id: "r1".to_string(),
            article_url: "https://n.news.naver.com/mnews/article/001/0000000001".to_string(),
            comment_id: "c1".to_string(),
            comment_text: "동의합니다".to_string(),
            comment_created_at: "2026-08-01T12:00:00+0900".to_string(),
            author: "김**".to_string(),
            sympathy_count: 5,
            antipathy_count: 0,
        }]);
        persister.flush(true).unwrap();

        let files = list_files(persister.run_dir());
        assert_eq!(files.len(), 2, "one article batch + one comment batch: {files:?}");
        assert!(files.iter().any(|f| f.starts_with("articles_batch_")));
        assert!(files.iter().any(|f| f.starts_with("comments_batch_")));
    }

    #[test]
    fn sequence_numbers_increment_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = BatchPersister::new(dir.path(), "r1", 1).unwrap();
        persister.buffer_article(article("0000000001"));
        persister.flush(false).unwrap();
        persister.buffer_article(article("0000000002"));
        persister.flush(false).unwrap();

        let files = list_files(persister.run_dir());
        assert_eq!(files.len(), 2);
        assert!(files[0].contains("_0001_"));
        assert!(files[1].contains("_0002_"));
    }

    #[test]
    fn failed_flush_leaves_no_tmp_file_and_drops_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut persister = BatchPersister::new(dir.path(), "r1", 1).unwrap();
        persister.buffer_article(article("0000000001"));

        // Remove the run directory out from under the writer to force an
        // I/O failure on the tmp create.
        fs::remove_dir_all(persister.run_dir()).unwrap();
        let result = persister.flush(false);
        assert!(result.is_err());

        // Buffer was dropped: recreating the directory and flushing again
        // writes nothing.
        fs::create_dir_all(persister.run_dir()).unwrap();
        persister.flush(true).unwrap();
        let files = list_files(persister.run_dir());
        assert!(files.is_empty(), "dropped rows must not reappear: {files:?}");
    }
}
