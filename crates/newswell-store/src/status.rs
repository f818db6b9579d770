//! Periodic status snapshots for external monitoring.
//!
//! Fire-and-forget: every write is best-effort and failures are ignored —
//! monitoring must never affect the run.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use newswell_core::RunStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Ready,
    Starting,
    Searching,
    Completed,
}

#[derive(Debug, Serialize)]
struct StatusSnapshot {
    stage: RunStage,
    last_updated: u64,
    keyword: Option<String>,
    scanned: u64,
    collected: u64,
    errors_count: usize,
    circuit_breaker_tripped: bool,
}

pub struct StatusWriter {
    path: PathBuf,
    snapshot: StatusSnapshot,
}

impl StatusWriter {
    #[must_use]
    pub fn new(run_dir: &Path) -> Self {
        let mut writer = Self {
            path: run_dir.join("status.json"),
            snapshot: StatusSnapshot {
                stage: RunStage::Ready,
                last_updated: 0,
                keyword: None,
                scanned: 0,
                collected: 0,
                errors_count: 0,
                circuit_breaker_tripped: false,
            },
        };
        writer.write();
        writer
    }

    pub fn set_stage(&mut self, stage: RunStage) {
        self.snapshot.stage = stage;
        self.write();
    }

    pub fn set_keyword(&mut self, keyword: &str) {
        self.snapshot.keyword = Some(keyword.to_owned());
        self.write();
    }

    pub fn update_stats(&mut self, stats: &RunStats, breaker_tripped: bool) {
        self.snapshot.scanned = stats.scanned;
        self.snapshot.collected = stats.collected;
        self.snapshot.errors_count = stats.errors.len();
        self.snapshot.circuit_breaker_tripped = breaker_tripped;
        self.write();
    }

    fn write(&mut self) {
        self.snapshot.last_updated = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let Ok(json) = serde_json::to_string_pretty(&self.snapshot) else {
            return;
        };
        let _ = std::fs::write(&self.path, json);
    }
}
