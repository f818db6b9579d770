use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Another live process holds the run lock. The one fatal error in the
    /// taxonomy: the run aborts before doing any work.
    #[error("run lock is held by live process {pid} ({path})")]
    LockContention { pid: u32, path: PathBuf },
}
