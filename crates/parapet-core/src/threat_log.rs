use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::report::ThreatReport;

/// Store key holding the bounded report sequence.
pub const THREAT_LOG_KEY: &str = "threatLogs";

/// On-disk shape: a key-value entry under `threatLogs`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LogDoc {
    #[serde(rename = "threatLogs", default)]
    entries: Vec<ThreatReport>,
}

/// Append to a bounded sequence: append-then-truncate-from-front, oldest
/// evicted first.
pub fn push_bounded(entries: &mut Vec<ThreatReport>, report: ThreatReport, capacity: usize) {
    entries.push(report);
    if entries.len() > capacity {
        let excess = entries.len() - capacity;
        entries.drain(..excess);
    }
}

/// The persisted, bounded threat log. Mutated only by the relay; the
/// read-modify-write in [`ThreatLogStore::append`] holds an exclusive file
/// lock for the whole cycle.
pub struct ThreatLogStore {
    path: PathBuf,
    capacity: usize,
}

impl ThreatLogStore {
    pub fn new(path: PathBuf, capacity: usize) -> Self {
        Self { path, capacity }
    }

    /// Store at the default platform data path, or `None` when no data
    /// dir can be resolved (logging degrades to off).
    pub fn at_default_path(capacity: usize) -> Option<Self> {
        default_log_path().map(|p| Self::new(p, capacity))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one report. Never panics and never surfaces failure to the
    /// relay's caller; a write problem costs this one entry only.
    pub fn append(&self, report: ThreatReport) {
        // PARAPET_LOG=0 disables local retention entirely.
        if std::env::var("PARAPET_LOG").ok().as_deref() == Some("0") {
            return;
        }

        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!(
                    "parapet: threat log: cannot create dir {}: {e}",
                    parent.display()
                );
                return;
            }
        }

        let mut open_opts = OpenOptions::new();
        open_opts.create(true).read(true).write(true);
        #[cfg(unix)]
        open_opts.mode(0o600);
        let mut file = match open_opts.open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("parapet: threat log: cannot open {}: {e}", self.path.display());
                return;
            }
        };

        if let Err(e) = file.lock_exclusive() {
            eprintln!("parapet: threat log: cannot lock {}: {e}", self.path.display());
            return;
        }

        // Read-append-truncate-write under the lock.
        let mut content = String::new();
        if let Err(e) = file.read_to_string(&mut content) {
            eprintln!("parapet: threat log: read failed: {e}");
            let _ = fs2::FileExt::unlock(&file);
            return;
        }
        let mut doc: LogDoc = if content.trim().is_empty() {
            LogDoc::default()
        } else {
            serde_json::from_str(&content).unwrap_or_else(|e| {
                eprintln!("parapet: threat log: corrupt store, starting fresh: {e}");
                LogDoc::default()
            })
        };

        push_bounded(&mut doc.entries, report, self.capacity);

        let serialized = match serde_json::to_string(&doc) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("parapet: threat log: serialize failed: {e}");
                let _ = fs2::FileExt::unlock(&file);
                return;
            }
        };

        if let Err(e) = file.seek(SeekFrom::Start(0)) {
            eprintln!("parapet: threat log: seek failed: {e}");
            let _ = fs2::FileExt::unlock(&file);
            return;
        }
        if let Err(e) = file.set_len(0) {
            eprintln!("parapet: threat log: truncate failed: {e}");
            let _ = fs2::FileExt::unlock(&file);
            return;
        }
        if let Err(e) = file.write_all(serialized.as_bytes()) {
            eprintln!("parapet: threat log: write failed: {e}");
        }
        if let Err(e) = file.sync_all() {
            eprintln!("parapet: threat log: sync failed: {e}");
        }
        let _ = fs2::FileExt::unlock(&file);
    }

    /// Read the current sequence. A missing or corrupt store reads as
    /// empty.
    pub fn read(&self) -> Vec<ThreatReport> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<LogDoc>(&content) {
            Ok(doc) => doc.entries,
            Err(e) => {
                eprintln!("parapet: threat log: corrupt store: {e}");
                Vec::new()
            }
        }
    }

    /// Drop all entries, keeping the store file.
    pub fn clear(&self) {
        if !self.path.exists() {
            return;
        }
        let doc = LogDoc::default();
        if let Ok(serialized) = serde_json::to_string(&doc) {
            if let Err(e) = fs::write(&self.path, serialized) {
                eprintln!("parapet: threat log: clear failed: {e}");
            }
        }
    }
}

fn default_log_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|d| d.join("threat_logs.json"))
}
