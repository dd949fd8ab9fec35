//! Memoised ingestion keyed by the identity of the source file.
//!
//! A session owns one `SnapshotCache`. Asking for the snapshot again while the
//! file on disk is unchanged hands back the same `Arc`; a refresh always
//! re-reads the file and swaps the whole snapshot.

use crate::config::ReportConfig;
use crate::error::Result;
use crate::loader::{load_and_clean, Snapshot};
use chrono::NaiveDateTime;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// What we know about the source file when it was last read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceStamp {
    pub fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(SourceStamp {
            path: path.to_path_buf(),
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

#[derive(Debug)]
pub struct SnapshotCache {
    config: ReportConfig,
    entry: Option<(SourceStamp, Arc<Snapshot>)>,
}

impl SnapshotCache {
    pub fn new(config: ReportConfig) -> Self {
        SnapshotCache {
            config,
            entry: None,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// The snapshot held right now, if any, without touching the disk.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.entry.as_ref().map(|(_, snapshot)| Arc::clone(snapshot))
    }

    /// Return the cached snapshot if the source is unchanged, else load it.
    pub fn load(&mut self, now: NaiveDateTime) -> Result<Arc<Snapshot>> {
        let stamp = SourceStamp::of(&self.config.source)?;
        if let Some((cached, snapshot)) = &self.entry {
            if *cached == stamp {
                debug!("Source {} unchanged, reusing snapshot", stamp.path.display());
                return Ok(Arc::clone(snapshot));
            }
        }
        self.replace(stamp, now)
    }

    /// Re-read the source even if it looks unchanged.
    pub fn refresh(&mut self, now: NaiveDateTime) -> Result<Arc<Snapshot>> {
        let stamp = SourceStamp::of(&self.config.source)?;
        self.replace(stamp, now)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    // On failure the previous snapshot, if any, stays in place.
    fn replace(&mut self, stamp: SourceStamp, now: NaiveDateTime) -> Result<Arc<Snapshot>> {
        let snapshot = Arc::new(load_and_clean(&self.config, now)?);
        info!(
            "Loaded {} rows from {} ({} kept in window)",
            snapshot.report.total_rows,
            stamp.path.display(),
            snapshot.report.kept_rows
        );
        self.entry = Some((stamp, Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}
