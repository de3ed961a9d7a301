//! Bounded, append-only ledger of distribution runs.
//!
//! Entries carry a monotonically increasing sequence number. Once the cap is
//! exceeded the oldest entries are evicted first. The ledger can optionally be
//! backed by a JSONL file: appends and compaction both run under an exclusive
//! lock on a sidecar `.lock` file, and opening replays the file keeping only
//! the newest `cap` entries.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::{DistributionReport, LedgerEntry};

/// Retention cap used when none is configured
pub const DEFAULT_LEDGER_CAP: usize = 1000;

/// Append-only run history with FIFO eviction
#[derive(Debug)]
pub struct DistributionLedger {
    entries: VecDeque<LedgerEntry>,
    cap: usize,
    next_sequence: u64,
    file: Option<LedgerFile>,
}

#[derive(Debug)]
struct LedgerFile {
    path: PathBuf,
    /// Evicted entries still present in the file
    stale_lines: usize,
}

impl Default for DistributionLedger {
    fn default() -> Self {
        Self::in_memory(DEFAULT_LEDGER_CAP)
    }
}

impl DistributionLedger {
    /// Create a ledger that only lives in memory.
    ///
    /// A cap of zero is treated as one.
    pub fn in_memory(cap: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cap: cap.max(1),
            next_sequence: 1,
            file: None,
        }
    }

    /// Open a file-backed ledger, replaying existing entries
    pub async fn open(path: impl Into<PathBuf>, cap: usize) -> Result<Self> {
        let path = path.into();
        let mut ledger = Self::in_memory(cap);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create ledger directory: {}", parent.display()))?;
        }

        let mut total_lines = 0usize;
        if path.exists() {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read ledger: {}", path.display()))?;

            for line in content.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                let entry: LedgerEntry = match serde_json::from_str(line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable ledger line");
                        continue;
                    }
                };
                total_lines += 1;
                ledger.next_sequence = ledger.next_sequence.max(entry.sequence + 1);
                ledger.entries.push_back(entry);
                ledger.evict_oldest_if_over(ledger.cap);
            }
        }

        debug!(
            path = %path.display(),
            entries = ledger.entries.len(),
            next_sequence = ledger.next_sequence,
            "Opened ledger"
        );

        ledger.file = Some(LedgerFile {
            path,
            stale_lines: total_lines - ledger.entries.len(),
        });

        Ok(ledger)
    }

    /// Append a report, returning its sequence number
    pub fn append(&mut self, report: DistributionReport) -> Result<u64> {
        let entry = LedgerEntry {
            sequence: self.next_sequence,
            report,
        };

        if let Some(ref file) = self.file {
            append_line(&file.path, &entry)?;
        }

        self.next_sequence += 1;
        self.entries.push_back(entry);
        let evicted = self.evict_oldest_if_over(self.cap);

        if evicted > 0 {
            if let Some(ref mut file) = self.file {
                file.stale_lines += evicted;
            }
            // Stale lines stay in the file until a later compaction succeeds
            if let Err(e) = self.compact_if_needed() {
                warn!(error = %format!("{:#}", e), "Ledger compaction failed");
            }
        }

        Ok(self.next_sequence - 1)
    }

    /// The last `n` reports, oldest first
    pub fn recent(&self, n: usize) -> Vec<DistributionReport> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries
            .iter()
            .skip(skip)
            .map(|e| e.report.clone())
            .collect()
    }

    /// The last `n` entries with their sequence numbers, oldest first
    pub fn recent_entries(&self, n: usize) -> Vec<&LedgerEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    /// Drop the oldest entries until at most `cap` remain
    pub fn evict_oldest_if_over(&mut self, cap: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > cap {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.entries.back()
    }

    /// Number of runs ever recorded (including evicted ones)
    pub fn runs_recorded(&self) -> u64 {
        self.next_sequence - 1
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(|f| f.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the backing file once it holds `cap` evicted lines
    fn compact_if_needed(&mut self) -> Result<()> {
        let Some(ref mut file) = self.file else {
            return Ok(());
        };
        if file.stale_lines < self.cap {
            return Ok(());
        }

        let _lock = lock_ledger(&file.path)?;

        let tmp_path = file.path.with_extension("jsonl.tmp");
        let mut buffer = String::new();
        for entry in &self.entries {
            buffer.push_str(&serde_json::to_string(entry).context("Failed to serialize ledger entry")?);
            buffer.push('\n');
        }

        std::fs::write(&tmp_path, buffer)
            .with_context(|| format!("Failed to write ledger: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &file.path)
            .with_context(|| format!("Failed to replace ledger: {}", file.path.display()))?;

        debug!(removed = file.stale_lines, "Compacted ledger file");
        file.stale_lines = 0;
        Ok(())
    }
}

/// Take the exclusive ledger lock; released when the handle is dropped
fn lock_ledger(path: &Path) -> Result<File> {
    let lock_path = path.with_extension("jsonl.lock");
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open ledger lock: {}", lock_path.display()))?;

    lock.lock_exclusive()
        .context("Failed to acquire file lock on ledger")?;

    Ok(lock)
}

/// Append one entry under the ledger lock
fn append_line(path: &Path, entry: &LedgerEntry) -> Result<()> {
    let _lock = lock_ledger(path)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open ledger: {}", path.display()))?;

    let json = serde_json::to_string(entry).context("Failed to serialize ledger entry")?;
    writeln!(file, "{}", json).context("Failed to write ledger entry")?;
    file.flush().context("Failed to flush ledger entry")?;

    // Lock is released when `_lock` is dropped
    Ok(())
}
