// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed event history
//!
//! Every insert and range delete is appended to a JSON-lines operation log.
//! Opening the log replays it into the in-memory index; `compact` rewrites
//! the log with only the live records.

use crate::history::{check_range, EventHistoryStore, HistoryError, HistoryIndex, HistorySummary};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sy_core::{Clock, SystemClock};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogOp {
    Insert { hash: u64, ts: i64, count: u64 },
    Delete { hash: u64, from: i64, to: i64 },
}

struct LogState {
    file: File,
    index: HistoryIndex,
}

/// Durable history store backed by an append-only operation log
pub struct FileEventHistory<C: Clock = SystemClock> {
    path: PathBuf,
    clock: C,
    state: Mutex<LogState>,
}

impl FileEventHistory<SystemClock> {
    /// Open or create a history log at the given path
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> FileEventHistory<C> {
    pub fn open_with_clock(path: &Path, clock: C) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let index = replay(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            clock,
            state: Mutex::new(LogState { file, index }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the log so it holds only live records
    pub fn compact(&self) -> Result<(), HistoryError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let tmp_path = self.path.with_extension("compact");
        {
            let mut tmp = File::create(&tmp_path)?;
            for (hash, ts, count) in state.index.rows() {
                let line = serde_json::to_string(&LogOp::Insert { hash, ts, count })?;
                writeln!(tmp, "{}", line)?;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        state.file = OpenOptions::new().append(true).open(&self.path)?;
        tracing::debug!(path = %self.path.display(), records = state.index.len(), "history compacted");
        Ok(())
    }

    fn append(file: &mut File, op: &LogOp) -> Result<(), HistoryError> {
        let line = serde_json::to_string(op)?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        Ok(())
    }
}

impl<C: Clock> EventHistoryStore for FileEventHistory<C> {
    fn insert(&self, fingerprint: u64) -> Result<(), HistoryError> {
        let ts = self.clock.now_ms();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::append(
            &mut state.file,
            &LogOp::Insert {
                hash: fingerprint,
                ts,
                count: 1,
            },
        )?;
        state.index.insert(fingerprint, ts);
        Ok(())
    }

    fn select(
        &self,
        fingerprint: u64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<HistorySummary, HistoryError> {
        check_range(from_ms, to_ms)?;
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.index.select(fingerprint, from_ms, to_ms))
    }

    fn delete(&self, fingerprint: u64, from_ms: i64, to_ms: i64) -> Result<u64, HistoryError> {
        check_range(from_ms, to_ms)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Self::append(
            &mut state.file,
            &LogOp::Delete {
                hash: fingerprint,
                from: from_ms,
                to: to_ms,
            },
        )?;
        Ok(state.index.delete(fingerprint, from_ms, to_ms))
    }
}

/// Rebuild the index from the log.
///
/// Replay stops at the first corrupt line and the log is truncated there, so
/// later appends are not hidden behind garbage.
fn replay(path: &Path) -> Result<HistoryIndex, HistoryError> {
    let mut index = HistoryIndex::default();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(index),
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    let mut valid_len: u64 = 0;
    let mut line_no = 0usize;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(index);
        }
        line_no += 1;
        let record = match std::str::from_utf8(&line) {
            Ok(text) if text.trim_end().is_empty() => {
                valid_len += read as u64;
                continue;
            }
            Ok(text) => serde_json::from_str::<LogOp>(text.trim_end()).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match record {
            Ok(LogOp::Insert { hash, ts, count }) => {
                for _ in 0..count {
                    index.insert(hash, ts);
                }
            }
            Ok(LogOp::Delete { hash, from, to }) => {
                index.delete(hash, from, to);
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    line = line_no,
                    error = %error,
                    "corrupt history record, truncating log"
                );
                break;
            }
        }
        valid_len += read as u64;
    }

    OpenOptions::new().write(true).open(path)?.set_len(valid_len)?;
    Ok(index)
}

#[cfg(test)]
#[path = "history_log_tests.rs"]
mod tests;
