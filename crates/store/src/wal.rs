// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL write-ahead log.
//!
//! Each mutation is durably appended before it is applied to
//! `MaterializedState`, enabling crash recovery via snapshot + replay.
//! Each entry is a single line of JSON: `{"seq":N,"event":{...}}\n`.

use crate::event::Event;
use crate::StoreError;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(serde::Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(serde::Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// Append-only JSONL WAL with explicit `flush()` (no background group
/// commit timer here — the supervisor flushes after every mutating call,
/// spec.md §4.1 "update_execution_status is serializable per execution id").
pub struct Wal {
    file: File,
    path: PathBuf,
    write_seq: u64,
}

impl Wal {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let write_seq = Self::scan_max_seq(&file)?;

        Ok(Self {
            file,
            path: path.to_owned(),
            write_seq,
        })
    }

    fn scan_max_seq(file: &File) -> Result<u64, StoreError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        let mut max_seq = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<WalRecord>(trimmed) {
                Ok(r) => max_seq = max_seq.max(r.seq),
                Err(_) => {
                    warn!("corrupt WAL tail, stopping scan");
                    break;
                }
            }
        }
        Ok(max_seq)
    }

    /// Append and immediately durably flush one event.
    pub fn append(&mut self, event: &Event) -> Result<u64, StoreError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, event };
        let mut bytes = serde_json::to_vec(&record)?;
        bytes.push(b'\n');
        self.file.write_all(&bytes)?;
        self.file.sync_all()?;
        Ok(seq)
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// All entries with seq strictly greater than `seq`, in order. Used for
    /// recovery (replay after the last snapshot).
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, StoreError> {
        let mut reader = BufReader::new(self.file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;
        let mut entries = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
                Err(e) => return Err(e.into()),
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: WalRecord = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(_) => break,
            };
            if record.seq > seq {
                entries.push(WalEntry {
                    seq: record.seq,
                    event: record.event,
                });
            }
        }
        Ok(entries)
    }

    /// Replace the WAL file with only entries at or after `seq`, called
    /// after a snapshot has captured everything before it.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), StoreError> {
        let kept = self.entries_after(seq.saturating_sub(1))?;
        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in &kept {
                let record = WalRecordRef {
                    seq: entry.seq,
                    event: &entry.event,
                };
                let mut bytes = serde_json::to_vec(&record)?;
                bytes.push(b'\n');
                tmp.write_all(&bytes)?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
