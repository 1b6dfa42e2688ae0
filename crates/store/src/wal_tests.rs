use super::*;
use cv_core::{Execution, ExecutionId, PipelineId, TriggerSource};
use std::collections::HashMap;

fn sample_event() -> Event {
    Event::ExecutionCreated {
        execution: Execution::new(
            ExecutionId::new("e1"),
            PipelineId::new("p1"),
            "p1".to_string(),
            2,
            TriggerSource::Manual,
            HashMap::new(),
            HashMap::new(),
            None,
            1_000,
        ),
    }
}

#[test]
fn append_assigns_increasing_sequence_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = Wal::open(&dir.path().join("wal.jsonl")).unwrap();
    let s1 = wal.append(&sample_event()).unwrap();
    let s2 = wal.append(&sample_event()).unwrap();
    assert_eq!(s1, 1);
    assert_eq!(s2, 2);
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn reopen_recovers_write_seq_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.jsonl");
    {
        let mut wal = Wal::open(&path).unwrap();
        wal.append(&sample_event()).unwrap();
        wal.append(&sample_event()).unwrap();
    }
    let wal = Wal::open(&path).unwrap();
    assert_eq!(wal.write_seq(), 2);
}

#[test]
fn entries_after_excludes_seq_at_or_below() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = Wal::open(&dir.path().join("wal.jsonl")).unwrap();
    wal.append(&sample_event()).unwrap();
    wal.append(&sample_event()).unwrap();
    wal.append(&sample_event()).unwrap();
    let entries = wal.entries_after(1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 2);
    assert_eq!(entries[1].seq, 3);
}

#[test]
fn truncate_before_drops_earlier_entries() {
    let dir = tempfile::tempdir().unwrap();
    let mut wal = Wal::open(&dir.path().join("wal.jsonl")).unwrap();
    wal.append(&sample_event()).unwrap();
    wal.append(&sample_event()).unwrap();
    wal.append(&sample_event()).unwrap();
    wal.truncate_before(2).unwrap();
    let remaining = wal.entries_after(0).unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].seq, 2);
}
