// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable store layer: WAL-backed persistence for pipelines, executions,
//! stage executions, logs, insights, metrics and locks (spec.md §4.1).

mod error;
mod event;
#[cfg(any(test, feature = "test-support"))]
mod memory;
mod snapshot;
mod state;
mod stats_from_state;
mod store;
mod wal;

pub use error::StoreError;
pub use event::Event;
#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryStore;
pub use snapshot::Snapshot;
pub use state::MaterializedState;
pub use store::{ExecutionStatusUpdate, FileStore, StageExecutionUpdate, Store};
pub use wal::{Wal, WalEntry};
