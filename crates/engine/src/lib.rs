// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Pipeline execution engine: admits execution requests, runs their
//! stages, and maintains execution state across the coordination and
//! durable-store ports (spec.md §4.7-§4.10).

mod error;
mod handlers;
mod heartbeat;
mod runner;
mod supervisor;

pub use error::{HandlerError, RunnerError, SupervisorError};
pub use handlers::{HandlerRegistry, StageContext, StageHandler};
pub use heartbeat::{HeartbeatLoop, Reaper};
pub use runner::StageRunner;
pub use supervisor::{ExecutionSupervisor, SupervisorHandle};
