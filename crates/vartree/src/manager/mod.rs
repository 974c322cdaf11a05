// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Bookkeeping subsystems composed by the [`TreeController`](crate::TreeController)
//!
//! - `watch`: nodes whose value is still being computed
//! - `fetch`: in-flight child loads, coalesced per node
//! - `checkpoint`: per-path snapshots for change detection across stops
//!
//! Each subsystem is plain synchronous state. The controller owns the locks
//! and the backend calls; nothing here awaits while holding tree state.

pub mod checkpoint;
pub mod fetch;
pub mod watch;

pub use checkpoint::{CheckpointState, CheckpointStore};
pub use fetch::{ChildFetcher, FetchLimit, MergedPage, SharedFetch};
pub use watch::{Completion, EvaluationRegistry};
