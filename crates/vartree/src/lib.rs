// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! vartree - Lazily-populated tree of inspected debugger values
//!
//! A [`TreeController`] sits between a debugging backend and a rendering
//! surface. It expands values on demand, loads large collections in pages,
//! tracks values whose evaluation is still running, and remembers what the
//! tree looked like at the previous stop so changed values can be flagged.
//!
//! The backend is plugged in through [`DebugBackend`] and [`StackFrame`];
//! the surface listens to [`TreeEvent`]s.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod manager;
pub mod node;
pub mod tree;

pub use backend::{DebugBackend, EvalOptions, StackFrame, ValueChange, ValueNotifier};
pub use config::{TreeConfig, DEFAULT_PAGE_SIZE};
pub use controller::{DisplayValue, TreeController};
pub use error::{TreeError, TreeResult};
pub use events::TreeEvent;
pub use node::{
    truncate_display, NodeId, NodeKind, ValueInfo, ValueNode, DEFAULT_MAX_DISPLAY_LEN, ELLIPSIS,
};
pub use tree::{join_path, Splice, ValueTree, PATH_SEPARATOR};
