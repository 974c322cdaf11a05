// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! vartree common - Shared functionality for vartree components
//!
//! This crate provides the pieces used by the controller library, the CLI
//! and the integration tests alike.

/// Expression normalization for watch expressions
pub mod expression;
/// Tracing subscriber setup shared by the binary and the tests
pub mod logging;

pub use expression::*;
pub use logging::*;
