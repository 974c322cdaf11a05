// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! Integration test support for the vartree crates
//!
//! Provides a scriptable in-memory debugging backend and logging helpers
//! shared by the tests under `tests/`.

pub mod test_utils;
