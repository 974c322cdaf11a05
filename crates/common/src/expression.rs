// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0

//! Helpers for watch expressions typed by the user.
//!
//! Expressions are kept as text; evaluation belongs to the backend. What lives
//! here is the small amount of syntax every consumer agrees on: whitespace
//! normalization and the member-path form (`a.b[3].c`) used by value paths.

use eyre::{bail, Result};

/// Normalize an expression by replacing any contiguous whitespace with a single space
pub fn normalize_expression(expr: &str) -> String {
    expr.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One step of a member path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Named member access (`.name` or a leading `name`)
    Member(String),
    /// Positional access (`[index]`)
    Index(usize),
}

/// Parse a member path such as `state.items[2].owner`.
///
/// Whitespace is ignored. An empty expression is an error.
pub fn parse_member_path(expr: &str) -> Result<Vec<PathSegment>> {
    let expr: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if expr.is_empty() {
        bail!("empty expression");
    }

    let mut segments = Vec::new();
    let mut chars = expr.chars().peekable();
    let mut current = String::new();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() {
                    bail!("unexpected '.' in '{expr}'");
                }
                segments.push(PathSegment::Member(std::mem::take(&mut current)));
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Member(std::mem::take(&mut current)));
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        Some(other) => bail!("invalid index character '{other}' in '{expr}'"),
                        None => bail!("unterminated index in '{expr}'"),
                    }
                }
                let index = digits.parse().map_err(|_| eyre::eyre!("empty index in '{expr}'"))?;
                segments.push(PathSegment::Index(index));
                // An index may only be followed by another index or a member access
                if let Some(&next) = chars.peek() {
                    if next != '.' && next != '[' {
                        bail!("unexpected '{next}' after index in '{expr}'");
                    }
                    if next == '.' {
                        chars.next();
                        if chars.peek().is_none() {
                            bail!("trailing '.' in '{expr}'");
                        }
                    }
                }
            }
            ']' => bail!("unbalanced ']' in '{expr}'"),
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Member(current));
    } else if expr.ends_with('.') {
        bail!("trailing '.' in '{expr}'");
    }

    Ok(segments)
}
