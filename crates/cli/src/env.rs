// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// The log filter directive: `HYDRANT_LOG`, falling back to `RUST_LOG`.
///
/// Empty values count as unset.
pub fn log_filter() -> Option<String> {
    [vars::HYDRANT_LOG, vars::RUST_LOG]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
