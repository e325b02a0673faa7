// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Stable, documented metadata for [unitrun](https://crates.io/crates/unitrun) harnesses.
//!
//! Currently this is limited to the process exit codes produced by a harness binary, so that
//! scripts and CI systems can distinguish infrastructure failures from ordinary runs.

mod exit_codes;

pub use exit_codes::*;
