// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for unitrun, a concurrent engine for in-process test units.
//!
//! The basic flow of operations is:
//!
//! 1. Register [`TestUnit`](unit::TestUnit)s with a [`Registry`](registry::Registry), optionally
//!    through a [`UnitGroup`](unit::UnitGroup).
//! 2. Select units by name into a [`TestList`](registry::TestList).
//! 3. Build a [`TestRunner`](runner::TestRunner) from the list and a
//!    [`RunnerProfile`](config::RunnerProfile), and execute it.
//! 4. Feed the resulting [`TestEvent`](reporter::TestEvent)s to a
//!    [`Reporter`](reporter::Reporter).
//!
//! Each unit body runs on its own worker thread and is timed out if it exceeds its budget. See
//! the [`runner`] module for what happens to timed out units.

pub mod config;
pub mod errors;
mod helpers;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod test_filter;
mod time;
pub mod unit;

pub use runner::{abort_run, cancellation_requested};
