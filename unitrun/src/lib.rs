// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A harness for running in-process test units in parallel.
//!
//! A harness binary builds a [`Registry`](unitrun_runner::registry::Registry) of units and hands
//! it to [`main_with`], which takes care of argument parsing, configuration, logging, reporting
//! and exit codes. The engine itself lives in [`unitrun_runner`].
//!
//! Units run on their own threads with a time budget each. Passing units are printed as they
//! finish, failing units once every unit has finished:
//!
//! ```text
//! search pattern: Demo
//! [pass] Demo.A (0.03 ms)
//! [fail] Demo.B (1.12 ms)
//!        test case timed out after 1 ms
//! 2 tests, 0 skipped, 1 passed, 1 failed
//! ```
//!
//! Logging is controlled by the `UNITRUN_LOG` environment variable, which takes
//! [`tracing_subscriber::filter::Targets`] directives such as `unitrun_runner=debug`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use output::{Color, OutputContext, OutputWriter, StderrStyles};
