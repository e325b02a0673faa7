// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`TestRunner`].
//!
//! # Timeouts and leaked threads
//!
//! Every unit body runs on its own detached OS thread, raced against a watchdog for the unit's
//! timeout. When the watchdog fires first, the unit is reported as timed out and its thread is
//! abandoned: Rust offers no safe way to stop a thread that doesn't cooperate. The thread keeps
//! running in the background until its body returns or the process exits.
//!
//! Bodies can cooperate by polling [`cancellation_requested`], which becomes true once their
//! watchdog has fired. Waits through [`std::thread::park_timeout`] are woken up at that point.

mod dispatcher;
mod executor;
mod imp;
mod internal_events;
mod worker;

use dispatcher::*;
use executor::*;
pub use imp::*;
use internal_events::*;
pub use worker::{abort_run, cancellation_requested};
