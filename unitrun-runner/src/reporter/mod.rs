// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out test execution statuses.
//!
//! The main structures in this module are [`ReporterBuilder`] and [`Reporter`], which consume
//! [`TestEvent`]s produced by the runner.

mod duration;
pub mod events;
mod helpers;
mod imp;

pub use events::*;
pub use imp::*;
