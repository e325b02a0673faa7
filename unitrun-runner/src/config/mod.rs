// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for unitrun.
//!
//! Configuration is layered: the embedded default config, then `.config/unitrun.toml` (or an
//! explicitly specified file), then command-line arguments applied by the caller.

mod imp;
mod test_threads;

pub use imp::*;
pub use test_threads::*;
