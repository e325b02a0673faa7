// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch and execution.

mod app;
mod execution;
mod imp;

pub use app::HarnessApp;
pub use imp::main_with;
