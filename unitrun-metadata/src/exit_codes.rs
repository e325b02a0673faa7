// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for unitrun harness failures.
///
/// Individual test failures are reported in the output and are *not* reflected here: a run that
/// completes exits with [`OK`](Self::OK) no matter how many tests failed. The codes below cover
/// the cases where the run could not be performed or could not be completed.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum UnitrunExitCode {}

impl UnitrunExitCode {
    /// The run completed. Some tests may still have failed.
    pub const OK: i32 = 0;

    /// Loading the test units (discovery) failed before any test was run.
    pub const LOAD_FAILED: i32 = 1;

    /// A user issue happened while setting up the run, for example a malformed config file or an
    /// unknown profile.
    pub const SETUP_ERROR: i32 = 96;

    /// The engine itself aborted the run: a unit raised an engine abort, or a worker could not be
    /// created.
    pub const ENGINE_ABORTED: i32 = 101;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
