// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events for the reporter.
//!
//! These types form the interface between the test runner and the test
//! reporter. The root structure for all events is [`TestEvent`].

use crate::{
    registry::{TestInstance, TestList},
    unit::SourceLocation,
};
use chrono::{DateTime, FixedOffset, Local};
use std::time::Duration;

/// A test event.
///
/// Events are produced by a [`TestRunner`](crate::runner::TestRunner) and
/// consumed by a [`Reporter`](crate::reporter::Reporter).
#[derive(Clone, Debug)]
pub struct TestEvent<'a> {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The amount of time elapsed since the start of the test run.
    pub elapsed: Duration,

    /// The kind of test event this is.
    pub kind: TestEventKind<'a>,
}

/// The kind of test event this is.
///
/// Forms part of [`TestEvent`].
#[derive(Clone, Debug)]
pub enum TestEventKind<'a> {
    /// The test run started.
    RunStarted {
        /// The list of units that will be run.
        ///
        /// The methods on the test list indicate the number of units that will be run.
        test_list: &'a TestList<'a>,

        /// The name of the profile used for this run.
        profile_name: String,

        /// The number of units that may run at the same time.
        test_threads: usize,
    },

    /// A unit was skipped. Its body is never invoked.
    ///
    /// Skipped units are reported before any other unit finishes, in list order.
    TestSkipped {
        /// The unit that was skipped.
        test_instance: TestInstance<'a>,
    },

    /// A unit started running.
    TestStarted {
        /// The unit that was started.
        test_instance: TestInstance<'a>,

        /// The number of units currently running, including this one.
        running: usize,
    },

    /// A unit finished running.
    ///
    /// Passing units are reported as soon as they finish. Failing units are held back and
    /// reported, in the order they finished, once every unit has finished.
    TestFinished {
        /// The unit that finished running.
        test_instance: TestInstance<'a>,

        /// The outcome of the unit.
        outcome: ExecutionOutcome,

        /// The number of units still running when this unit finished.
        running: usize,
    },

    /// The test run finished.
    RunFinished {
        /// The time at which the run was started.
        start_time: DateTime<FixedOffset>,

        /// The amount of time it took for the units to run.
        elapsed: Duration,

        /// Statistics for the run.
        run_stats: RunStats,
    },
}

/// Statistics for a test run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The total number of units that were expected to be run at the beginning, not counting
    /// skipped units.
    ///
    /// If the test run is cancelled, this will be more than `finished_count` at the end.
    pub initial_run_count: usize,

    /// The total number of units that finished running.
    pub finished_count: usize,

    /// The number of units that were skipped.
    pub skipped: usize,

    /// The number of units that failed, including timed out units.
    pub failed: usize,

    /// The number of units that timed out. These are also counted in `failed`.
    pub timed_out: usize,
}

impl RunStats {
    /// Returns the total number of units in the run, including skipped units.
    pub fn total(&self) -> usize {
        self.initial_run_count + self.skipped
    }

    /// Returns the number of units that passed.
    ///
    /// Once every unit has finished, this is the total minus failed and skipped units. Units that
    /// were never started because the run was cancelled are not counted as passed.
    pub fn passed(&self) -> usize {
        self.finished_count.saturating_sub(self.failed)
    }

    /// Returns true if this run is considered a success.
    ///
    /// A run is marked as failed if any of the following are true:
    /// * the run was cancelled: the initial run count is greater than the final run count
    /// * any units failed
    pub fn is_success(&self) -> bool {
        if self.initial_run_count > self.finished_count {
            return false;
        }
        !self.any_failed()
    }

    /// Returns true if any units failed or timed out.
    #[inline]
    pub fn any_failed(&self) -> bool {
        self.failed > 0
    }

    pub(crate) fn on_test_finished(&mut self, outcome: &ExecutionOutcome) {
        self.finished_count += 1;
        match &outcome.result {
            ExecutionResult::Pass | ExecutionResult::Skipped => {}
            ExecutionResult::Fail(kind) => {
                self.failed += 1;
                if matches!(kind, FailureKind::TimedOut { .. }) {
                    self.timed_out += 1;
                }
            }
        }
    }
}

/// The outcome of executing a single unit.
///
/// Produced exactly once per unit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionOutcome {
    /// The time at which the unit was started, if it was started.
    pub start_time: Option<DateTime<Local>>,

    /// The time it took for the unit to finish, if it finished.
    ///
    /// For a unit that timed out, this is the time at which the timeout was determined.
    pub time_taken: Option<Duration>,

    /// The result of execution.
    pub result: ExecutionResult,
}

impl ExecutionOutcome {
    /// Returns the outcome of a unit that was never started.
    pub fn skipped() -> Self {
        Self {
            start_time: None,
            time_taken: None,
            result: ExecutionResult::Skipped,
        }
    }

    /// Returns the status of this unit.
    pub fn status(&self) -> UnitStatus {
        match &self.result {
            ExecutionResult::Skipped => UnitStatus::Skipped,
            ExecutionResult::Pass => UnitStatus::Passed,
            ExecutionResult::Fail(_) => UnitStatus::Failed,
        }
    }

    /// Returns true if the unit both started and finished.
    pub fn is_finished(&self) -> bool {
        self.start_time.is_some() && self.time_taken.is_some()
    }

    /// Returns the kind of failure, if the unit failed.
    pub fn failure(&self) -> Option<&FailureKind> {
        match &self.result {
            ExecutionResult::Fail(kind) => Some(kind),
            ExecutionResult::Skipped | ExecutionResult::Pass => None,
        }
    }
}

/// The result of executing a unit.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecutionResult {
    /// The unit was never started.
    Skipped,

    /// The unit returned normally.
    Pass,

    /// The unit failed.
    Fail(FailureKind),
}

/// The way in which a unit failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// A check from the `assert!` family failed.
    AssertionFailed {
        /// The assertion message, without the standard `assertion failed` prefix.
        message: Option<String>,

        /// The location of the panic, if known.
        location: Option<SourceLocation>,
    },

    /// The unit returned an error, or panicked other than through a failed assertion.
    RuntimeError {
        /// A description of the error including its sources, or the panic message.
        description: String,

        /// The location at which the error was created or converted with `?`, or the location
        /// of the panic.
        location: Option<SourceLocation>,
    },

    /// The unit did not finish within its time budget.
    TimedOut {
        /// The time budget that was exceeded.
        timeout: Duration,
    },
}

impl FailureKind {
    /// Returns the location associated with this failure, if any.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::AssertionFailed { location, .. } | Self::RuntimeError { location, .. } => {
                location.as_ref()
            }
            Self::TimedOut { .. } => None,
        }
    }
}

/// The status of a unit, derived from its [`ExecutionOutcome`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UnitStatus {
    /// The unit was never started.
    Skipped,

    /// The unit finished without error.
    Passed,

    /// The unit failed or was timed out.
    Failed,
}
