// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal events used between the runner components.
//!
//! These events mirror those in [`crate::reporter::events`], but are used within the runner.

use crate::{errors::EngineFault, registry::TestInstance, reporter::events::ExecutionOutcome};

/// An internal event.
///
/// These events are sent by the executor (the part that actually runs unit bodies) to the
/// dispatcher (the part of the runner that talks to the reporter).
#[derive(Debug)]
pub(super) enum ExecutorEvent<'a> {
    Started {
        test_instance: TestInstance<'a>,
    },
    Finished {
        test_instance: TestInstance<'a>,
        outcome: ExecutionOutcome,
    },
    EngineFault {
        test_instance: TestInstance<'a>,
        fault: EngineFault,
    },
}

/// An event handled by the dispatcher.
#[derive(Debug)]
pub(super) enum InternalEvent<'a> {
    Executor(ExecutorEvent<'a>),
    ReportCancel,
}
