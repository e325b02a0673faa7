// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The executor for units.
//!
//! This component is responsible for running units and reporting results to the dispatcher.
//!
//! Note that the executor itself does not communicate directly with the outside world. All
//! communication is mediated by the dispatcher.

use super::{
    ExecutorEvent,
    worker::{WorkerResult, spawn_worker},
};
use crate::{
    errors::EngineFault,
    registry::TestInstance,
    reporter::events::{ExecutionOutcome, ExecutionResult, FailureKind},
};
use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Clone, Debug)]
pub(super) struct ExecutorContext {
    default_timeout: Duration,
    // Set when a debugger is attached: no watchdog is armed.
    suppress_timeouts: bool,
}

impl ExecutorContext {
    pub(super) fn new(default_timeout: Duration, suppress_timeouts: bool) -> Self {
        Self {
            default_timeout,
            suppress_timeouts,
        }
    }

    /// Runs a single unit, reporting its start and its outcome to the dispatcher.
    ///
    /// Returns `ControlFlow::Break` if the unit hit an engine fault, in which case no further
    /// units should be started.
    pub(super) async fn run_test_instance<'a>(
        &self,
        test_instance: TestInstance<'a>,
        resp_tx: UnboundedSender<ExecutorEvent<'a>>,
    ) -> ControlFlow<()> {
        debug!(test_name = test_instance.name(), "running unit");

        // Failure to send means the receiver was dropped.
        _ = resp_tx.send(ExecutorEvent::Started { test_instance });

        let (event, flow) = match self.run_unit(test_instance).await {
            Ok(outcome) => (
                ExecutorEvent::Finished {
                    test_instance,
                    outcome,
                },
                ControlFlow::Continue(()),
            ),
            Err(fault) => (
                ExecutorEvent::EngineFault {
                    test_instance,
                    fault,
                },
                ControlFlow::Break(()),
            ),
        };
        _ = resp_tx.send(event);
        flow
    }

    /// Runs a single unit to a terminal outcome.
    ///
    /// Skipped units are never started. Otherwise the body runs on a detached worker thread,
    /// raced against a watchdog for the unit's effective timeout.
    pub(super) async fn run_unit(
        &self,
        test_instance: TestInstance<'_>,
    ) -> Result<ExecutionOutcome, EngineFault> {
        let unit = test_instance.unit;
        if unit.is_skipped() {
            return Ok(ExecutionOutcome::skipped());
        }

        let timeout = unit.timeout().unwrap_or(self.default_timeout);
        let cancel = Arc::new(AtomicBool::new(false));

        let stopwatch = crate::time::stopwatch();
        let (handle, mut rx) = spawn_worker(unit.name(), unit.body().clone(), cancel.clone())
            .map_err(|error| EngineFault::WorkerSpawn {
                unit_name: unit.name().to_owned(),
                error,
            })?;

        // tokio::time::timeout polls the receiver before the timer, so a result that is already
        // available wins.
        let received = if self.suppress_timeouts {
            Some((&mut rx).await)
        } else {
            tokio::time::timeout(timeout, &mut rx).await.ok()
        };
        let snapshot = stopwatch.snapshot();

        let result = match received {
            Some(Ok(WorkerResult::Passed)) => ExecutionResult::Pass,
            Some(Ok(WorkerResult::Failed(kind))) => ExecutionResult::Fail(kind),
            Some(Ok(WorkerResult::Aborted { reason })) => {
                return Err(EngineFault::Aborted {
                    unit_name: unit.name().to_owned(),
                    reason,
                });
            }
            Some(Err(_)) => {
                return Err(EngineFault::WorkerLost {
                    unit_name: unit.name().to_owned(),
                });
            }
            None => {
                cancel.store(true, Ordering::Release);
                handle.thread().unpark();
                debug!(
                    test_name = unit.name(),
                    timeout = ?timeout,
                    "unit timed out, abandoning worker thread",
                );
                ExecutionResult::Fail(FailureKind::TimedOut { timeout })
            }
        };

        // Dropping the handle detaches the worker thread.
        drop(handle);

        Ok(ExecutionOutcome {
            start_time: Some(snapshot.start_time),
            time_taken: Some(snapshot.duration),
            result,
        })
    }
}
